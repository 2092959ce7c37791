//! `simbot-runtime` – Mission simulation engine
//!
//! The stateful core of the simulated robot: a background worker per mission
//! that advances task statuses over time, honours pause, resume and stop
//! requests, and injects random failures.
//!
//! # Modules
//!
//! - [`simulation`] – [`MissionSimulation`][simulation::MissionSimulation]
//!   and its [`SimulationSettings`][simulation::SimulationSettings].
//! - [`status`] – derives the overall
//!   [`MissionStatus`][simbot_types::MissionStatus] from task statuses.
//! - [`signal`] – [`Signal`][signal::Signal], the blocking event flag used
//!   for pause and stop.
//! - [`logging`] – `tracing` subscriber and optional OTLP export.

pub mod logging;
pub mod signal;
pub mod simulation;
pub mod status;

pub use logging::{TracerProviderGuard, init_tracing};
pub use signal::Signal;
pub use simulation::{MissionSimulation, SimulationSettings};
pub use status::derive_mission_status;
