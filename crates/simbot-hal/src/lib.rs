//! `simbot-hal` – Simulated sensors
//!
//! Stand-ins for the hardware a real inspection robot would carry.  Nothing
//! here touches real devices: readings are random and inspection artifacts
//! are built from example media embedded in the binary.
//!
//! # Modules
//!
//! - [`telemetry`] – [`TelemetryGenerator`][telemetry::TelemetryGenerator]:
//!   pose, battery, pressure and obstacle-status samples plus their JSON
//!   payloads.
//! - [`inspection`] – [`InspectionFactory`][inspection::InspectionFactory]:
//!   builds an [`Inspection`][simbot_types::Inspection] for a completed
//!   inspection task, dispatching on the task kind.

pub mod inspection;
pub mod telemetry;

pub use inspection::{InspectionFactory, InspectionHandler, handler_for};
pub use telemetry::TelemetryGenerator;
