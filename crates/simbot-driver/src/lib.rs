//! `simbot-driver` – Simulated robot driver
//!
//! The plugin surface a mission supervisor programs against.  It exposes the
//! operations a real robot driver would (submit a mission, poll task and
//! mission status, pause, resume, stop, fetch inspections, stream
//! telemetry) backed entirely by the simulation engine in `simbot-runtime`.
//!
//! # Modules
//!
//! - [`robot`] – [`Robot`][robot::Robot], the driver adapter.
//! - [`publisher`] – [`TelemetryPublisher`][publisher::TelemetryPublisher]
//!   threads that push JSON telemetry onto a `tokio` broadcast channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use simbot_driver::Robot;
//! use simbot_types::{Mission, Task, TaskKind};
//!
//! let robot = Robot::new(simbot_config::Settings::default());
//! let task = Task::new(TaskKind::TakeImage);
//! let task_id = task.id.clone();
//! robot.initiate_mission(Mission::new("demo", vec![task])).unwrap();
//! println!("{:?}", robot.task_status(&task_id));
//! ```

pub mod publisher;
pub mod robot;

pub use publisher::{PublisherHandle, TelemetryMessage, TelemetryPublisher};
pub use robot::{InspectionCallback, Robot};
