use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Named reference frame a position or orientation is expressed in
/// (e.g. `"asset"`, `"robot"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(pub String);

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The installation-fixed frame every simulated pose is reported in.
    pub fn asset() -> Self {
        Self::new("asset")
    }

    pub fn robot() -> Self {
        Self::new("robot")
    }
}

/// A point in 3-D space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub frame: Frame,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64, frame: Frame) -> Self {
        Self { x, y, z, frame }
    }
}

/// A unit quaternion (x, y, z, w convention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
    pub frame: Frame,
}

impl Orientation {
    /// The identity rotation in `frame`.
    pub fn identity(frame: Frame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
            frame,
        }
    }
}

/// Robot pose: position plus orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
    pub frame: Frame,
}

// ────────────────────────────────────────────────────────────────────────────
// Missions and tasks
// ────────────────────────────────────────────────────────────────────────────

/// What a task asks the robot to do.
///
/// Every kind except [`TaskKind::ReturnToHome`] produces an inspection
/// artifact once the task has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    TakeImage,
    TakeThermalImage,
    TakeVideo,
    /// Record a thermal video for `duration` seconds.
    TakeThermalVideo { duration: f64 },
    /// Record audio for `duration` seconds.
    RecordAudio { duration: f64 },
    #[serde(rename = "take_co2_measurement")]
    TakeCo2Measurement,
    /// Drive back to the docking station.
    ReturnToHome,
}

impl TaskKind {
    /// `true` for every kind that yields an inspection artifact.
    pub fn is_inspection(&self) -> bool {
        !matches!(self, TaskKind::ReturnToHome)
    }
}

/// One schedulable unit of work within a [`Mission`].
///
/// Tasks are immutable once submitted; build them with the `with_*` helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within its mission.
    pub id: String,
    pub kind: TaskKind,
    /// Position the inspection is aimed at. When absent the robot's own
    /// position is recorded instead.
    pub target: Option<Position>,
    pub tag_id: Option<String>,
    pub inspection_description: Option<String>,
    /// Identifier given to the inspection artifact this task produces.
    pub inspection_id: String,
}

impl Task {
    /// Create a task with freshly generated task and inspection ids.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            target: None,
            tag_id: None,
            inspection_description: None,
            inspection_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn return_to_home() -> Self {
        Self::new(TaskKind::ReturnToHome)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_target(mut self, target: Position) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_tag_id(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id.into());
        self
    }

    pub fn with_inspection_description(mut self, description: impl Into<String>) -> Self {
        self.inspection_description = Some(description.into());
        self
    }

    pub fn is_return_to_home(&self) -> bool {
        matches!(self.kind, TaskKind::ReturnToHome)
    }
}

/// An ordered batch of tasks submitted to the driver as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
}

impl Mission {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            tasks,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// A mission is a return-to-home mission when its only task is a
    /// [`TaskKind::ReturnToHome`] task.
    pub fn is_return_to_home(&self) -> bool {
        matches!(self.tasks.as_slice(), [task] if task.is_return_to_home())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Statuses
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a single task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Successful,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `true` once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Successful | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// `true` while the task is queued or executing.
    pub fn is_unresolved(&self) -> bool {
        !self.is_terminal()
    }
}

/// Aggregate mission state, always derived from the task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    NotStarted,
    InProgress,
    Paused,
    Successful,
    PartiallySuccessful,
    Failed,
    Cancelled,
}

/// Coarse robot availability as reported to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Available,
    Busy,
    Paused,
    Home,
}

// ────────────────────────────────────────────────────────────────────────────
// Inspections
// ────────────────────────────────────────────────────────────────────────────

/// Metadata shared by every inspection artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionMetadata {
    pub start_time: DateTime<Utc>,
    pub robot_pose: Pose,
    pub target_position: Position,
    pub file_type: String,
    /// Recording length in seconds for video and audio artifacts.
    pub duration: Option<f64>,
    pub tag_id: Option<String>,
    pub inspection_description: Option<String>,
}

/// An inspection artifact produced by a completed inspection task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inspection {
    Image {
        id: String,
        metadata: InspectionMetadata,
        data: Vec<u8>,
    },
    ThermalImage {
        id: String,
        metadata: InspectionMetadata,
        data: Vec<u8>,
    },
    Video {
        id: String,
        metadata: InspectionMetadata,
        data: Vec<u8>,
    },
    ThermalVideo {
        id: String,
        metadata: InspectionMetadata,
        data: Vec<u8>,
    },
    Audio {
        id: String,
        metadata: InspectionMetadata,
        data: Vec<u8>,
    },
    #[serde(rename = "co2_measurement")]
    Co2Measurement {
        id: String,
        metadata: InspectionMetadata,
        value: f64,
        unit: String,
    },
}

impl Inspection {
    pub fn id(&self) -> &str {
        match self {
            Inspection::Image { id, .. }
            | Inspection::ThermalImage { id, .. }
            | Inspection::Video { id, .. }
            | Inspection::ThermalVideo { id, .. }
            | Inspection::Audio { id, .. }
            | Inspection::Co2Measurement { id, .. } => id,
        }
    }

    pub fn metadata(&self) -> &InspectionMetadata {
        match self {
            Inspection::Image { metadata, .. }
            | Inspection::ThermalImage { metadata, .. }
            | Inspection::Video { metadata, .. }
            | Inspection::ThermalVideo { metadata, .. }
            | Inspection::Audio { metadata, .. }
            | Inspection::Co2Measurement { metadata, .. } => metadata,
        }
    }

    /// Raw media bytes; `None` for scalar measurements.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Inspection::Image { data, .. }
            | Inspection::ThermalImage { data, .. }
            | Inspection::Video { data, .. }
            | Inspection::ThermalVideo { data, .. }
            | Inspection::Audio { data, .. } => Some(data),
            Inspection::Co2Measurement { .. } => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Telemetry payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPosePayload {
    pub pose: Pose,
    pub isar_id: String,
    pub robot_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryBatteryPayload {
    /// State of charge in percent.
    pub battery_level: f64,
    pub isar_id: String,
    pub robot_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPressurePayload {
    /// Pressure in bar.
    pub pressure_level: f64,
    pub isar_id: String,
    pub robot_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryObstacleStatusPayload {
    pub obstacle_status: bool,
    pub isar_id: String,
    pub robot_name: String,
    pub timestamp: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type for every robot-driver operation.
///
/// Simulated task failures are not errors: they surface as
/// [`TaskStatus::Failed`] once a task has started.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RobotError {
    #[error("Task ID did not match any ongoing tasks: {0}")]
    TaskNotFound(String),

    #[error("No mission running: {0}")]
    NoMissionRunning(String),

    /// Internal consistency violation in the mission status derivation.
    #[error("Unhandled mission status detected: {0}")]
    MissionStatus(String),

    #[error("Invalid mission: {0}")]
    InvalidMission(String),

    #[error("Could not initiate mission: {0}")]
    InitiateMission(String),

    #[error("An error occurred while retrieving the inspection data: {0}")]
    RetrieveInspection(String),

    #[error("Inspection callback failed: {0}")]
    InspectionCallback(String),

    #[error("Telemetry serialization error: {0}")]
    Serialization(String),

    #[error("Telemetry publisher error: {0}")]
    Telemetry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_position() -> Position {
        Position::new(0.0, 0.0, 0.0, Frame::asset())
    }

    #[test]
    fn task_kind_inspection_classification() {
        assert!(TaskKind::TakeImage.is_inspection());
        assert!(TaskKind::RecordAudio { duration: 10.0 }.is_inspection());
        assert!(TaskKind::TakeCo2Measurement.is_inspection());
        assert!(!TaskKind::ReturnToHome.is_inspection());
    }

    #[test]
    fn task_new_generates_distinct_ids() {
        let a = Task::new(TaskKind::TakeImage);
        let b = Task::new(TaskKind::TakeImage);
        assert_ne!(a.id, b.id);
        assert_ne!(a.inspection_id, b.inspection_id);
    }

    #[test]
    fn task_builders_set_fields() {
        let task = Task::new(TaskKind::TakeImage)
            .with_id("dummy_task")
            .with_target(dummy_position())
            .with_tag_id("tag-1")
            .with_inspection_description("gauge");
        assert_eq!(task.id, "dummy_task");
        assert_eq!(task.target, Some(dummy_position()));
        assert_eq!(task.tag_id.as_deref(), Some("tag-1"));
        assert_eq!(task.inspection_description.as_deref(), Some("gauge"));
    }

    #[test]
    fn return_to_home_mission_requires_single_task() {
        let home = Mission::new("home", vec![Task::return_to_home()]);
        assert!(home.is_return_to_home());

        let two = Mission::new(
            "two",
            vec![Task::return_to_home(), Task::new(TaskKind::TakeImage)],
        );
        assert!(!two.is_return_to_home());

        let inspection = Mission::new("inspect", vec![Task::new(TaskKind::TakeImage)]);
        assert!(!inspection.is_return_to_home());

        let empty = Mission::new("empty", vec![]);
        assert!(!empty.is_return_to_home());
    }

    #[test]
    fn task_status_terminal_classification() {
        assert!(!TaskStatus::NotStarted.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Successful.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::InProgress.is_unresolved());
    }

    #[test]
    fn task_kind_serializes_with_type_tag() {
        let json = serde_json::to_string(&TaskKind::TakeThermalVideo { duration: 10.0 }).unwrap();
        assert!(json.contains("\"type\":\"take_thermal_video\""));
        assert!(json.contains("\"duration\":10.0"));

        let co2 = serde_json::to_string(&TaskKind::TakeCo2Measurement).unwrap();
        assert_eq!(co2, r#"{"type":"take_co2_measurement"}"#);
    }

    #[test]
    fn mission_roundtrip() {
        let mission = Mission::new(
            "Dummy Mission",
            vec![
                Task::new(TaskKind::TakeImage).with_target(dummy_position()),
                Task::return_to_home(),
            ],
        )
        .with_id("dummy");
        let json = serde_json::to_string(&mission).unwrap();
        let back: Mission = serde_json::from_str(&json).unwrap();
        assert_eq!(mission, back);
    }

    #[test]
    fn inspection_accessors() {
        let metadata = InspectionMetadata {
            start_time: Utc::now(),
            robot_pose: Pose {
                position: dummy_position(),
                orientation: Orientation::identity(Frame::asset()),
                frame: Frame::asset(),
            },
            target_position: dummy_position(),
            file_type: "jpg".to_string(),
            duration: None,
            tag_id: None,
            inspection_description: None,
        };
        let image = Inspection::Image {
            id: "insp-1".to_string(),
            metadata: metadata.clone(),
            data: vec![1, 2, 3],
        };
        assert_eq!(image.id(), "insp-1");
        assert_eq!(image.metadata().file_type, "jpg");
        assert_eq!(image.data(), Some(&[1u8, 2, 3][..]));

        let co2 = Inspection::Co2Measurement {
            id: "insp-2".to_string(),
            metadata,
            value: 1.2,
            unit: "% v/v".to_string(),
        };
        assert!(co2.data().is_none());
    }

    #[test]
    fn robot_error_display() {
        let err = RobotError::TaskNotFound("ghost".to_string());
        assert!(err.to_string().contains("ghost"));

        let err = RobotError::NoMissionRunning("Could not pause non-existent mission".to_string());
        assert!(err.to_string().contains("No mission running"));
    }
}
