//! [`InspectionFactory`] – canned inspection artifacts for completed tasks.
//!
//! Each inspection [`TaskKind`] maps to a handler (see [`handler_for`]) that
//! loads an example media file and wraps it with freshly generated
//! metadata.  The example media is compiled into the binary; a factory built
//! with [`InspectionFactory::new`] reads same-named files from a directory
//! instead.
//!
//! | Task kind | Media file | File type | Duration |
//! |---|---|---|---|
//! | `TakeImage` | one of three example JPEGs | `jpg` | – |
//! | `TakeThermalImage` | `example_thermal_image.fff` | `fff` | – |
//! | `TakeVideo` | `example_video.mp4` | `mp4` | 11 s |
//! | `TakeThermalVideo` | `example_thermal_video.mp4` | `mp4` | task duration |
//! | `RecordAudio` | `example_audio.wav` | `wav` | task duration |
//! | `TakeCo2Measurement` | – | `not_a_file` | – |

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use simbot_types::{Inspection, InspectionMetadata, Position, RobotError, Task, TaskKind};
use tracing::{debug, warn};

use crate::telemetry::TelemetryGenerator;

const EXAMPLE_IMAGES: [&str; 3] = [
    "example_image.jpg",
    "example_image_cloe_kaa.jpeg",
    "example_image_cloe_nls.jpeg",
];
const EXAMPLE_THERMAL_IMAGE: &str = "example_thermal_image.fff";
const EXAMPLE_VIDEO: &str = "example_video.mp4";
const EXAMPLE_THERMAL_VIDEO: &str = "example_thermal_video.mp4";
const EXAMPLE_AUDIO: &str = "example_audio.wav";

const VIDEO_DURATION_S: f64 = 11.0;
const CO2_UNIT: &str = "% v/v";

/// Signature shared by every per-kind inspection builder.
pub type InspectionHandler =
    fn(&InspectionFactory, &Task, &TelemetryGenerator) -> Result<Inspection, RobotError>;

/// Resolve the handler for `kind`; `None` for kinds that produce no artifact.
pub fn handler_for(kind: &TaskKind) -> Option<InspectionHandler> {
    match kind {
        TaskKind::TakeImage => Some(InspectionFactory::create_image),
        TaskKind::TakeThermalImage => Some(InspectionFactory::create_thermal_image),
        TaskKind::TakeVideo => Some(InspectionFactory::create_video),
        TaskKind::TakeThermalVideo { .. } => Some(InspectionFactory::create_thermal_video),
        TaskKind::RecordAudio { .. } => Some(InspectionFactory::create_audio),
        TaskKind::TakeCo2Measurement => Some(InspectionFactory::create_co2_measurement),
        TaskKind::ReturnToHome => None,
    }
}

/// Example media embedded at build time, keyed by file name.
const BUNDLED_MEDIA: [(&str, &[u8]); 7] = [
    ("example_image.jpg", include_bytes!("../example_data/example_image.jpg")),
    (
        "example_image_cloe_kaa.jpeg",
        include_bytes!("../example_data/example_image_cloe_kaa.jpeg"),
    ),
    (
        "example_image_cloe_nls.jpeg",
        include_bytes!("../example_data/example_image_cloe_nls.jpeg"),
    ),
    (
        "example_thermal_image.fff",
        include_bytes!("../example_data/example_thermal_image.fff"),
    ),
    ("example_video.mp4", include_bytes!("../example_data/example_video.mp4")),
    (
        "example_thermal_video.mp4",
        include_bytes!("../example_data/example_thermal_video.mp4"),
    ),
    ("example_audio.wav", include_bytes!("../example_data/example_audio.wav")),
];

/// Builds inspection artifacts from example media.
pub struct InspectionFactory {
    /// `None` serves the embedded media.
    data_dir: Option<PathBuf>,
    rng: Mutex<StdRng>,
}

impl InspectionFactory {
    /// Factory reading media files from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_source(Some(data_dir.into()))
    }

    /// Factory serving the media embedded in the binary.
    pub fn bundled() -> Self {
        Self::with_source(None)
    }

    fn with_source(data_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Build the inspection for a completed `task`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::RetrieveInspection`] when the task kind yields no
    /// inspection or the media file cannot be read.
    pub fn create(
        &self,
        task: &Task,
        telemetry: &TelemetryGenerator,
    ) -> Result<Inspection, RobotError> {
        let handler = handler_for(&task.kind).ok_or_else(|| {
            RobotError::RetrieveInspection(format!(
                "task {} of kind {:?} produces no inspection",
                task.id, task.kind
            ))
        })?;
        handler(self, task, telemetry)
    }

    fn create_image(&self, task: &Task, telemetry: &TelemetryGenerator) -> Result<Inspection, RobotError> {
        let file = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            EXAMPLE_IMAGES
                .choose(&mut *rng)
                .copied()
                .unwrap_or(EXAMPLE_IMAGES[0])
        };
        Ok(Inspection::Image {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "jpg", None),
            data: self.read_media(file)?,
        })
    }

    fn create_thermal_image(
        &self,
        task: &Task,
        telemetry: &TelemetryGenerator,
    ) -> Result<Inspection, RobotError> {
        Ok(Inspection::ThermalImage {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "fff", None),
            data: self.read_media(EXAMPLE_THERMAL_IMAGE)?,
        })
    }

    fn create_video(&self, task: &Task, telemetry: &TelemetryGenerator) -> Result<Inspection, RobotError> {
        Ok(Inspection::Video {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "mp4", Some(VIDEO_DURATION_S)),
            data: self.read_media(EXAMPLE_VIDEO)?,
        })
    }

    fn create_thermal_video(
        &self,
        task: &Task,
        telemetry: &TelemetryGenerator,
    ) -> Result<Inspection, RobotError> {
        Ok(Inspection::ThermalVideo {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "mp4", task_duration(task)),
            data: self.read_media(EXAMPLE_THERMAL_VIDEO)?,
        })
    }

    fn create_audio(&self, task: &Task, telemetry: &TelemetryGenerator) -> Result<Inspection, RobotError> {
        Ok(Inspection::Audio {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "wav", task_duration(task)),
            data: self.read_media(EXAMPLE_AUDIO)?,
        })
    }

    fn create_co2_measurement(
        &self,
        task: &Task,
        telemetry: &TelemetryGenerator,
    ) -> Result<Inspection, RobotError> {
        let value = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..5.0);
        Ok(Inspection::Co2Measurement {
            id: task.inspection_id.clone(),
            metadata: metadata(task, telemetry, "not_a_file", None),
            value,
            unit: CO2_UNIT.to_string(),
        })
    }

    fn read_media(&self, file: &str) -> Result<Vec<u8>, RobotError> {
        let Some(data_dir) = &self.data_dir else {
            return BUNDLED_MEDIA
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(_, bytes)| bytes.to_vec())
                .ok_or_else(|| RobotError::RetrieveInspection(format!("no bundled media named {file}")));
        };
        let path = data_dir.join(file);
        fs::read(&path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "example media unavailable");
            RobotError::RetrieveInspection(format!("could not read {}: {e}", path.display()))
        })
    }
}

fn task_duration(task: &Task) -> Option<f64> {
    match task.kind {
        TaskKind::TakeThermalVideo { duration } | TaskKind::RecordAudio { duration } => Some(duration),
        _ => None,
    }
}

fn metadata(
    task: &Task,
    telemetry: &TelemetryGenerator,
    file_type: &str,
    duration: Option<f64>,
) -> InspectionMetadata {
    let robot_pose = telemetry.pose();
    let target_position: Position = match &task.target {
        Some(target) => target.clone(),
        None => {
            debug!(task_id = %task.id, "no inspection target specified, using robot position instead");
            robot_pose.position.clone()
        }
    };
    InspectionMetadata {
        start_time: Utc::now(),
        robot_pose,
        target_position,
        file_type: file_type.to_string(),
        duration,
        tag_id: task.tag_id.clone(),
        inspection_description: task.inspection_description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbot_types::Frame;

    fn target() -> Position {
        Position::new(0.0, 0.0, 0.0, Frame::robot())
    }

    fn create(kind: TaskKind) -> Inspection {
        let factory = InspectionFactory::bundled();
        let telemetry = TelemetryGenerator::new(false);
        let task = Task::new(kind).with_target(target());
        factory.create(&task, &telemetry).expect("inspection must be created")
    }

    #[test]
    fn create_image() {
        let inspection = create(TaskKind::TakeImage);
        assert!(matches!(inspection, Inspection::Image { .. }));
        assert_eq!(inspection.metadata().file_type, "jpg");
        assert!(!inspection.data().unwrap().is_empty());
    }

    #[test]
    fn create_thermal_image() {
        let inspection = create(TaskKind::TakeThermalImage);
        assert!(matches!(inspection, Inspection::ThermalImage { .. }));
        assert_eq!(inspection.metadata().file_type, "fff");
    }

    #[test]
    fn create_video() {
        let inspection = create(TaskKind::TakeVideo);
        assert_eq!(inspection.metadata().file_type, "mp4");
        assert_eq!(inspection.metadata().duration, Some(11.0));
    }

    #[test]
    fn create_thermal_video_uses_task_duration() {
        let inspection = create(TaskKind::TakeThermalVideo { duration: 10.0 });
        assert!(matches!(inspection, Inspection::ThermalVideo { .. }));
        assert_eq!(inspection.metadata().file_type, "mp4");
        assert_eq!(inspection.metadata().duration, Some(10.0));
    }

    #[test]
    fn create_audio_uses_task_duration() {
        let inspection = create(TaskKind::RecordAudio { duration: 10.0 });
        assert_eq!(inspection.metadata().file_type, "wav");
        assert_eq!(inspection.metadata().duration, Some(10.0));
    }

    #[test]
    fn create_co2_measurement() {
        let inspection = create(TaskKind::TakeCo2Measurement);
        match inspection {
            Inspection::Co2Measurement { value, unit, metadata, .. } => {
                assert!((0.0..5.0).contains(&value));
                assert_eq!(unit, "% v/v");
                assert_eq!(metadata.file_type, "not_a_file");
            }
            other => panic!("unexpected inspection {other:?}"),
        }
    }

    #[test]
    fn inspection_carries_task_identity() {
        let factory = InspectionFactory::bundled();
        let telemetry = TelemetryGenerator::new(false);
        let task = Task::new(TaskKind::TakeImage)
            .with_tag_id("tag-42")
            .with_inspection_description("pressure gauge");
        let inspection = factory.create(&task, &telemetry).unwrap();
        assert_eq!(inspection.id(), task.inspection_id);
        assert_eq!(inspection.metadata().tag_id.as_deref(), Some("tag-42"));
        assert_eq!(
            inspection.metadata().inspection_description.as_deref(),
            Some("pressure gauge")
        );
    }

    #[test]
    fn missing_target_falls_back_to_robot_position() {
        let factory = InspectionFactory::bundled();
        let telemetry = TelemetryGenerator::new(false);
        let task = Task::new(TaskKind::TakeThermalImage);
        let inspection = factory.create(&task, &telemetry).unwrap();
        let metadata = inspection.metadata();
        assert_eq!(metadata.target_position, metadata.robot_pose.position);
    }

    #[test]
    fn return_to_home_has_no_handler() {
        assert!(handler_for(&TaskKind::ReturnToHome).is_none());
        let factory = InspectionFactory::bundled();
        let telemetry = TelemetryGenerator::new(false);
        let err = factory
            .create(&Task::return_to_home(), &telemetry)
            .unwrap_err();
        assert!(matches!(err, RobotError::RetrieveInspection(_)));
    }

    #[test]
    fn bundled_media_does_not_touch_the_filesystem() {
        let factory = InspectionFactory::bundled();
        assert!(factory.data_dir().is_none());
        for file in EXAMPLE_IMAGES
            .iter()
            .chain([EXAMPLE_THERMAL_IMAGE, EXAMPLE_VIDEO, EXAMPLE_THERMAL_VIDEO, EXAMPLE_AUDIO].iter())
        {
            let bytes = factory.read_media(file).unwrap();
            let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("example_data").join(file);
            let on_disk = fs::read(source).unwrap();
            assert_eq!(bytes, on_disk, "{file}");
        }
        assert!(matches!(
            factory.read_media("missing.bin"),
            Err(RobotError::RetrieveInspection(_))
        ));
    }

    #[test]
    fn missing_media_is_a_retrieve_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let factory = InspectionFactory::new(dir.path());
        let telemetry = TelemetryGenerator::new(false);
        let err = factory
            .create(&Task::new(TaskKind::TakeVideo), &telemetry)
            .unwrap_err();
        assert!(matches!(err, RobotError::RetrieveInspection(_)));
    }

    #[test]
    fn custom_data_dir_is_read() {
        let dir = tempfile::tempdir().expect("tmp dir");
        fs::write(dir.path().join(EXAMPLE_AUDIO), b"custom-audio").expect("write");
        let factory = InspectionFactory::new(dir.path());
        let telemetry = TelemetryGenerator::new(false);
        let inspection = factory
            .create(&Task::new(TaskKind::RecordAudio { duration: 3.0 }), &telemetry)
            .unwrap();
        assert_eq!(inspection.data(), Some(&b"custom-audio"[..]));
    }
}
