//! [`TelemetryGenerator`] – simulated robot sensor readings.
//!
//! Produces plausible pose, battery, pressure and obstacle-status samples and
//! wraps them in JSON telemetry payloads.
//!
//! # Sample ranges
//!
//! | Reading | Range |
//! |---|---|
//! | Pose position (x, y, z) | uniform `[0.1, 10]` in the `asset` frame, identity orientation |
//! | Battery level | `[0, 100]` percent (see below) |
//! | Pressure level | `[0.011, 0.079]` bar in 1 mbar steps |
//! | Obstacle status | always `false` |
//!
//! With `random_battery_level` enabled the battery reading is uniform over
//! `[50, 100]` in 0.1 % steps.  Otherwise a simple charge model is used: the
//! level drains while the robot is away from home and recharges at home.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simbot_types::{
    Frame, Orientation, Pose, Position, RobotError, TelemetryBatteryPayload,
    TelemetryObstacleStatusPayload, TelemetryPosePayload, TelemetryPressurePayload,
};

const MIN_PRESSURE_MBAR: u32 = 11;
const MAX_PRESSURE_MBAR: u32 = 79;
const MBAR_TO_BAR: f64 = 1.0 / 1000.0;

const BATTERY_DRAIN_PER_SAMPLE: f64 = 0.1;
const BATTERY_CHARGE_PER_SAMPLE: f64 = 1.0;

struct GeneratorState {
    rng: StdRng,
    battery_level: f64,
}

/// Thread-safe source of simulated sensor readings.
///
/// Share it between the driver and the telemetry publishers behind an
/// [`Arc`][std::sync::Arc].
pub struct TelemetryGenerator {
    random_battery_level: bool,
    state: Mutex<GeneratorState>,
}

impl TelemetryGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(random_battery_level: bool) -> Self {
        Self::with_rng(random_battery_level, StdRng::from_entropy())
    }

    /// Create a deterministic generator.
    pub fn with_seed(random_battery_level: bool, seed: u64) -> Self {
        Self::with_rng(random_battery_level, StdRng::seed_from_u64(seed))
    }

    fn with_rng(random_battery_level: bool, rng: StdRng) -> Self {
        Self {
            random_battery_level,
            state: Mutex::new(GeneratorState {
                rng,
                battery_level: 100.0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A random pose in the `asset` frame.
    pub fn pose(&self) -> Pose {
        let mut state = self.state();
        let position = Position::new(
            state.rng.gen_range(0.1..=10.0),
            state.rng.gen_range(0.1..=10.0),
            state.rng.gen_range(0.1..=10.0),
            Frame::asset(),
        );
        Pose {
            position,
            orientation: Orientation::identity(Frame::asset()),
            frame: Frame::asset(),
        }
    }

    /// Battery state of charge in percent, always within `[0, 100]`.
    pub fn battery_level(&self, is_home: bool) -> f64 {
        let mut state = self.state();
        if self.random_battery_level {
            return f64::from(state.rng.gen_range(500u32..=1000)) / 10.0;
        }
        let delta = if is_home {
            BATTERY_CHARGE_PER_SAMPLE
        } else {
            -BATTERY_DRAIN_PER_SAMPLE
        };
        state.battery_level = (state.battery_level + delta).clamp(0.0, 100.0);
        state.battery_level
    }

    /// Pressure in bar, always within `[0.011, 0.079]`.
    pub fn pressure_level(&self) -> f64 {
        let mbar = self
            .state()
            .rng
            .gen_range(MIN_PRESSURE_MBAR..=MAX_PRESSURE_MBAR);
        f64::from(mbar) * MBAR_TO_BAR
    }

    /// The simulated robot never sees obstacles.
    pub fn obstacle_status(&self) -> bool {
        false
    }

    // -------------------------------------------------------------------------
    // JSON payloads
    // -------------------------------------------------------------------------

    pub fn pose_telemetry(&self, isar_id: &str, robot_name: &str) -> Result<String, RobotError> {
        to_json(&TelemetryPosePayload {
            pose: self.pose(),
            isar_id: isar_id.to_string(),
            robot_name: robot_name.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn battery_telemetry(
        &self,
        isar_id: &str,
        robot_name: &str,
        is_home: bool,
    ) -> Result<String, RobotError> {
        to_json(&TelemetryBatteryPayload {
            battery_level: self.battery_level(is_home),
            isar_id: isar_id.to_string(),
            robot_name: robot_name.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn pressure_telemetry(&self, isar_id: &str, robot_name: &str) -> Result<String, RobotError> {
        to_json(&TelemetryPressurePayload {
            pressure_level: self.pressure_level(),
            isar_id: isar_id.to_string(),
            robot_name: robot_name.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn obstacle_status_telemetry(
        &self,
        isar_id: &str,
        robot_name: &str,
    ) -> Result<String, RobotError> {
        to_json(&TelemetryObstacleStatusPayload {
            obstacle_status: self.obstacle_status(),
            isar_id: isar_id.to_string(),
            robot_name: robot_name.to_string(),
            timestamp: Utc::now(),
        })
    }
}

fn to_json<T: serde::Serialize>(payload: &T) -> Result<String, RobotError> {
    serde_json::to_string(payload).map_err(|e| RobotError::Serialization(e.to_string()))
}
