//! Settings vault – reads `simbot.toml` and `ROBOT_*` environment overrides.
//!
//! Every option has a documented default, so an absent file and an empty
//! environment yield a fully usable [`Settings`].  Values are resolved in
//! this order (later wins):
//!
//! 1. built-in defaults,
//! 2. the TOML file at [`config_path`] (if it exists),
//! 3. `ROBOT_<NAME>` environment variables (case-sensitive).
//!
//! | Variable | Default |
//! |---|---|
//! | `ROBOT_MISSION_SIMULATION_TASK_DURATION` | `5.0` s |
//! | `ROBOT_INITIATE_MISSION_DURATION_IN_SECONDS` | `0.1` s |
//! | `ROBOT_SHOULD_HAVE_RANDOM_BATTERY_LEVEL` | `false` |
//! | `ROBOT_ROBOT_POSE_PUBLISH_INTERVAL` | `1` s |
//! | `ROBOT_ROBOT_BATTERY_PUBLISH_INTERVAL` | `2` s |
//! | `ROBOT_ROBOT_OBSTACLE_STATUS_PUBLISH_INTERVAL` | `10` s |
//! | `ROBOT_ROBOT_PRESSURE_PUBLISH_INTERVAL` | `20` s |
//! | `ROBOT_MISSION_SIMULATION_TIME_TO_START` | `5.0` s |
//! | `ROBOT_MISSION_SIMULATION_TIME_TO_STOP` | `2.0` s |
//! | `ROBOT_SHOULD_SIMULATE_INSPECTION_CALLBACK_CRASH` | `false` |
//! | `ROBOT_MISSION_SIMULATION_MISSION_COMPLETION_DELAY` | `2.0` s |
//! | `ROBOT_MISSION_SIMULATION_SHOULD_FAIL_RETURN_TO_HOME_TASK` | `false` |
//! | `ROBOT_MISSION_SIMULATION_SHOULD_FAIL_NORMAL_TASK` | `false` |
//! | `ROBOT_MISSION_SIMULATION_TASK_FAILURE_PROBABILITY` | `0.0` |
//! | `ROBOT_MISSION_SIMULATION_RETURN_HOME_TASK_FAILURE_PROBABILITY` | `0.0` |
//! | `ROBOT_MISSION_SIMULATION_API_DELAY_MODIFIER` | `5.0` |
//! | `ROBOT_MISSION_SIMULATION_SEED` | unset (entropy) |
//! | `ROBOT_EXAMPLE_DATA_DIR` | unset (bundled media) |

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "ROBOT_";

/// Errors raised while loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Flat, read-only configuration for the simulated robot.
///
/// Durations and intervals are expressed in seconds; use the accessor
/// methods to obtain [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How long each task runs before the simulation completes it.
    #[serde(default = "default_task_duration")]
    pub mission_simulation_task_duration: f64,

    #[serde(default = "default_initiate_mission_duration")]
    pub initiate_mission_duration_in_seconds: f64,

    /// Report a random battery level instead of the charge model.
    #[serde(default)]
    pub should_have_random_battery_level: bool,

    #[serde(default = "default_pose_interval")]
    pub robot_pose_publish_interval: f64,

    #[serde(default = "default_battery_interval")]
    pub robot_battery_publish_interval: f64,

    #[serde(default = "default_obstacle_interval")]
    pub robot_obstacle_status_publish_interval: f64,

    #[serde(default = "default_pressure_interval")]
    pub robot_pressure_publish_interval: f64,

    /// Simulated link latency before a submitted mission is accepted.
    #[serde(default = "default_time_to_start")]
    pub mission_simulation_time_to_start: f64,

    /// Simulated latency of an abort command reaching the robot.
    #[serde(default = "default_time_to_stop")]
    pub mission_simulation_time_to_stop: f64,

    #[serde(default)]
    pub should_simulate_inspection_callback_crash: bool,

    /// Time from the last task finishing to the mission finishing.
    #[serde(default = "default_completion_delay")]
    pub mission_simulation_mission_completion_delay: f64,

    #[serde(default)]
    pub mission_simulation_should_fail_return_to_home_task: bool,

    #[serde(default)]
    pub mission_simulation_should_fail_normal_task: bool,

    #[serde(default)]
    pub mission_simulation_task_failure_probability: f64,

    #[serde(default)]
    pub mission_simulation_return_home_task_failure_probability: f64,

    /// Upper bound (seconds) of the random delay added to status queries.
    #[serde(default = "default_api_delay_modifier")]
    pub mission_simulation_api_delay_modifier: f64,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_simulation_seed: Option<u64>,

    /// Directory holding the example inspection media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_data_dir: Option<PathBuf>,
}

fn default_task_duration() -> f64 {
    5.0
}
fn default_initiate_mission_duration() -> f64 {
    0.1
}
fn default_pose_interval() -> f64 {
    1.0
}
fn default_battery_interval() -> f64 {
    2.0
}
fn default_obstacle_interval() -> f64 {
    10.0
}
fn default_pressure_interval() -> f64 {
    20.0
}
fn default_time_to_start() -> f64 {
    5.0
}
fn default_time_to_stop() -> f64 {
    2.0
}
fn default_completion_delay() -> f64 {
    2.0
}
fn default_api_delay_modifier() -> f64 {
    5.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mission_simulation_task_duration: default_task_duration(),
            initiate_mission_duration_in_seconds: default_initiate_mission_duration(),
            should_have_random_battery_level: false,
            robot_pose_publish_interval: default_pose_interval(),
            robot_battery_publish_interval: default_battery_interval(),
            robot_obstacle_status_publish_interval: default_obstacle_interval(),
            robot_pressure_publish_interval: default_pressure_interval(),
            mission_simulation_time_to_start: default_time_to_start(),
            mission_simulation_time_to_stop: default_time_to_stop(),
            should_simulate_inspection_callback_crash: false,
            mission_simulation_mission_completion_delay: default_completion_delay(),
            mission_simulation_should_fail_return_to_home_task: false,
            mission_simulation_should_fail_normal_task: false,
            mission_simulation_task_failure_probability: 0.0,
            mission_simulation_return_home_task_failure_probability: 0.0,
            mission_simulation_api_delay_modifier: default_api_delay_modifier(),
            mission_simulation_seed: None,
            example_data_dir: None,
        }
    }
}

impl Settings {
    pub fn task_duration(&self) -> Duration {
        seconds(self.mission_simulation_task_duration)
    }

    pub fn initiate_mission_duration(&self) -> Duration {
        seconds(self.initiate_mission_duration_in_seconds)
    }

    pub fn time_to_start(&self) -> Duration {
        seconds(self.mission_simulation_time_to_start)
    }

    pub fn time_to_stop(&self) -> Duration {
        seconds(self.mission_simulation_time_to_stop)
    }

    pub fn mission_completion_delay(&self) -> Duration {
        seconds(self.mission_simulation_mission_completion_delay)
    }

    pub fn pose_publish_interval(&self) -> Duration {
        seconds(self.robot_pose_publish_interval)
    }

    pub fn battery_publish_interval(&self) -> Duration {
        seconds(self.robot_battery_publish_interval)
    }

    pub fn obstacle_status_publish_interval(&self) -> Duration {
        seconds(self.robot_obstacle_status_publish_interval)
    }

    pub fn pressure_publish_interval(&self) -> Duration {
        seconds(self.robot_pressure_publish_interval)
    }

    /// Probability that a normal task fails.  The `should_fail` toggle
    /// forces it to 1.0.
    pub fn normal_task_failure_probability(&self) -> f64 {
        if self.mission_simulation_should_fail_normal_task {
            1.0
        } else {
            self.mission_simulation_task_failure_probability.clamp(0.0, 1.0)
        }
    }

    /// Probability that a return-to-home task fails.  The `should_fail`
    /// toggle forces it to 1.0.
    pub fn return_home_failure_probability(&self) -> f64 {
        if self.mission_simulation_should_fail_return_to_home_task {
            1.0
        } else {
            self.mission_simulation_return_home_task_failure_probability
                .clamp(0.0, 1.0)
        }
    }
}

/// Convert a (possibly negative or NaN) number of seconds into a [`Duration`].
/// Invalid inputs collapse to zero.
pub fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the settings file: `$SIMBOT_CONFIG`, else `./simbot.toml`.
pub fn config_path() -> PathBuf {
    std::env::var("SIMBOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("simbot.toml"))
}

/// Load settings from [`config_path`] and the process environment.
pub fn load() -> Result<Settings, ConfigError> {
    load_from(&config_path())
}

/// Load settings from `path` (defaults when the file is missing), then apply
/// environment overrides.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw)?
    } else {
        Settings::default()
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Apply `ROBOT_*` environment variable overrides to `settings`.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary key lookup.  Keys carry the
/// [`ENV_PREFIX`].  Unparseable values are logged and ignored.
pub fn apply_overrides<F>(s: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    set_parsed(&get, "MISSION_SIMULATION_TASK_DURATION", &mut s.mission_simulation_task_duration);
    set_parsed(
        &get,
        "INITIATE_MISSION_DURATION_IN_SECONDS",
        &mut s.initiate_mission_duration_in_seconds,
    );
    set_bool(&get, "SHOULD_HAVE_RANDOM_BATTERY_LEVEL", &mut s.should_have_random_battery_level);
    set_parsed(&get, "ROBOT_POSE_PUBLISH_INTERVAL", &mut s.robot_pose_publish_interval);
    set_parsed(&get, "ROBOT_BATTERY_PUBLISH_INTERVAL", &mut s.robot_battery_publish_interval);
    set_parsed(
        &get,
        "ROBOT_OBSTACLE_STATUS_PUBLISH_INTERVAL",
        &mut s.robot_obstacle_status_publish_interval,
    );
    set_parsed(&get, "ROBOT_PRESSURE_PUBLISH_INTERVAL", &mut s.robot_pressure_publish_interval);
    set_parsed(&get, "MISSION_SIMULATION_TIME_TO_START", &mut s.mission_simulation_time_to_start);
    set_parsed(&get, "MISSION_SIMULATION_TIME_TO_STOP", &mut s.mission_simulation_time_to_stop);
    set_bool(
        &get,
        "SHOULD_SIMULATE_INSPECTION_CALLBACK_CRASH",
        &mut s.should_simulate_inspection_callback_crash,
    );
    set_parsed(
        &get,
        "MISSION_SIMULATION_MISSION_COMPLETION_DELAY",
        &mut s.mission_simulation_mission_completion_delay,
    );
    set_bool(
        &get,
        "MISSION_SIMULATION_SHOULD_FAIL_RETURN_TO_HOME_TASK",
        &mut s.mission_simulation_should_fail_return_to_home_task,
    );
    set_bool(
        &get,
        "MISSION_SIMULATION_SHOULD_FAIL_NORMAL_TASK",
        &mut s.mission_simulation_should_fail_normal_task,
    );
    set_parsed(
        &get,
        "MISSION_SIMULATION_TASK_FAILURE_PROBABILITY",
        &mut s.mission_simulation_task_failure_probability,
    );
    set_parsed(
        &get,
        "MISSION_SIMULATION_RETURN_HOME_TASK_FAILURE_PROBABILITY",
        &mut s.mission_simulation_return_home_task_failure_probability,
    );
    set_parsed(
        &get,
        "MISSION_SIMULATION_API_DELAY_MODIFIER",
        &mut s.mission_simulation_api_delay_modifier,
    );
    if let Some(raw) = get("MISSION_SIMULATION_SEED") {
        match raw.trim().parse::<u64>() {
            Ok(seed) => s.mission_simulation_seed = Some(seed),
            Err(_) => warn!(variable = "MISSION_SIMULATION_SEED", value = %raw, "ignoring unparseable override"),
        }
    }
    if let Some(raw) = get("EXAMPLE_DATA_DIR") {
        s.example_data_dir = Some(PathBuf::from(raw));
    }
}

fn set_parsed<T, G>(get: &G, name: &str, field: &mut T)
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(name) {
        match raw.trim().parse::<T>() {
            Ok(v) => *field = v,
            Err(_) => warn!(variable = name, value = %raw, "ignoring unparseable override"),
        }
    }
}

fn set_bool<G>(get: &G, name: &str, field: &mut bool)
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(name) {
        match parse_bool(&raw) {
            Some(v) => *field = v,
            None => warn!(variable = name, value = %raw, "ignoring unparseable override"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
