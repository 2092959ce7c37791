//! [`Robot`] – the driver surface a mission supervisor talks to.
//!
//! Wraps at most one [`MissionSimulation`] at a time and adds the behaviour
//! a real robot API would show around it: a start-up delay when a mission is
//! submitted, random latency on status queries, home tracking, inspection
//! retrieval and periodic telemetry.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simbot_config::{Settings, seconds};
use simbot_hal::{InspectionFactory, TelemetryGenerator};
use simbot_runtime::{MissionSimulation, SimulationSettings};
use simbot_types::{Inspection, Mission, MissionStatus, RobotError, RobotStatus, Task, TaskStatus};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::publisher::{PublisherHandle, TelemetryMessage, TelemetryPublisher};

/// Receives every inspection produced by a successful inspection task,
/// together with the mission it belongs to.
pub type InspectionCallback = Box<dyn Fn(Inspection, &Mission) + Send + Sync>;

/// Simulated robot driver.
pub struct Robot {
    settings: Settings,
    simulation: Mutex<Option<Arc<MissionSimulation>>>,
    /// Set while a submitted mission sits in its start-up delay.
    starting: AtomicBool,
    is_home: Arc<AtomicBool>,
    telemetry: Arc<TelemetryGenerator>,
    inspections: InspectionFactory,
    inspection_callback: Option<InspectionCallback>,
    /// Task ids whose inspection has already been delivered.
    delivered: Mutex<HashSet<String>>,
    rng: Mutex<StdRng>,
}

impl Robot {
    pub fn new(settings: Settings) -> Self {
        let (telemetry, rng) = match settings.mission_simulation_seed {
            Some(seed) => (
                TelemetryGenerator::with_seed(settings.should_have_random_battery_level, seed),
                StdRng::seed_from_u64(seed),
            ),
            None => (
                TelemetryGenerator::new(settings.should_have_random_battery_level),
                StdRng::from_entropy(),
            ),
        };
        let inspections = match &settings.example_data_dir {
            Some(dir) => InspectionFactory::new(dir),
            None => InspectionFactory::bundled(),
        };

        Self {
            settings,
            simulation: Mutex::new(None),
            starting: AtomicBool::new(false),
            is_home: Arc::new(AtomicBool::new(false)),
            telemetry: Arc::new(telemetry),
            inspections,
            inspection_callback: None,
            delivered: Mutex::new(HashSet::new()),
            rng: Mutex::new(rng),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_home(&self) -> bool {
        self.is_home.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<MissionSimulation>>> {
        self.simulation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current simulation, finished or not.
    pub fn simulation(&self) -> Option<Arc<MissionSimulation>> {
        self.slot().clone()
    }

    fn require_simulation(&self, action: &str) -> Result<Arc<MissionSimulation>, RobotError> {
        self.simulation()
            .ok_or_else(|| RobotError::NoMissionRunning(format!("Could not {action} non-existent mission")))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mission control
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit `mission` and start simulating it.
    ///
    /// Queries are answered during the simulation's start-up delay: the
    /// robot reports `Busy` and rejects further missions until it ends.
    ///
    /// # Errors
    ///
    /// [`RobotError::InitiateMission`] when another mission is still running
    /// or being initiated, or a return-to-home mission is sent while already
    /// home; [`RobotError::InvalidMission`] for empty missions or duplicate
    /// task ids.
    pub fn initiate_mission(&self, mission: Mission) -> Result<(), RobotError> {
        thread::sleep(self.settings.initiate_mission_duration());

        let return_home = mission.is_return_to_home();
        {
            let slot = self.slot();
            if let Some(active) = slot.as_ref().filter(|s| !s.is_done()) {
                return Err(RobotError::InitiateMission(format!(
                    "mission {} is still running",
                    active.mission().id
                )));
            }
            if return_home && self.is_home() {
                return Err(RobotError::InitiateMission(
                    "Robot is already home, return to home mission is redundant".to_string(),
                ));
            }
            if self.starting.swap(true, Ordering::SeqCst) {
                return Err(RobotError::InitiateMission(
                    "another mission is being initiated".to_string(),
                ));
            }
        }

        let mission_id = mission.id.clone();
        let built = MissionSimulation::new(mission, SimulationSettings::from(&self.settings))
            .and_then(|simulation| simulation.start().map(|()| simulation));

        let mut slot = self.slot();
        self.starting.store(false, Ordering::SeqCst);
        let simulation = built?;

        if !return_home {
            self.is_home.store(false, Ordering::SeqCst);
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *slot = Some(Arc::new(simulation));

        info!(mission_id = %mission_id, return_home, "mission initiated");
        Ok(())
    }

    /// Status of one task of the current mission.
    ///
    /// Every call first waits a random API delay.  A successful return-to-home
    /// task marks the robot as home; a successful inspection task delivers its
    /// inspection to the registered callback once.
    pub fn task_status(&self, task_id: &str) -> Result<TaskStatus, RobotError> {
        self.simulate_api_delay();

        let simulation = self
            .simulation()
            .ok_or_else(|| RobotError::TaskNotFound(task_id.to_string()))?;
        let status = simulation.task_status(task_id)?;

        if status == TaskStatus::Successful {
            if let Some(task) = simulation.mission().tasks.iter().find(|t| t.id == task_id) {
                self.on_task_successful(task, simulation.mission());
            }
        }
        Ok(status)
    }

    pub fn mission_status(&self) -> Result<MissionStatus, RobotError> {
        self.require_simulation("get status of")?.mission_status()
    }

    pub fn stop(&self) -> Result<(), RobotError> {
        self.require_simulation("stop")?.stop_mission()
    }

    pub fn pause(&self) -> Result<(), RobotError> {
        self.require_simulation("pause")?.pause_mission()
    }

    pub fn resume(&self) -> Result<(), RobotError> {
        self.require_simulation("resume")?.resume_mission()
    }

    pub fn robot_status(&self) -> RobotStatus {
        if self.starting.load(Ordering::SeqCst) {
            return RobotStatus::Busy;
        }
        match self.simulation().filter(|s| !s.is_done()) {
            Some(active) if active.is_paused() => RobotStatus::Paused,
            Some(_) => RobotStatus::Busy,
            None if self.is_home() => RobotStatus::Home,
            None => RobotStatus::Available,
        }
    }

    fn simulate_api_delay(&self) {
        let modifier = self.settings.mission_simulation_api_delay_modifier;
        if modifier <= 0.0 || !modifier.is_finite() {
            return;
        }
        let delay = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..modifier);
        thread::sleep(seconds(delay));
    }

    fn on_task_successful(&self, task: &Task, mission: &Mission) {
        if task.is_return_to_home() {
            if !self.is_home.swap(true, Ordering::SeqCst) {
                info!(mission_id = %mission.id, "robot arrived home");
            }
            return;
        }
        if self.inspection_callback.is_none() || !task.kind.is_inspection() {
            return;
        }
        let first_time = self
            .delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.id.clone());
        if !first_time {
            return;
        }
        if let Err(e) = self.deliver_inspection(task, mission) {
            warn!(task_id = %task.id, error = %e, "inspection delivery failed");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspections
    // ─────────────────────────────────────────────────────────────────────────

    /// Build the inspection artifact for `task`.
    pub fn get_inspection(&self, task: &Task) -> Result<Inspection, RobotError> {
        self.inspections.create(task, &self.telemetry)
    }

    pub fn register_inspection_callback<F>(&mut self, callback: F)
    where
        F: Fn(Inspection, &Mission) + Send + Sync + 'static,
    {
        self.inspection_callback = Some(Box::new(callback));
    }

    /// Build the inspection for `task` and hand it to the registered
    /// callback.  Does nothing when no callback is registered.
    ///
    /// With `should_simulate_inspection_callback_crash` set, the callback is
    /// never reached and [`RobotError::InspectionCallback`] is returned.
    pub fn deliver_inspection(&self, task: &Task, mission: &Mission) -> Result<(), RobotError> {
        let Some(callback) = self.inspection_callback.as_ref() else {
            return Ok(());
        };
        if self.settings.should_simulate_inspection_callback_crash {
            return Err(RobotError::InspectionCallback(format!(
                "simulated crash while delivering inspection for task {}",
                task.id
            )));
        }
        let inspection = self.get_inspection(task)?;
        debug!(task_id = %task.id, inspection_id = %inspection.id(), "delivering inspection");
        callback(inspection, mission);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Telemetry
    // ─────────────────────────────────────────────────────────────────────────

    /// Start the four periodic telemetry publishers (pose, battery, obstacle
    /// status, pressure) on `isar/{isar_id}/<kind>` topics.
    pub fn get_telemetry_publishers(
        &self,
        sender: &broadcast::Sender<TelemetryMessage>,
        isar_id: &str,
        robot_name: &str,
    ) -> Result<Vec<PublisherHandle>, RobotError> {
        self.telemetry_publishers(isar_id, robot_name)
            .into_iter()
            .map(|publisher| publisher.start(sender.clone()))
            .collect()
    }

    /// The publishers [`get_telemetry_publishers`][Self::get_telemetry_publishers]
    /// starts, unstarted.
    pub fn telemetry_publishers(&self, isar_id: &str, robot_name: &str) -> Vec<TelemetryPublisher> {
        let topic = |kind: &str| format!("isar/{isar_id}/{kind}");
        let ids = (isar_id.to_string(), robot_name.to_string());

        let pose = {
            let (telemetry, (isar_id, robot_name)) = (Arc::clone(&self.telemetry), ids.clone());
            TelemetryPublisher::new("pose", topic("pose"), self.settings.pose_publish_interval(), move || {
                telemetry.pose_telemetry(&isar_id, &robot_name)
            })
        };
        let battery = {
            let (telemetry, (isar_id, robot_name)) = (Arc::clone(&self.telemetry), ids.clone());
            let is_home = Arc::clone(&self.is_home);
            TelemetryPublisher::new(
                "battery",
                topic("battery"),
                self.settings.battery_publish_interval(),
                move || telemetry.battery_telemetry(&isar_id, &robot_name, is_home.load(Ordering::SeqCst)),
            )
        };
        let obstacle_status = {
            let (telemetry, (isar_id, robot_name)) = (Arc::clone(&self.telemetry), ids.clone());
            TelemetryPublisher::new(
                "obstacle_status",
                topic("obstacle_status"),
                self.settings.obstacle_status_publish_interval(),
                move || telemetry.obstacle_status_telemetry(&isar_id, &robot_name),
            )
        };
        let pressure = {
            let (telemetry, (isar_id, robot_name)) = (Arc::clone(&self.telemetry), ids);
            TelemetryPublisher::new(
                "pressure",
                topic("pressure"),
                self.settings.pressure_publish_interval(),
                move || telemetry.pressure_telemetry(&isar_id, &robot_name),
            )
        };

        vec![pose, battery, obstacle_status, pressure]
    }
}
