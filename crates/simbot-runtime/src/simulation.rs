//! [`MissionSimulation`] – time-driven emulation of a robot executing a
//! mission.
//!
//! Each simulation owns one background worker thread that walks the
//! mission's tasks in order.  Every task takes `task_duration`, after which
//! it is randomly marked `Failed` (with the configured failure probability)
//! or `Successful`, and the next task becomes `InProgress`.  Callers observe
//! and steer the run from other threads:
//!
//! | Call | Effect |
//! |---|---|
//! | [`start`][MissionSimulation::start] | Spawn the worker. |
//! | [`task_status`][MissionSimulation::task_status] | Recorded status of one task. |
//! | [`mission_status`][MissionSimulation::mission_status] | Derived overall status (see [`crate::status`]). |
//! | [`pause_mission`][MissionSimulation::pause_mission] | Hold the worker before it resolves the next task. |
//! | [`resume_mission`][MissionSimulation::resume_mission] | Release a paused worker. |
//! | [`stop_mission`][MissionSimulation::stop_mission] | Cancel outstanding tasks and join the worker. |
//!
//! A mission consisting of a single `ReturnToHome` task is special-cased:
//! the task resolves once (failing with the return-home failure probability)
//! and the worker never advances past it.
//!
//! Pausing does not interrupt a task in flight; it only blocks the worker at
//! the next decision point.  Stopping interrupts the task wait immediately,
//! but the configured start, stop and completion delays are never cut short.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simbot_config::Settings;
use simbot_types::{Mission, MissionStatus, RobotError, Task, TaskStatus};
use tracing::{debug, info, warn};

use crate::signal::Signal;
use crate::status::derive_mission_status;

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Timing and failure parameters for one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Delay applied inside [`MissionSimulation::new`].
    pub time_to_start: Duration,
    /// Delay applied at the beginning of [`MissionSimulation::stop_mission`].
    pub time_to_stop: Duration,
    /// How long each task stays `InProgress`.
    pub task_duration: Duration,
    /// Pause between a task finishing and its status being recorded, and
    /// again before the run is flagged as done.
    pub mission_completion_delay: Duration,
    /// Probability in `[0, 1]` that a normal task fails.
    pub task_failure_probability: f64,
    /// Probability in `[0, 1]` that a return-to-home task fails.
    pub return_home_failure_probability: f64,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SimulationSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            time_to_start: settings.time_to_start(),
            time_to_stop: settings.time_to_stop(),
            task_duration: settings.task_duration(),
            mission_completion_delay: settings.mission_completion_delay(),
            task_failure_probability: settings.normal_task_failure_probability(),
            return_home_failure_probability: settings.return_home_failure_probability(),
            seed: settings.mission_simulation_seed,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable run state.  Only the worker writes it once the run has started.
#[derive(Debug)]
struct Progress {
    task_index: usize,
    statuses: Vec<TaskStatus>,
    all_tasks_done: bool,
}

impl Progress {
    fn new(task_count: usize) -> Self {
        Self {
            task_index: 0,
            statuses: vec![TaskStatus::NotStarted; task_count],
            all_tasks_done: false,
        }
    }

    /// Record `status` for the current task and move on to the next one.
    fn complete_current(&mut self, status: TaskStatus) {
        let Some(slot) = self.statuses.get_mut(self.task_index) else {
            self.all_tasks_done = true;
            return;
        };
        *slot = status;
        self.task_index += 1;
        match self.statuses.get_mut(self.task_index) {
            Some(next) => *next = TaskStatus::InProgress,
            None => self.all_tasks_done = true,
        }
    }

    fn cancel_unresolved(&mut self) {
        for status in self.statuses.iter_mut().filter(|s| s.is_unresolved()) {
            *status = TaskStatus::Cancelled;
        }
    }
}

struct Shared {
    mission: Mission,
    is_return_home: bool,
    task_index_by_id: HashMap<String, usize>,
    progress: Mutex<Progress>,
    mission_done: AtomicBool,
    mission_started: AtomicBool,
    /// Set while running, cleared while paused.
    resume: Signal,
    stop: Signal,
    /// Set once the run is resolved and no worker is left running.
    finished: Signal,
}

impl Shared {
    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_done(&self) {
        self.mission_done.store(true, Ordering::SeqCst);
    }

    /// Resolve a run whose worker will never finish it: cancel what is left
    /// and release every waiting stop.
    fn abandon(&self) {
        self.progress().cancel_unresolved();
        self.mark_done();
        self.finished.set();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MissionSimulation
// ─────────────────────────────────────────────────────────────────────────────

/// A single simulated mission run.
pub struct MissionSimulation {
    shared: Arc<Shared>,
    settings: SimulationSettings,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MissionSimulation {
    /// Validate `mission`, wait `time_to_start` and prepare a run with every
    /// task `NotStarted`.  The worker is not spawned until [`start`][Self::start].
    ///
    /// Returns [`RobotError::InvalidMission`] when the mission has no tasks or
    /// repeats a task id.
    pub fn new(mission: Mission, settings: SimulationSettings) -> Result<Self, RobotError> {
        if mission.tasks.is_empty() {
            return Err(RobotError::InvalidMission(format!(
                "mission {} has no tasks",
                mission.id
            )));
        }

        let mut task_index_by_id = HashMap::with_capacity(mission.tasks.len());
        for (index, task) in mission.tasks.iter().enumerate() {
            if task_index_by_id.insert(task.id.clone(), index).is_some() {
                return Err(RobotError::InvalidMission(format!(
                    "duplicate task id {} in mission {}",
                    task.id, mission.id
                )));
            }
        }

        thread::sleep(settings.time_to_start);

        let shared = Arc::new(Shared {
            is_return_home: mission.is_return_to_home(),
            progress: Mutex::new(Progress::new(mission.tasks.len())),
            task_index_by_id,
            mission,
            mission_done: AtomicBool::new(false),
            mission_started: AtomicBool::new(false),
            resume: Signal::new(true),
            stop: Signal::new(false),
            finished: Signal::new(false),
        });

        Ok(Self {
            shared,
            settings,
            worker: Mutex::new(None),
        })
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the background worker.  Calling this more than once is a no-op.
    pub fn start(&self) -> Result<(), RobotError> {
        let mut worker = self.worker();
        if worker.is_some() {
            warn!(mission_id = %self.shared.mission.id, "mission simulation already started");
            return Ok(());
        }

        let rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let run = Worker {
            shared: Arc::clone(&self.shared),
            settings: self.settings.clone(),
            rng,
        };

        let handle = thread::Builder::new()
            .name("mission-simulation".to_string())
            .spawn(move || run.run())
            .map_err(|e| RobotError::InitiateMission(format!("failed to spawn worker: {e}")))?;

        self.shared.mission_started.store(true, Ordering::SeqCst);
        *worker = Some(handle);
        Ok(())
    }

    pub fn mission(&self) -> &Mission {
        &self.shared.mission
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// `true` once the worker has finished (naturally or after a stop).
    pub fn is_done(&self) -> bool {
        self.shared.mission_done.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.shared.mission_started.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        !self.shared.resume.is_set()
    }

    pub fn is_return_home(&self) -> bool {
        self.shared.is_return_home
    }

    /// Recorded status of the task with `task_id`.
    pub fn task_status(&self, task_id: &str) -> Result<TaskStatus, RobotError> {
        let not_found = || RobotError::TaskNotFound(task_id.to_string());
        let index = *self.shared.task_index_by_id.get(task_id).ok_or_else(not_found)?;
        self.shared
            .progress()
            .statuses
            .get(index)
            .copied()
            .ok_or_else(not_found)
    }

    /// Snapshot of every task status, in mission order.
    pub fn task_statuses(&self) -> Vec<TaskStatus> {
        self.shared.progress().statuses.clone()
    }

    /// Overall mission status derived from the current task statuses.
    pub fn mission_status(&self) -> Result<MissionStatus, RobotError> {
        // Read the done flag first: statuses are final before it is set.
        let done = self.is_done();
        let progress = self.shared.progress();
        derive_mission_status(self.is_paused(), done, &progress.statuses)
    }

    /// The task the worker is currently on, or `None` once it has moved past
    /// the last one.
    pub fn current_task(&self) -> Option<Task> {
        let index = self.shared.progress().task_index;
        self.shared.mission.tasks.get(index).cloned()
    }

    pub fn pause_mission(&self) -> Result<(), RobotError> {
        self.ensure_running("Could not pause mission")?;
        self.shared.resume.clear();
        info!(mission_id = %self.shared.mission.id, "mission paused");
        Ok(())
    }

    pub fn resume_mission(&self) -> Result<(), RobotError> {
        self.ensure_running("Could not resume mission")?;
        self.shared.resume.set();
        info!(mission_id = %self.shared.mission.id, "mission resumed");
        Ok(())
    }

    /// Stop the run and block until the worker has exited.
    ///
    /// Waits `time_to_stop` first.  Every task that has not resolved is
    /// marked `Cancelled`.  Concurrent stops all wait for the same worker.
    pub fn stop_mission(&self) -> Result<(), RobotError> {
        self.ensure_running("Could not stop mission")?;
        thread::sleep(self.settings.time_to_stop);

        self.shared.stop.set();
        // A paused worker must wake up to observe the stop.
        self.shared.resume.set();

        let (handle, started) = {
            let mut worker = self.worker();
            (worker.take(), self.is_started())
        };
        match handle {
            Some(handle) => {
                if handle.join().is_err() {
                    warn!(mission_id = %self.shared.mission.id, "mission simulation worker panicked");
                    self.shared.abandon();
                }
            }
            // Another stop took the handle and is joining the worker.
            None if started => self.shared.finished.wait(),
            None => self.shared.abandon(),
        }

        info!(mission_id = %self.shared.mission.id, "mission stopped");
        Ok(())
    }

    fn ensure_running(&self, action: &str) -> Result<(), RobotError> {
        if self.is_done() {
            return Err(RobotError::NoMissionRunning(format!(
                "{action} {}, it has already finished",
                self.shared.mission.id
            )));
        }
        Ok(())
    }
}

impl Drop for MissionSimulation {
    fn drop(&mut self) {
        // Let a detached worker wind down instead of running to completion.
        self.shared.stop.set();
        self.shared.resume.set();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

struct Worker {
    shared: Arc<Shared>,
    settings: SimulationSettings,
    rng: StdRng,
}

impl Worker {
    fn run(mut self) {
        let mission_id = self.shared.mission.id.clone();
        info!(
            mission_id = %mission_id,
            tasks = self.shared.mission.tasks.len(),
            return_home = self.shared.is_return_home,
            "mission simulation started"
        );

        if self.shared.stop.is_set() {
            self.shared.abandon();
            info!(mission_id = %mission_id, "mission stopped before the first task");
            return;
        }

        if let Some(first) = self.shared.progress().statuses.first_mut() {
            *first = TaskStatus::InProgress;
        }

        let stopped = self.run_tasks();

        if stopped {
            self.shared.progress().cancel_unresolved();
        }
        thread::sleep(self.settings.mission_completion_delay);
        self.shared.mark_done();
        info!(mission_id = %mission_id, stopped, "exiting mission simulation");
        self.shared.finished.set();
    }

    /// Drive tasks until every task has resolved or a stop is observed.
    /// Returns `true` when the loop ended because of a stop.
    fn run_tasks(&mut self) -> bool {
        loop {
            if self.shared.stop.wait_timeout(self.settings.task_duration) {
                return true;
            }
            if self.shared.progress().all_tasks_done {
                return false;
            }

            thread::sleep(self.settings.mission_completion_delay);
            self.shared.resume.wait();
            if self.shared.stop.is_set() {
                return true;
            }

            let failure_probability = if self.shared.is_return_home {
                self.settings.return_home_failure_probability
            } else {
                self.settings.task_failure_probability
            };
            let status = if self.roll(failure_probability) {
                TaskStatus::Failed
            } else {
                TaskStatus::Successful
            };
            self.complete_task(status);
        }
    }

    fn roll(&mut self, probability: f64) -> bool {
        self.rng.gen_range(0.0..1.0) < probability
    }

    fn complete_task(&self, status: TaskStatus) {
        let mut progress = self.shared.progress();
        let index = progress.task_index;
        progress.complete_current(status);
        debug!(
            mission_id = %self.shared.mission.id,
            task_index = index,
            status = ?status,
            "task completed"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
