//! Mission status derivation.
//!
//! The overall [`MissionStatus`] is never stored; it is computed from the
//! pause flag, the completion flag and the per-task statuses.  Rules are
//! evaluated top to bottom and the first match wins:
//!
//! | # | Condition | Result |
//! |---|---|---|
//! | 1 | paused | `Paused` |
//! | 2 | every task `NotStarted` | `NotStarted` |
//! | 3 | simulation not finished | `InProgress` |
//! | 4 | every task `Successful` | `Successful` |
//! | 5 | any task `NotStarted` or `InProgress` | `InProgress` |
//! | 6 | every task `Failed` | `Failed` |
//! | 7 | any task `Cancelled` | `Cancelled` |
//! | 8 | any task `Failed` | `PartiallySuccessful` |
//!
//! Anything falling through is a consistency violation and is reported as
//! [`RobotError::MissionStatus`].

use simbot_types::{MissionStatus, RobotError, TaskStatus};

/// Derive the mission status from the simulation flags and task statuses.
pub fn derive_mission_status(
    paused: bool,
    mission_done: bool,
    statuses: &[TaskStatus],
) -> Result<MissionStatus, RobotError> {
    let all = |wanted: TaskStatus| statuses.iter().all(|s| *s == wanted);
    let any = |wanted: TaskStatus| statuses.iter().any(|s| *s == wanted);

    if paused {
        return Ok(MissionStatus::Paused);
    }
    if all(TaskStatus::NotStarted) {
        return Ok(MissionStatus::NotStarted);
    }
    if !mission_done {
        return Ok(MissionStatus::InProgress);
    }
    if all(TaskStatus::Successful) {
        return Ok(MissionStatus::Successful);
    }
    if statuses.iter().any(|s| s.is_unresolved()) {
        return Ok(MissionStatus::InProgress);
    }
    if all(TaskStatus::Failed) {
        return Ok(MissionStatus::Failed);
    }
    if any(TaskStatus::Cancelled) {
        return Ok(MissionStatus::Cancelled);
    }
    if any(TaskStatus::Failed) {
        return Ok(MissionStatus::PartiallySuccessful);
    }

    Err(RobotError::MissionStatus(format!(
        "no rule matched task statuses {statuses:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    fn derive(paused: bool, done: bool, statuses: &[TaskStatus]) -> MissionStatus {
        derive_mission_status(paused, done, statuses).expect("derivation failed")
    }

    #[test]
    fn paused_wins_over_everything() {
        assert_eq!(derive(true, false, &[NotStarted]), MissionStatus::Paused);
        assert_eq!(derive(true, false, &[InProgress, NotStarted]), MissionStatus::Paused);
        assert_eq!(derive(true, true, &[Successful]), MissionStatus::Paused);
    }

    #[test]
    fn all_not_started_is_not_started() {
        assert_eq!(derive(false, false, &[NotStarted, NotStarted]), MissionStatus::NotStarted);
        assert_eq!(derive(false, true, &[NotStarted]), MissionStatus::NotStarted);
    }

    #[test]
    fn unfinished_simulation_is_in_progress() {
        assert_eq!(derive(false, false, &[InProgress, NotStarted]), MissionStatus::InProgress);
        assert_eq!(derive(false, false, &[Successful, Successful]), MissionStatus::InProgress);
        assert_eq!(derive(false, false, &[Failed]), MissionStatus::InProgress);
    }

    #[test]
    fn finished_all_successful_is_successful() {
        assert_eq!(derive(false, true, &[Successful, Successful]), MissionStatus::Successful);
    }

    #[test]
    fn finished_with_unresolved_tasks_is_in_progress() {
        assert_eq!(derive(false, true, &[Successful, InProgress]), MissionStatus::InProgress);
        assert_eq!(derive(false, true, &[Failed, NotStarted]), MissionStatus::InProgress);
    }

    #[test]
    fn finished_all_failed_is_failed() {
        assert_eq!(derive(false, true, &[Failed]), MissionStatus::Failed);
        assert_eq!(derive(false, true, &[Failed, Failed]), MissionStatus::Failed);
    }

    #[test]
    fn cancelled_takes_precedence_over_partial_success() {
        assert_eq!(derive(false, true, &[Successful, Cancelled]), MissionStatus::Cancelled);
        assert_eq!(derive(false, true, &[Failed, Cancelled]), MissionStatus::Cancelled);
        assert_eq!(derive(false, true, &[Cancelled, Cancelled]), MissionStatus::Cancelled);
    }

    #[test]
    fn mixed_success_and_failure_is_partially_successful() {
        assert_eq!(
            derive(false, true, &[Successful, Failed]),
            MissionStatus::PartiallySuccessful
        );
        assert_eq!(
            derive(false, true, &[Failed, Successful, Successful]),
            MissionStatus::PartiallySuccessful
        );
    }

    #[test]
    fn every_terminal_combination_is_handled() {
        let terminal = [Successful, Failed, Cancelled];
        for a in terminal {
            for b in terminal {
                for c in terminal {
                    let statuses = [a, b, c];
                    assert!(
                        derive_mission_status(false, true, &statuses).is_ok(),
                        "no status derived for {statuses:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn empty_status_list_falls_through_to_not_started() {
        assert_eq!(derive(false, true, &[]), MissionStatus::NotStarted);
    }
}
