//! Task status domain types
//!
//! ECS reports a task's `lastStatus` as a free-form string. These types give
//! the runner a typed view of it and remember what was last seen per task.

use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle phase of an ECS task, parsed from `lastStatus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
    /// A status this crate does not know about (or an empty one)
    Unknown(String),
}

impl TaskPhase {
    /// Parses an ECS `lastStatus` value
    pub fn parse(status: &str) -> Self {
        match status {
            "PROVISIONING" => Self::Provisioning,
            "PENDING" => Self::Pending,
            "ACTIVATING" => Self::Activating,
            "RUNNING" => Self::Running,
            "DEACTIVATING" => Self::Deactivating,
            "STOPPING" => Self::Stopping,
            "DEPROVISIONING" => Self::Deprovisioning,
            "STOPPED" => Self::Stopped,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the task has left the pre-start phases
    ///
    /// Unknown statuses count as not started.
    pub fn has_started(&self) -> bool {
        !matches!(
            self,
            Self::Provisioning | Self::Pending | Self::Activating | Self::Unknown(_)
        )
    }

    /// Whether the task reached its terminal phase
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Pending => "PENDING",
            Self::Activating => "ACTIVATING",
            Self::Running => "RUNNING",
            Self::Deactivating => "DEACTIVATING",
            Self::Stopping => "STOPPING",
            Self::Deprovisioning => "DEPROVISIONING",
            Self::Stopped => "STOPPED",
            Self::Unknown(status) => status,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runner waits for before it stops polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Wait until every task is `STOPPED`
    #[default]
    UntilStopped,
    /// Wait only until every task has started
    UntilStarted,
}

impl WaitMode {
    pub fn from_dont_wait(dont_wait: bool) -> Self {
        if dont_wait {
            Self::UntilStarted
        } else {
            Self::UntilStopped
        }
    }

    /// Whether a task in `phase` satisfies this mode
    pub fn is_satisfied_by(&self, phase: &TaskPhase) -> bool {
        match self {
            Self::UntilStopped => phase.is_stopped(),
            Self::UntilStarted => phase.has_started(),
        }
    }
}

/// Last observed phase of every task in a run, keyed by task ARN
#[derive(Debug, Default)]
pub struct StatusBoard {
    phases: BTreeMap<String, TaskPhase>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the phase of a task
    ///
    /// Returns `true` when the task is new or its phase changed.
    pub fn observe(&mut self, task_arn: &str, phase: TaskPhase) -> bool {
        match self.phases.get(task_arn) {
            Some(previous) if *previous == phase => false,
            _ => {
                self.phases.insert(task_arn.to_string(), phase);
                true
            }
        }
    }

    pub fn phase(&self, task_arn: &str) -> Option<&TaskPhase> {
        self.phases.get(task_arn)
    }

    /// Whether every tracked task satisfies `mode`
    ///
    /// An empty board is never complete.
    pub fn all_satisfy(&self, mode: WaitMode) -> bool {
        !self.phases.is_empty() && self.phases.values().all(|p| mode.is_satisfied_by(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_and_unknown_phases() {
        assert_eq!(TaskPhase::parse("RUNNING"), TaskPhase::Running);
        assert_eq!(TaskPhase::parse("STOPPED"), TaskPhase::Stopped);
        assert_eq!(
            TaskPhase::parse("SOMETHING_NEW"),
            TaskPhase::Unknown("SOMETHING_NEW".to_string())
        );
        assert_eq!(TaskPhase::parse("DEPROVISIONING").to_string(), "DEPROVISIONING");
    }

    #[test]
    fn test_has_started() {
        assert!(!TaskPhase::Provisioning.has_started());
        assert!(!TaskPhase::Pending.has_started());
        assert!(!TaskPhase::Activating.has_started());
        assert!(!TaskPhase::parse("").has_started());
        assert!(TaskPhase::Running.has_started());
        assert!(TaskPhase::Stopping.has_started());
        assert!(TaskPhase::Stopped.has_started());
    }

    #[test]
    fn test_wait_mode() {
        assert_eq!(WaitMode::from_dont_wait(true), WaitMode::UntilStarted);
        assert_eq!(WaitMode::from_dont_wait(false), WaitMode::UntilStopped);

        assert!(!WaitMode::UntilStopped.is_satisfied_by(&TaskPhase::Running));
        assert!(WaitMode::UntilStopped.is_satisfied_by(&TaskPhase::Stopped));
        assert!(WaitMode::UntilStarted.is_satisfied_by(&TaskPhase::Running));
        assert!(!WaitMode::UntilStarted.is_satisfied_by(&TaskPhase::Pending));
    }

    #[test]
    fn test_status_board_reports_changes_once() {
        let mut board = StatusBoard::new();

        assert!(board.observe("arn:task/1", TaskPhase::Pending));
        assert!(!board.observe("arn:task/1", TaskPhase::Pending));
        assert!(board.observe("arn:task/1", TaskPhase::Running));
        assert_eq!(board.phase("arn:task/1"), Some(&TaskPhase::Running));
    }

    #[test]
    fn test_status_board_completion() {
        let mut board = StatusBoard::new();
        assert!(!board.all_satisfy(WaitMode::UntilStarted));

        board.observe("arn:task/1", TaskPhase::Stopped);
        board.observe("arn:task/2", TaskPhase::Running);

        assert!(board.all_satisfy(WaitMode::UntilStarted));
        assert!(!board.all_satisfy(WaitMode::UntilStopped));

        board.observe("arn:task/2", TaskPhase::Stopped);
        assert!(board.all_satisfy(WaitMode::UntilStopped));
        assert_eq!(board.phase("arn:task/2"), Some(&TaskPhase::Stopped));
    }
}
