//! Run outcome evaluation
//!
//! Decides whether a finished set of tasks succeeded by looking at the exit
//! code of every container.

use aws_sdk_ecs::types::Task;

use crate::error::OutcomeError;

/// A container that exited with a non-zero code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedContainer {
    pub task_arn: String,
    pub name: String,
    pub exit_code: i32,
    pub reason: Option<String>,
}

/// Checks the final snapshot of a run
///
/// A container without an exit code means its task never ran to completion,
/// which fails the run immediately with the task's stop reason. Otherwise
/// every container with a non-zero exit code is collected.
pub fn evaluate_tasks(tasks: &[Task]) -> Result<(), OutcomeError> {
    let mut failed = Vec::new();

    for task in tasks {
        let task_arn = task.task_arn().unwrap_or_default();

        for container in task.containers() {
            match container.exit_code() {
                None => {
                    return Err(OutcomeError::TaskFailed {
                        task_arn: task_arn.to_string(),
                        reason: task.stopped_reason().unwrap_or("unknown").to_string(),
                    });
                }
                Some(0) => {}
                Some(code) => failed.push(FailedContainer {
                    task_arn: task_arn.to_string(),
                    name: container.name().unwrap_or_default().to_string(),
                    exit_code: code,
                    reason: container.reason().map(str::to_string),
                }),
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(OutcomeError::FailedContainers(failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::types::Container;

    fn container(name: &str, exit_code: Option<i32>) -> Container {
        Container::builder()
            .name(name)
            .set_exit_code(exit_code)
            .build()
    }

    fn task(arn: &str, containers: Vec<Container>) -> Task {
        Task::builder()
            .task_arn(arn)
            .last_status("STOPPED")
            .stopped_reason("Essential container in task exited")
            .set_containers(Some(containers))
            .build()
    }

    #[test]
    fn test_all_zero_exit_codes_succeed() {
        let tasks = vec![
            task("arn:task/1", vec![container("app", Some(0))]),
            task("arn:task/2", vec![container("app", Some(0)), container("sidecar", Some(0))]),
        ];
        assert!(evaluate_tasks(&tasks).is_ok());
    }

    #[test]
    fn test_missing_exit_code_fails_with_stop_reason() {
        let tasks = vec![task("arn:task/1", vec![container("app", None)])];

        let err = evaluate_tasks(&tasks).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task failed: Essential container in task exited"
        );
    }

    #[test]
    fn test_non_zero_exit_codes_are_collected() {
        let tasks = vec![
            task("arn:task/1", vec![container("app", Some(2))]),
            task("arn:task/2", vec![container("app", Some(0)), container("sidecar", Some(137))]),
        ];

        match evaluate_tasks(&tasks) {
            Err(OutcomeError::FailedContainers(failed)) => {
                assert_eq!(failed.len(), 2);
                assert_eq!(failed[0].exit_code, 2);
                assert_eq!(failed[1].name, "sidecar");
                assert_eq!(failed[1].task_arn, "arn:task/2");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_no_tasks_is_success() {
        assert!(evaluate_tasks(&[]).is_ok());
    }
}
