//! Run orchestration
//!
//! Ties the steps of a standalone run together: select or register the task
//! definition, start the tasks, watch them and judge the outcome.

use std::sync::Arc;

use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
use ecs_pilot_client::EcsApi;
use ecs_pilot_core::OutcomeError;
use ecs_pilot_core::domain::outcome::evaluate_tasks;
use ecs_pilot_core::domain::status::WaitMode;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::RunError;
use crate::scheduler::{TaskWatcher, WatchSettings};
use crate::service::{LaunchSettings, TaskDefinitionSource, resolve_task_definition, start_tasks};

/// Final state of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub task_definition_arn: String,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_arn: String,
    pub last_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub name: String,
    pub exit_code: Option<i32>,
}

impl RunSummary {
    fn from_snapshot(task_definition_arn: String, snapshot: &DescribeTasksOutput) -> Self {
        let tasks = snapshot
            .tasks()
            .iter()
            .map(|task| TaskSummary {
                task_arn: task.task_arn().unwrap_or_default().to_string(),
                last_status: task.last_status().unwrap_or_default().to_string(),
                stopped_reason: task.stopped_reason().map(str::to_string),
                containers: task
                    .containers()
                    .iter()
                    .map(|c| ContainerSummary {
                        name: c.name().unwrap_or_default().to_string(),
                        exit_code: c.exit_code(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            task_definition_arn,
            tasks,
        }
    }
}

/// Runs standalone tasks to completion
pub struct TaskRunner {
    ecs: Arc<dyn EcsApi>,
    source: TaskDefinitionSource,
    launch: LaunchSettings,
    watch: WatchSettings,
    ignore_execution_fail: bool,
}

impl TaskRunner {
    pub fn new(ecs: Arc<dyn EcsApi>, config: &Config) -> Self {
        Self {
            ecs,
            source: config.task_definition_source(),
            launch: config.launch_settings(),
            watch: config.watch_settings(),
            ignore_execution_fail: config.ignore_execution_fail,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let task_definition =
            resolve_task_definition(self.ecs.as_ref(), &self.source, |name| {
                std::env::var(name).ok()
            })
            .await?;

        let request = self.launch.run_task_request(&task_definition)?;
        let task_arns = start_tasks(self.ecs.as_ref(), request).await?;

        let watcher = TaskWatcher::new(self.ecs.clone(), self.watch.clone());
        let snapshot = watcher.watch(&task_arns).await?;

        let summary = RunSummary::from_snapshot(task_definition, &snapshot);
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => info!("Final task state:\n{}", json),
            Err(e) => warn!("Failed to render run summary: {}", e),
        }

        self.evaluate(&snapshot)?;
        Ok(summary)
    }

    /// Judges the final snapshot
    ///
    /// Exit codes only exist once tasks have stopped, so a run that returns
    /// as soon as the tasks start is never judged.
    fn evaluate(&self, snapshot: &DescribeTasksOutput) -> Result<(), RunError> {
        if self.ignore_execution_fail {
            info!("Ignoring task execution result");
            return Ok(());
        }

        if self.watch.mode == WaitMode::UntilStarted {
            return Ok(());
        }

        if let Err(e) = evaluate_tasks(snapshot.tasks()) {
            match &e {
                OutcomeError::TaskFailed { task_arn, reason } => {
                    error!("Task {} failed: {}", task_arn, reason);
                }
                OutcomeError::FailedContainers(containers) => {
                    for c in containers {
                        error!(
                            "Container {} of task {} exited with code {} ({})",
                            c.name,
                            c.task_arn,
                            c.exit_code,
                            c.reason.as_deref().unwrap_or("no reason")
                        );
                    }
                }
            }
            return Err(e.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionOutput;
    use aws_sdk_ecs::operation::run_task::RunTaskOutput;
    use aws_sdk_ecs::types::{Container, Task, TaskDefinition};
    use clap::Parser;
    use ecs_pilot_client::testing::{Call, ScriptedEcs};

    fn config(extra: &[&str]) -> Config {
        let mut argv = vec![
            "ecs-pilot-task",
            "--cluster",
            "ci",
            "--family",
            "migrate",
            "--docker-image",
            "acme/migrate",
        ];
        argv.extend_from_slice(extra);
        Config::try_parse_from(argv).unwrap()
    }

    fn stopped(exit_code: Option<i32>) -> DescribeTasksOutput {
        let mut container = Container::builder().name("migrate-container");
        if let Some(code) = exit_code {
            container = container.exit_code(code);
        }
        DescribeTasksOutput::builder()
            .tasks(
                Task::builder()
                    .task_arn("arn:task/1")
                    .last_status("STOPPED")
                    .stopped_reason("Essential container in task exited")
                    .containers(container.build())
                    .build(),
            )
            .build()
    }

    fn ecs(final_state: DescribeTasksOutput) -> Arc<ScriptedEcs> {
        Arc::new(
            ScriptedEcs::new()
                .on_register_task_definition(Ok(RegisterTaskDefinitionOutput::builder()
                    .task_definition(
                        TaskDefinition::builder()
                            .task_definition_arn("arn:td/migrate:3")
                            .build(),
                    )
                    .build()))
                .on_run_task(Ok(RunTaskOutput::builder()
                    .tasks(Task::builder().task_arn("arn:task/1").build())
                    .build()))
                .on_describe_tasks(Ok(DescribeTasksOutput::builder()
                    .tasks(
                        Task::builder()
                            .task_arn("arn:task/1")
                            .last_status("RUNNING")
                            .build(),
                    )
                    .build()))
                .on_describe_tasks(Ok(final_state)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_run() {
        let ecs = ecs(stopped(Some(0)));
        let runner = TaskRunner::new(ecs.clone(), &config(&[]));

        let summary = runner.run().await.unwrap();

        assert_eq!(summary.task_definition_arn, "arn:td/migrate:3");
        assert_eq!(summary.tasks[0].containers[0].exit_code, Some(0));

        let calls = ecs.calls();
        assert!(matches!(calls[0], Call::RegisterTaskDefinition(_)));
        match &calls[1] {
            Call::RunTask(request) => {
                assert_eq!(
                    request.get_task_definition().as_deref(),
                    Some("arn:td/migrate:3")
                );
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_zero_exit_fails_the_run() {
        let runner = TaskRunner::new(ecs(stopped(Some(2))), &config(&[]));

        let err = runner.run().await.unwrap_err();

        assert_eq!(err.to_string(), "there are failed containers");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_exit_code_reports_stop_reason() {
        let runner = TaskRunner::new(ecs(stopped(None)), &config(&[]));

        let err = runner.run().await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Task failed: Essential container in task exited"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_execution_fail() {
        let runner = TaskRunner::new(
            ecs(stopped(Some(1))),
            &config(&["--ignore-execution-fail"]),
        );

        assert!(runner.run().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dont_wait_skips_evaluation() {
        let ecs = ecs(stopped(None));
        let runner = TaskRunner::new(ecs.clone(), &config(&["--dont-wait"]));

        let summary = runner.run().await.unwrap();

        // RUNNING already satisfies the watch
        assert_eq!(ecs.describe_tasks_count(), 1);
        assert_eq!(summary.tasks[0].last_status, "RUNNING");
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_task_definition() {
        let ecs = ecs(stopped(Some(0)));
        let runner = TaskRunner::new(
            ecs.clone(),
            &config(&[
                "--use-existing-task-definition",
                "--existing-task-definition-arn",
                "arn:td/migrate:1",
            ]),
        );

        let summary = runner.run().await.unwrap();

        assert_eq!(summary.task_definition_arn, "arn:td/migrate:1");
        assert!(matches!(ecs.calls()[0], Call::RunTask(_)));
    }
}
