//! Task watcher
//!
//! Polls `DescribeTasks` for the tasks of a run, logging every phase change.
//! The watch ends once every task satisfies the [`WaitMode`], or fails when
//! the timeout is exceeded (optionally stopping the tasks first).

use std::sync::Arc;

use aws_sdk_ecs::operation::describe_tasks::{DescribeTasksInput, DescribeTasksOutput};
use aws_sdk_ecs::operation::stop_task::StopTaskInput;
use ecs_pilot_client::EcsApi;
use ecs_pilot_core::domain::status::{StatusBoard, TaskPhase, WaitMode};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::RunError;

/// Seconds between "Still running..." progress lines
const PROGRESS_EVERY_SECS: u64 = 10;

/// Whether a "Still running..." line is due after `elapsed` whole seconds
fn progress_due(elapsed: u64) -> bool {
    elapsed > 0 && elapsed % PROGRESS_EVERY_SECS == 0
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub cluster: String,
    pub mode: WaitMode,
    /// Whole seconds are compared; the watch fails once elapsed exceeds it
    pub timeout: Duration,
    pub kill_on_timeout: bool,
    pub poll_interval: Duration,
}

/// Follows the tasks of a run until completion
pub struct TaskWatcher {
    ecs: Arc<dyn EcsApi>,
    settings: WatchSettings,
}

impl TaskWatcher {
    pub fn new(ecs: Arc<dyn EcsApi>, settings: WatchSettings) -> Self {
        Self { ecs, settings }
    }

    /// Polls until every task in `task_arns` satisfies the wait mode
    ///
    /// Returns the last `DescribeTasks` snapshot, which carries the container
    /// exit codes of stopped tasks.
    pub async fn watch(&self, task_arns: &[String]) -> Result<DescribeTasksOutput, RunError> {
        info!(
            "Waiting for {} task(s) (mode: {:?}, timeout: {}s)",
            task_arns.len(),
            self.settings.mode,
            self.settings.timeout.as_secs()
        );

        let started = Instant::now();
        let timeout = self.settings.timeout.as_secs();
        let mut board = StatusBoard::new();
        let mut last_elapsed = 0;

        let mut interval = time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let snapshot = self.describe(task_arns).await?;
            for task in snapshot.tasks() {
                let arn = task.task_arn().unwrap_or_default();
                let phase = TaskPhase::parse(task.last_status().unwrap_or_default());
                if board.observe(arn, phase.clone()) {
                    info!("Task: {}; status: {}", arn, phase);
                }
            }

            if self.is_complete(&board, task_arns) {
                match self.settings.mode {
                    WaitMode::UntilStopped => info!("All tasks stopped!"),
                    WaitMode::UntilStarted => info!("All tasks running!"),
                }
                return Ok(snapshot);
            }

            let elapsed = started.elapsed().as_secs();
            if elapsed == last_elapsed {
                continue;
            }
            last_elapsed = elapsed;

            if elapsed > timeout {
                warn!("TIMEOUT!");
                if self.settings.kill_on_timeout {
                    self.stop_all(task_arns, elapsed).await;
                }
                return Err(RunError::Timeout { elapsed });
            }

            if progress_due(elapsed) {
                info!("Still running...");
            }
        }
    }

    /// Every launched task has been seen and satisfies the wait mode
    fn is_complete(&self, board: &StatusBoard, task_arns: &[String]) -> bool {
        board.all_satisfy(self.settings.mode)
            && task_arns.iter().all(|arn| board.phase(arn).is_some())
    }

    async fn describe(&self, task_arns: &[String]) -> Result<DescribeTasksOutput, RunError> {
        debug!("Describing {} task(s)", task_arns.len());

        let request = DescribeTasksInput::builder()
            .cluster(&self.settings.cluster)
            .set_tasks(Some(task_arns.to_vec()));
        let snapshot = self.ecs.describe_tasks(request).await?;

        if !snapshot.failures().is_empty() {
            let failures: Vec<String> = snapshot
                .failures()
                .iter()
                .map(|f| {
                    format!(
                        "{}: {}",
                        f.arn().unwrap_or("unknown task"),
                        f.reason().unwrap_or("unknown reason")
                    )
                })
                .collect();
            for failure in &failures {
                error!("Describe failure: {}", failure);
            }
            return Err(RunError::DescribeFailures(failures));
        }

        Ok(snapshot)
    }

    /// Sends `StopTask` for every task; failures are logged and skipped
    async fn stop_all(&self, task_arns: &[String], elapsed: u64) {
        let reason = format!("Plugin timeout after {}s", elapsed);
        for arn in task_arns {
            info!("Stopping task: {}", arn);
            let request = StopTaskInput::builder()
                .cluster(&self.settings.cluster)
                .task(arn)
                .reason(&reason);
            if let Err(e) = self.ecs.stop_task(request).await {
                error!("Failed to stop task {}: {}", arn, e);
            }
        }
    }
}
