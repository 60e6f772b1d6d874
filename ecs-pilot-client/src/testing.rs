//! Scripted in-memory ECS for tests
//!
//! [`ScriptedEcs`] answers every call from a queue of canned responses and
//! records the requests it received. When a queue holds a single response,
//! that response is repeated, which lets polling loops run for as long as a
//! test needs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_ecs::operation::describe_services::DescribeServicesOutput;
use aws_sdk_ecs::operation::describe_services::builders::DescribeServicesInputBuilder;
use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionOutput;
use aws_sdk_ecs::operation::describe_task_definition::builders::DescribeTaskDefinitionInputBuilder;
use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
use aws_sdk_ecs::operation::describe_tasks::builders::DescribeTasksInputBuilder;
use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionOutput;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionInputBuilder;
use aws_sdk_ecs::operation::run_task::RunTaskOutput;
use aws_sdk_ecs::operation::run_task::builders::RunTaskInputBuilder;
use aws_sdk_ecs::operation::stop_task::StopTaskOutput;
use aws_sdk_ecs::operation::stop_task::builders::StopTaskInputBuilder;
use aws_sdk_ecs::operation::update_service::UpdateServiceOutput;
use aws_sdk_ecs::operation::update_service::builders::UpdateServiceInputBuilder;

use crate::{EcsApi, EcsError, Result};

/// A request received by [`ScriptedEcs`]
#[derive(Debug, Clone)]
pub enum Call {
    RegisterTaskDefinition(RegisterTaskDefinitionInputBuilder),
    RunTask(RunTaskInputBuilder),
    DescribeTasks(DescribeTasksInputBuilder),
    StopTask(StopTaskInputBuilder),
    DescribeServices(DescribeServicesInputBuilder),
    DescribeTaskDefinition(DescribeTaskDefinitionInputBuilder),
    UpdateService(UpdateServiceInputBuilder),
}

struct Script<T> {
    operation: &'static str,
    responses: Mutex<VecDeque<Result<T>>>,
}

impl<T: Clone> Script<T> {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, response: Result<T>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn next(&self) -> Result<T> {
        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(EcsError::unexpected(self.operation, "no scripted response")),
            1 => responses[0].clone(),
            _ => responses.pop_front().unwrap(),
        }
    }
}

/// In-memory [`EcsApi`] answering from scripted responses
pub struct ScriptedEcs {
    calls: Mutex<Vec<Call>>,
    register_task_definition: Script<RegisterTaskDefinitionOutput>,
    run_task: Script<RunTaskOutput>,
    describe_tasks: Script<DescribeTasksOutput>,
    stop_task: Script<StopTaskOutput>,
    describe_services: Script<DescribeServicesOutput>,
    describe_task_definition: Script<DescribeTaskDefinitionOutput>,
    update_service: Script<UpdateServiceOutput>,
}

impl Default for ScriptedEcs {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEcs {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            register_task_definition: Script::new("RegisterTaskDefinition"),
            run_task: Script::new("RunTask"),
            describe_tasks: Script::new("DescribeTasks"),
            stop_task: Script::new("StopTask"),
            describe_services: Script::new("DescribeServices"),
            describe_task_definition: Script::new("DescribeTaskDefinition"),
            update_service: Script::new("UpdateService"),
        }
    }

    pub fn on_register_task_definition(self, response: Result<RegisterTaskDefinitionOutput>) -> Self {
        self.register_task_definition.push(response);
        self
    }

    pub fn on_run_task(self, response: Result<RunTaskOutput>) -> Self {
        self.run_task.push(response);
        self
    }

    pub fn on_describe_tasks(self, response: Result<DescribeTasksOutput>) -> Self {
        self.describe_tasks.push(response);
        self
    }

    pub fn on_stop_task(self, response: Result<StopTaskOutput>) -> Self {
        self.stop_task.push(response);
        self
    }

    pub fn on_describe_services(self, response: Result<DescribeServicesOutput>) -> Self {
        self.describe_services.push(response);
        self
    }

    pub fn on_describe_task_definition(
        self,
        response: Result<DescribeTaskDefinitionOutput>,
    ) -> Self {
        self.describe_task_definition.push(response);
        self
    }

    pub fn on_update_service(self, response: Result<UpdateServiceOutput>) -> Self {
        self.update_service.push(response);
        self
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `DescribeTasks` polls received so far
    pub fn describe_tasks_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::DescribeTasks(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EcsApi for ScriptedEcs {
    async fn register_task_definition(
        &self,
        request: RegisterTaskDefinitionInputBuilder,
    ) -> Result<RegisterTaskDefinitionOutput> {
        self.record(Call::RegisterTaskDefinition(request));
        self.register_task_definition.next()
    }

    async fn run_task(&self, request: RunTaskInputBuilder) -> Result<RunTaskOutput> {
        self.record(Call::RunTask(request));
        self.run_task.next()
    }

    async fn describe_tasks(
        &self,
        request: DescribeTasksInputBuilder,
    ) -> Result<DescribeTasksOutput> {
        self.record(Call::DescribeTasks(request));
        self.describe_tasks.next()
    }

    async fn stop_task(&self, request: StopTaskInputBuilder) -> Result<StopTaskOutput> {
        self.record(Call::StopTask(request));
        self.stop_task.next()
    }

    async fn describe_services(
        &self,
        request: DescribeServicesInputBuilder,
    ) -> Result<DescribeServicesOutput> {
        self.record(Call::DescribeServices(request));
        self.describe_services.next()
    }

    async fn describe_task_definition(
        &self,
        request: DescribeTaskDefinitionInputBuilder,
    ) -> Result<DescribeTaskDefinitionOutput> {
        self.record(Call::DescribeTaskDefinition(request));
        self.describe_task_definition.next()
    }

    async fn update_service(
        &self,
        request: UpdateServiceInputBuilder,
    ) -> Result<UpdateServiceOutput> {
        self.record(Call::UpdateService(request));
        self.update_service.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::operation::describe_tasks::DescribeTasksInput;
    use aws_sdk_ecs::types::Task;

    fn snapshot(status: &str) -> DescribeTasksOutput {
        DescribeTasksOutput::builder()
            .tasks(Task::builder().task_arn("arn:task/1").last_status(status).build())
            .build()
    }

    #[tokio::test]
    async fn test_last_response_repeats() {
        let ecs = ScriptedEcs::new()
            .on_describe_tasks(Ok(snapshot("PENDING")))
            .on_describe_tasks(Ok(snapshot("RUNNING")));

        let request = DescribeTasksInput::builder().cluster("ci");
        let mut statuses = Vec::new();
        for _ in 0..3 {
            let output = ecs.describe_tasks(request.clone()).await.unwrap();
            statuses.push(output.tasks()[0].last_status().unwrap_or_default().to_string());
        }

        assert_eq!(statuses, vec!["PENDING", "RUNNING", "RUNNING"]);
        assert_eq!(ecs.describe_tasks_count(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_call_is_an_error() {
        let ecs = ScriptedEcs::new();
        let err = ecs
            .run_task(aws_sdk_ecs::operation::run_task::RunTaskInput::builder())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no scripted response"));
    }
}
