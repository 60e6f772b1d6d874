//! Service layer
//!
//! Registers or selects the task definition and starts the tasks. Every
//! call goes through [`EcsApi`](ecs_pilot_client::EcsApi) so the flow can be
//! driven by a scripted client in tests.

mod definition;
mod launch;

pub use definition::{TaskDefinitionSource, resolve_task_definition};
pub use launch::{LaunchSettings, start_tasks};
