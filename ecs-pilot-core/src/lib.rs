//! ecs-pilot Core
//!
//! Core types and rules shared by the ecs-pilot plugins.
//!
//! This crate contains:
//! - Definition: flat plugin settings turned into ECS task definition requests
//! - Domain types: task phases, run outcomes and image references
//! - Errors: configuration and outcome failures

pub mod definition;
pub mod domain;
pub mod error;

pub use error::{ConfigError, OutcomeError};
