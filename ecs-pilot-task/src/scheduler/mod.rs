//! Scheduler layer for the runner
//!
//! Follows the started tasks until they reach the phase the run waits for,
//! or until the timeout expires.

pub mod watcher;

pub use watcher::{TaskWatcher, WatchSettings};
