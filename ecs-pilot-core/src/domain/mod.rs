//! Core domain types
//!
//! These types interpret what ECS reports back (task statuses, container exit
//! codes) and the image references the deploy plugin rewrites.

pub mod image;
pub mod outcome;
pub mod status;
