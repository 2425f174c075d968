//! # Lifecycle Events
//!
//! Broadcast of job lifecycle events (submitted, recipe selected, stage
//! started/retrying/completed, completed, failed, cancelled) to any number of
//! subscribers.

pub mod publisher;

pub use publisher::{EventPublisher, JobLifecycleEvent, LifecycleEventKind};
