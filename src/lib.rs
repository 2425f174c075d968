#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Video Factory Core
//!
//! Job orchestration core for topic-to-video generation.
//!
//! ## Overview
//!
//! A caller submits a topic together with a recipe (or `auto`), a duration and a
//! resolution. The [`orchestration::PipelineScheduler`] records the job, picks a
//! recipe (through a [`collaborators::Director`] when asked to), resolves the
//! recipe into a stage graph and drives every stage through the
//! [`orchestration::StageExecutor`], which owns timeouts, retries and backoff.
//! Job state lives in the [`store::JobStore`] and is only ever changed through
//! state machine events, so a completed job always carries an artifact and a
//! failed job always carries an error record.
//!
//! The concrete engines (text-to-speech, alignment, stock assets, compositing)
//! are not part of this crate. They plug in through the traits in
//! [`collaborators`].
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (defaults, file, environment)
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//! - [`models`] - Jobs, requests, artifacts, resolutions
//! - [`recipes`] - Recipe definitions, keyword generation, voice profiles
//! - [`registry`] - Recipe registry
//! - [`state_machine`] - Job lifecycle states and transitions
//! - [`store`] - Concurrency-safe in-memory job store
//! - [`events`] - Job lifecycle event publishing
//! - [`collaborators`] - External stage collaborator contracts
//! - [`orchestration`] - Stage graph, stage executor and pipeline scheduler
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use video_factory::config::FactoryConfig;
//! use video_factory::collaborators::Collaborators;
//! use video_factory::models::GenerationRequest;
//! use video_factory::orchestration::PipelineScheduler;
//! use video_factory::registry::RecipeRegistry;
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let config = FactoryConfig::load()?;
//! video_factory::logging::init_structured_logging(&config.logging);
//!
//! let registry = Arc::new(RecipeRegistry::from_config(&config)?);
//! let scheduler = PipelineScheduler::new(&config, registry, collaborators)?;
//!
//! let request = GenerationRequest::parse("serene forest", "auto", Some(60.0), "1080p")?;
//! let job_id = scheduler.submit(request)?;
//! println!("status: {}", scheduler.get_status(job_id)?.status);
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod recipes;
pub mod registry;
pub mod state_machine;
pub mod store;

pub use config::FactoryConfig;
pub use error::{FactoryError, FactoryResult, StageError};
pub use models::{ArtifactRef, GenerationRequest, Job, JobId, JobView, Resolution};
pub use orchestration::PipelineScheduler;
pub use recipes::{Recipe, RecipeKind, RecipeSelection};
pub use registry::RecipeRegistry;
pub use state_machine::JobStatus;
pub use store::JobStore;
