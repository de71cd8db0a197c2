//! Domain model for the ExperimentHub dashboard.
//!
//! Typed experiments, jobs and hyperparameters, the job-creation form
//! model, and the [`store::Store`] that merges live status updates and
//! derives per-job progress. No I/O happens in this crate.

pub mod error;
pub mod experiment;
pub mod form;
pub mod job;
pub mod parameters;
pub mod progress;
pub mod store;
pub mod types;
pub mod validation;
