//! Request/response seams to the ExperimentHub REST API.
//!
//! The dashboard talks to these traits rather than to HTTP directly;
//! [`HttpApi`](crate::api::HttpApi) is the production implementation.

use async_trait::async_trait;

use exphub_core::experiment::{CreateExperiment, Experiment};
use exphub_core::form::CreateJobRequest;
use exphub_core::job::Job;

use crate::api::ApiError;

#[async_trait]
pub trait ExperimentService: Send + Sync {
    async fn list_experiments(&self) -> Result<Vec<Experiment>, ApiError>;

    async fn create_experiment(&self, request: &CreateExperiment) -> Result<Experiment, ApiError>;
}

#[async_trait]
pub trait JobService: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError>;

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError>;

    /// Ask the backend to stop a job. Local state is not touched.
    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError>;

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError>;
}
