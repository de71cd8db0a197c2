//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use exphub_client::api::ApiError;
use exphub_client::service::{ExperimentService, JobService};
use exphub_core::experiment::{CreateExperiment, Experiment};
use exphub_core::form::CreateJobRequest;
use exphub_core::job::{Job, JobStatus};
use exphub_core::parameters::{ModelType, TrainingParameters};
use exphub_core::types::DbId;

/// Build an experiment with a fixed creation time.
pub fn experiment(id: DbId, name: &str) -> Experiment {
    Experiment {
        id,
        name: name.to_string(),
        description: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        updated_at: None,
    }
}

/// Build a pending MLP job created `minute` minutes past a fixed hour.
pub fn job(job_id: &str, experiment_id: DbId, minute: u32) -> Job {
    let parameters = TrainingParameters::defaults_for(ModelType::Mlp);
    Job {
        job_id: job_id.to_string(),
        experiment_id,
        name: format!("Job {job_id}"),
        model_type: ModelType::Mlp,
        parameters,
        status: JobStatus::Pending,
        epochs_completed: 0,
        best_accuracy: None,
        total_time: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
        started_at: None,
        completed_at: None,
    }
}

#[derive(Default)]
struct FakeState {
    experiments: Vec<Experiment>,
    jobs: Vec<Job>,
    fail_with: Option<u16>,
    created_jobs: Vec<CreateJobRequest>,
    cancelled: Vec<String>,
    deleted: Vec<String>,
    next_job: u32,
}

/// In-memory stand-in for the REST API.
///
/// Clones share state, so one instance can serve as both the experiment
/// and the job service while the test inspects what was called.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn with_data(experiments: Vec<Experiment>, jobs: Vec<Job>) -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.experiments = experiments;
            state.jobs = jobs;
        }
        api
    }

    /// Make every subsequent call fail with `status`.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().fail_with = None;
    }

    pub fn created_jobs(&self) -> Vec<CreateJobRequest> {
        self.state.lock().unwrap().created_jobs.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    fn check(&self) -> Result<(), ApiError> {
        match self.state.lock().unwrap().fail_with {
            Some(status) => Err(ApiError::Status {
                status,
                body: "simulated failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExperimentService for FakeApi {
    async fn list_experiments(&self) -> Result<Vec<Experiment>, ApiError> {
        self.check()?;
        Ok(self.state.lock().unwrap().experiments.clone())
    }

    async fn create_experiment(&self, request: &CreateExperiment) -> Result<Experiment, ApiError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let id = state.experiments.len() as DbId + 1;
        let mut created = experiment(id, &request.name);
        created.description = request.description.clone();
        state.experiments.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl JobService for FakeApi {
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.check()?;
        Ok(self.state.lock().unwrap().jobs.clone())
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.next_job += 1;
        let mut created = job(
            &format!("job-{}", state.next_job),
            request.experiment_id,
            state.next_job,
        );
        created.name = request.name.clone();
        created.model_type = request.model_type;
        created.parameters = request.parameters.clone();
        state.created_jobs.push(request.clone());
        state.jobs.push(created.clone());
        Ok(created)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.check()?;
        self.state.lock().unwrap().cancelled.push(job_id.to_string());
        Ok(())
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.jobs.retain(|j| j.job_id != job_id);
        state.deleted.push(job_id.to_string());
        Ok(())
    }
}
