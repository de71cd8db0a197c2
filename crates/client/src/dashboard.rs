//! Dashboard controller.
//!
//! Owns the [`Store`] and drives it from the REST services: initial and
//! full-reload pulls, experiment creation, job submission from a
//! [`JobForm`], cancellation and deletion. Every outcome the user should
//! see is published on the [`NoticeBus`]. A failed operation leaves the
//! store and the form exactly as they were.

use exphub_core::experiment::{CreateExperiment, Experiment};
use exphub_core::form::JobForm;
use exphub_core::job::Job;
use exphub_core::store::Store;
use exphub_core::validation::FieldError;

use crate::api::ApiError;
use crate::notices::{Notice, NoticeBus};
use crate::service::{ExperimentService, JobService};
use crate::sync::StatusFeed;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Rejected before any network call.
    #[error("Invalid input: {0}")]
    Invalid(#[from] FieldError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct Dashboard<E, J> {
    experiments: E,
    jobs: J,
    store: Store,
    notices: NoticeBus,
}

impl<E, J> Dashboard<E, J>
where
    E: ExperimentService,
    J: JobService,
{
    pub fn new(experiments: E, jobs: J) -> Self {
        Self {
            experiments,
            jobs,
            store: Store::new(),
            notices: NoticeBus::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    /// Pull both lists and replace the local copies. Live status entries
    /// are kept.
    pub async fn refresh(&mut self) -> Result<(), DashboardError> {
        let (experiments, jobs) = self.fetch_all().await?;
        tracing::info!(
            experiments = experiments.len(),
            jobs = jobs.len(),
            "Dashboard refreshed",
        );
        self.store.set_experiments(experiments);
        self.store.set_jobs(jobs);
        Ok(())
    }

    /// Pull both lists and rebuild the store from scratch, dropping all
    /// live status. The store is untouched if either pull fails.
    pub async fn reload(&mut self) -> Result<(), DashboardError> {
        let (experiments, jobs) = self.fetch_all().await?;
        self.store.clear();
        self.store.set_experiments(experiments);
        self.store.set_jobs(jobs);
        tracing::info!("Dashboard reloaded");
        Ok(())
    }

    pub async fn create_experiment(
        &mut self,
        request: CreateExperiment,
    ) -> Result<Experiment, DashboardError> {
        request.validate()?;

        match self.experiments.create_experiment(&request).await {
            Ok(experiment) => {
                tracing::info!(experiment_id = experiment.id, name = %experiment.name, "Experiment created");
                self.store.add_experiment(experiment.clone());
                self.notices
                    .publish(Notice::success("Experiment created successfully"));
                Ok(experiment)
            }
            Err(e) => Err(self.report("Failed to create experiment", e)),
        }
    }

    /// Submit the form's draft as a new job.
    ///
    /// Validation failures return before any network call and leave the
    /// form open. API failures publish an error notice and also leave the
    /// form intact. On success the job is appended to the store and the
    /// form is closed and reset.
    pub async fn submit_job(&mut self, form: &mut JobForm) -> Result<Job, DashboardError> {
        let request = form.prepare_submission()?;

        match self.jobs.create_job(&request).await {
            Ok(job) => {
                tracing::info!(
                    job_id = %job.job_id,
                    experiment_id = job.experiment_id,
                    model_type = %job.model_type,
                    "Job created",
                );
                self.store.add_job(job.clone());
                self.notices.publish(Notice::success("Job created successfully"));
                form.finish_submission();
                Ok(job)
            }
            Err(e) => Err(self.report("Failed to create job", e)),
        }
    }

    /// Request cancellation. The job's displayed status changes only when
    /// the backend pushes a status update.
    pub async fn cancel_job(&mut self, job_id: &str) -> Result<(), DashboardError> {
        match self.jobs.cancel_job(job_id).await {
            Ok(()) => {
                tracing::info!(job_id, "Job cancellation requested");
                self.notices
                    .publish(Notice::success("Job cancelled successfully"));
                Ok(())
            }
            Err(e) => Err(self.report("Failed to cancel job", e)),
        }
    }

    /// Delete a job on the backend, then drop it and its live status
    /// locally.
    pub async fn delete_job(&mut self, job_id: &str) -> Result<(), DashboardError> {
        if let Err(e) = self.jobs.delete_job(job_id).await {
            return Err(self.report("Failed to delete job", e));
        }

        if let Err(e) = self.store.remove_job(job_id) {
            tracing::debug!(job_id, error = %e, "Deleted job was not in the local list");
        }
        tracing::info!(job_id, "Job deleted");
        self.notices.publish(Notice::success("Job deleted successfully"));
        Ok(())
    }

    /// Apply every queued push update to the store.
    pub fn apply_pending(&mut self, feed: &mut StatusFeed) -> usize {
        feed.drain_into(&mut self.store)
    }

    // ---- private helpers ----

    async fn fetch_all(&mut self) -> Result<(Vec<Experiment>, Vec<Job>), DashboardError> {
        let experiments = match self.experiments.list_experiments().await {
            Ok(list) => list,
            Err(e) => return Err(self.report("Failed to load experiments", e)),
        };
        let jobs = match self.jobs.list_jobs().await {
            Ok(list) => list,
            Err(e) => return Err(self.report("Failed to load jobs", e)),
        };
        Ok((experiments, jobs))
    }

    fn report(&self, title: &str, error: ApiError) -> DashboardError {
        tracing::error!(error = %error, "{title}");
        self.notices
            .publish(Notice::error(title).with_description(error.to_string()));
        DashboardError::Api(error)
    }
}
