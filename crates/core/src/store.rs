//! Client-side state container for experiments, jobs and live status.
//!
//! [`Store`] has a single owner. Pull responses replace the lists,
//! push events are merged into `job_status` one at a time, and all
//! display values are derived on read.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::experiment::Experiment;
use crate::job::{Job, JobStatusUpdate};
use crate::progress::{JobProgress, JobSummary};
use crate::types::{DbId, JobId};

#[derive(Debug, Default)]
pub struct Store {
    experiments: Vec<Experiment>,
    jobs: Vec<Job>,
    job_status: HashMap<JobId, JobStatusUpdate>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- experiments ----

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    pub fn set_experiments(&mut self, experiments: Vec<Experiment>) {
        self.experiments = experiments;
    }

    pub fn add_experiment(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    pub fn experiment(&self, id: DbId) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.id == id)
    }

    // ---- jobs ----

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Replace the job list with a fresh pull. Status entries are kept.
    pub fn set_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
    }

    /// Append a newly created job.
    pub fn add_job(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    /// Remove a job and its live status. Nothing changes if the job is
    /// not in the list.
    pub fn remove_job(&mut self, job_id: &str) -> Result<Job, CoreError> {
        let index = self
            .jobs
            .iter()
            .position(|j| j.job_id == job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
        self.job_status.remove(job_id);
        Ok(self.jobs.remove(index))
    }

    /// Jobs of one experiment, newest first.
    pub fn jobs_for_experiment(&self, experiment_id: DbId) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|j| j.experiment_id == experiment_id)
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    // ---- live status ----

    /// Merge a pushed status update.
    ///
    /// Updates without a `job_id` are ignored and `false` is returned.
    /// Updates for jobs not (or no longer) in the list are still kept,
    /// since a pull may not have delivered the job yet.
    pub fn apply_status(&mut self, update: JobStatusUpdate) -> bool {
        if !update.has_job_id() {
            tracing::debug!("Ignoring status update without job_id");
            return false;
        }
        match self.job_status.get_mut(&update.job_id) {
            Some(current) => current.merge(update),
            None => {
                self.job_status.insert(update.job_id.clone(), update);
            }
        }
        true
    }

    pub fn status(&self, job_id: &str) -> Option<&JobStatusUpdate> {
        self.job_status.get(job_id)
    }

    pub fn progress(&self, job_id: &str) -> Option<JobProgress> {
        self.job(job_id)
            .map(|job| JobProgress::derive(job, self.status(job_id)))
    }

    pub fn summary(&self, job_id: &str) -> Option<JobSummary> {
        self.job(job_id)
            .map(|job| JobSummary::derive(job, self.status(job_id)))
    }

    /// Display rows for one experiment, newest first.
    pub fn summaries_for_experiment(&self, experiment_id: DbId) -> Vec<JobSummary> {
        self.jobs_for_experiment(experiment_id)
            .into_iter()
            .map(|job| JobSummary::derive(job, self.status(&job.job_id)))
            .collect()
    }

    /// Drop everything, as on a full reload.
    pub fn clear(&mut self) {
        self.experiments.clear();
        self.jobs.clear();
        self.job_status.clear();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::job::JobStatus;
    use crate::parameters::{ModelType, TrainingParameters};

    fn job(id: &str, experiment_id: DbId, age_minutes: i64) -> Job {
        Job {
            job_id: id.into(),
            experiment_id,
            name: format!("Job {id}"),
            model_type: ModelType::Mlp,
            parameters: TrainingParameters::defaults_for(ModelType::Mlp),
            status: JobStatus::Pending,
            epochs_completed: 3,
            best_accuracy: None,
            total_time: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn progress_sequence_from_partial_updates() {
        let mut store = Store::new();
        store.set_jobs(vec![job("j1", 1, 0)]);

        assert_eq!(store.progress("j1").unwrap().label(), "Epoch 3/10");

        store.apply_status(JobStatusUpdate::new("j1").with_epoch(4));
        assert_eq!(store.progress("j1").unwrap().label(), "Epoch 4/10");

        store.apply_status(JobStatusUpdate::new("j1").with_epochs_total(20));
        assert_eq!(store.progress("j1").unwrap().label(), "Epoch 4/20");
    }

    #[test]
    fn update_without_job_id_is_ignored() {
        let mut store = Store::new();
        assert!(!store.apply_status(JobStatusUpdate::default().with_epoch(1)));
        assert!(store.status("").is_none());
    }

    #[test]
    fn merge_keeps_fields_not_in_patch() {
        let mut store = Store::new();
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(1).with_epochs_total(5));
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(2));

        let status = store.status("j1").unwrap();
        assert_eq!(status.epoch, Some(2));
        assert_eq!(status.epochs_total, Some(5));
    }

    #[test]
    fn delete_wins_over_late_status_event() {
        let mut store = Store::new();
        store.set_jobs(vec![job("j1", 1, 0), job("j2", 1, 1)]);
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(5));

        let removed = store.remove_job("j1").unwrap();
        assert_eq!(removed.job_id, "j1");
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(6));

        assert!(store.job("j1").is_none());
        assert!(store.progress("j1").is_none());
        assert_eq!(store.jobs_for_experiment(1).len(), 1);
    }

    #[test]
    fn removing_unknown_job_errors() {
        let mut store = Store::new();
        assert_matches!(store.remove_job("nope"), Err(CoreError::JobNotFound(id)) if id == "nope");
    }

    #[test]
    fn failed_remove_leaves_status_untouched() {
        let mut store = Store::new();
        store.apply_status(JobStatusUpdate::new("x").with_epoch(2));

        assert_matches!(store.remove_job("x"), Err(CoreError::JobNotFound(_)));
        assert_eq!(store.status("x").and_then(|s| s.epoch), Some(2));
    }

    #[test]
    fn experiment_jobs_sorted_newest_first() {
        let mut store = Store::new();
        store.set_jobs(vec![job("old", 1, 30), job("other", 2, 0), job("new", 1, 1)]);

        let ids: Vec<_> = store
            .jobs_for_experiment(1)
            .iter()
            .map(|j| j.job_id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);

        let rows = store.summaries_for_experiment(1);
        assert_eq!(rows[0].job_id, "new");
    }

    #[test]
    fn status_arriving_before_pull_applies_once_listed() {
        let mut store = Store::new();
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(7));
        assert!(store.progress("j1").is_none());

        store.set_jobs(vec![job("j1", 1, 0)]);
        assert_eq!(store.progress("j1").unwrap().current_epoch, 7);
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = Store::new();
        store.add_job(job("j1", 1, 0));
        store.apply_status(JobStatusUpdate::new("j1").with_epoch(1));
        store.clear();
        assert!(store.jobs().is_empty());
        assert!(store.status("j1").is_none());
    }
}
