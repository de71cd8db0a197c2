//! Training jobs and the partial status patches pushed while they run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parameters::{ModelType, TrainingParameters};
use crate::types::{timestamp, DbId, JobId, Timestamp};

/// Lifecycle state of a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Badge text for status displays.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    /// Only jobs that have not finished can be cancelled.
    pub fn is_cancellable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A training job as returned by the Job API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredJob")]
pub struct Job {
    pub job_id: JobId,
    pub experiment_id: DbId,
    pub name: String,
    pub model_type: ModelType,
    pub parameters: TrainingParameters,
    pub status: JobStatus,
    pub epochs_completed: u32,
    pub best_accuracy: Option<f64>,
    /// Total training time in seconds.
    pub total_time: Option<f64>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::option")]
    pub started_at: Option<Timestamp>,
    #[serde(with = "timestamp::option")]
    pub completed_at: Option<Timestamp>,
}

/// Wire shape of a job row before its parameters are rebuilt against the
/// job's own `model_type`.
#[derive(Deserialize)]
struct StoredJob {
    job_id: JobId,
    experiment_id: DbId,
    name: String,
    model_type: ModelType,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
    status: JobStatus,
    #[serde(default)]
    epochs_completed: u32,
    #[serde(default)]
    best_accuracy: Option<f64>,
    #[serde(default)]
    total_time: Option<f64>,
    #[serde(with = "timestamp")]
    created_at: Timestamp,
    #[serde(default, with = "timestamp::option")]
    started_at: Option<Timestamp>,
    #[serde(default, with = "timestamp::option")]
    completed_at: Option<Timestamp>,
}

impl TryFrom<StoredJob> for Job {
    type Error = String;

    fn try_from(stored: StoredJob) -> Result<Self, Self::Error> {
        let parameters = TrainingParameters::from_stored(stored.model_type, stored.parameters)
            .map_err(|e| format!("job {}: invalid parameters: {e}", stored.job_id))?;
        Ok(Self {
            job_id: stored.job_id,
            experiment_id: stored.experiment_id,
            name: stored.name,
            model_type: stored.model_type,
            parameters,
            status: stored.status,
            epochs_completed: stored.epochs_completed,
            best_accuracy: stored.best_accuracy,
            total_time: stored.total_time,
            created_at: stored.created_at,
            started_at: stored.started_at,
            completed_at: stored.completed_at,
        })
    }
}

/// A partial status patch for one job.
///
/// Every field except `job_id` is optional; an absent field means
/// "unchanged". Keys this type does not model are kept in `extra` and
/// merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatusUpdate {
    #[serde(default)]
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_accuracy: Option<f64>,
    /// Seconds the job has been running so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobStatusUpdate {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_epochs_total(mut self, epochs_total: u32) -> Self {
        self.epochs_total = Some(epochs_total);
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether this update addresses a job at all.
    pub fn has_job_id(&self) -> bool {
        !self.job_id.is_empty()
    }

    /// Overlay the fields carried by `patch` onto `self`.
    ///
    /// Fields absent from `patch` keep their current value.
    pub fn merge(&mut self, patch: JobStatusUpdate) {
        overlay(&mut self.status, patch.status);
        overlay(&mut self.epoch, patch.epoch);
        overlay(&mut self.epochs_total, patch.epochs_total);
        overlay(&mut self.train_loss, patch.train_loss);
        overlay(&mut self.train_accuracy, patch.train_accuracy);
        overlay(&mut self.val_loss, patch.val_loss);
        overlay(&mut self.val_accuracy, patch.val_accuracy);
        overlay(&mut self.best_accuracy, patch.best_accuracy);
        overlay(&mut self.elapsed_time, patch.elapsed_time);
        for (key, value) in patch.extra {
            self.extra.insert(key, value);
        }
    }
}

fn overlay<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_json() -> &'static str {
        r#"{
            "id": 12,
            "job_id": "job-abc",
            "experiment_id": 3,
            "name": "Job 1",
            "status": "running",
            "model_type": "cnn",
            "parameters": {"model_type":"cnn","optimizer":"adam","learning_rate":0.001,
                           "batch_size":64,"epochs":10,"hidden_size":64,"dropout_rate":0.25,
                           "kernel_size":3,"use_scheduler":false},
            "best_accuracy": null,
            "total_time": null,
            "epochs_completed": 3,
            "history": null,
            "created_at": "2024-06-01T09:15:00.000123",
            "started_at": "2024-06-01T09:15:02",
            "completed_at": null
        }"#
    }

    #[test]
    fn deserializes_api_job() {
        let job: Job = serde_json::from_str(job_json()).unwrap();
        assert_eq!(job.job_id, "job-abc");
        assert_eq!(job.model_type, ModelType::Cnn);
        assert_eq!(job.parameters.architecture.kernel_size(), Some(3));
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.epochs_completed, 3);
        assert!(job.best_accuracy.is_none());
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn job_list_loads_rows_with_incomplete_parameters() {
        let json = r#"[
            {"job_id":"good","experiment_id":1,"name":"a","status":"completed","model_type":"cnn",
             "parameters":{"model_type":"cnn","optimizer":"adam","learning_rate":0.001,
                           "batch_size":64,"epochs":10,"kernel_size":5},
             "created_at":"2024-06-01T09:00:00Z"},
            {"job_id":"legacy","experiment_id":1,"name":"b","status":"failed","model_type":"cnn",
             "parameters":{"epochs":30},
             "created_at":"2024-06-01T10:00:00Z"}
        ]"#;

        let jobs: Vec<Job> = serde_json::from_str(json).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].parameters.architecture.kernel_size(), Some(5));
        assert_eq!(jobs[1].parameters.common.epochs, 30);
        assert_eq!(jobs[1].parameters.model_type(), ModelType::Cnn);
        assert_eq!(jobs[1].parameters.architecture.kernel_size(), Some(3));
    }

    #[test]
    fn job_with_malformed_parameters_names_the_row() {
        let json = r#"{"job_id":"bad","experiment_id":1,"name":"x","status":"pending",
            "model_type":"mlp","parameters":{"num_layers":"many"},
            "created_at":"2024-06-01T09:00:00Z"}"#;

        let err = serde_json::from_str::<Job>(json).unwrap_err();
        assert!(err.to_string().contains("job bad"));
    }

    #[test]
    fn merge_epoch_only_keeps_other_fields() {
        let mut current = JobStatusUpdate::new("j1")
            .with_epoch(2)
            .with_epochs_total(20)
            .with_status(JobStatus::Running);
        current.val_accuracy = Some(81.5);

        current.merge(JobStatusUpdate::new("j1").with_epoch(3));

        assert_eq!(current.epoch, Some(3));
        assert_eq!(current.epochs_total, Some(20));
        assert_eq!(current.status, Some(JobStatus::Running));
        assert_eq!(current.val_accuracy, Some(81.5));
    }

    #[test]
    fn merge_extra_keys_individually() {
        let mut current: JobStatusUpdate =
            serde_json::from_str(r#"{"job_id":"j1","lr":0.01,"phase":"train"}"#).unwrap();
        let patch: JobStatusUpdate =
            serde_json::from_str(r#"{"job_id":"j1","phase":"eval"}"#).unwrap();

        current.merge(patch);

        assert_eq!(current.extra["lr"], 0.01);
        assert_eq!(current.extra["phase"], "eval");
    }

    #[test]
    fn explicit_null_is_treated_as_absent() {
        let mut current = JobStatusUpdate::new("j1").with_epochs_total(10);
        let patch: JobStatusUpdate =
            serde_json::from_str(r#"{"job_id":"j1","epochs_total":null,"epoch":1}"#).unwrap();

        current.merge(patch);

        assert_eq!(current.epochs_total, Some(10));
        assert_eq!(current.epoch, Some(1));
    }

    #[test]
    fn missing_job_id_deserializes_as_empty() {
        let update: JobStatusUpdate = serde_json::from_str(r#"{"epoch":1}"#).unwrap();
        assert!(!update.has_job_id());
    }

    #[test]
    fn cancellable_states() {
        assert!(JobStatus::Pending.is_cancellable());
        assert!(JobStatus::Running.is_cancellable());
        assert!(!JobStatus::Completed.is_cancellable());
        assert!(!JobStatus::Failed.is_cancellable());
    }
}
