//! Derived per-job display values.
//!
//! Nothing here is stored. Each value is computed from the job's
//! last-confirmed snapshot overlaid with the latest merged status
//! update, field by field.

use crate::job::{Job, JobStatus, JobStatusUpdate};

/// Epoch progress of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub current_epoch: u32,
    pub total_epochs: u32,
}

impl JobProgress {
    /// Overlay `status` on the job's own snapshot.
    pub fn derive(job: &Job, status: Option<&JobStatusUpdate>) -> Self {
        Self {
            current_epoch: status
                .and_then(|s| s.epoch)
                .unwrap_or(job.epochs_completed),
            total_epochs: status
                .and_then(|s| s.epochs_total)
                .unwrap_or(job.parameters.common.epochs),
        }
    }

    /// Completed fraction in `[0, 1]`.
    ///
    /// A zero total yields 0 and a current epoch past the total yields 1.
    pub fn fraction(&self) -> f64 {
        if self.total_epochs == 0 {
            return 0.0;
        }
        (f64::from(self.current_epoch) / f64::from(self.total_epochs)).clamp(0.0, 1.0)
    }

    /// Completion percentage in `[0, 100]`.
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }

    /// Text such as `Epoch 3/10`.
    pub fn label(&self) -> String {
        format!("Epoch {}/{}", self.current_epoch, self.total_epochs)
    }
}

/// Everything a job row displays.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: String,
    pub name: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub best_accuracy: Option<f64>,
    /// Running (or total) training time in seconds.
    pub running_time: Option<f64>,
}

impl JobSummary {
    pub fn derive(job: &Job, status: Option<&JobStatusUpdate>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            name: job.name.clone(),
            status: status.and_then(|s| s.status).unwrap_or(job.status),
            progress: JobProgress::derive(job, status),
            best_accuracy: status
                .and_then(|s| s.best_accuracy)
                .or(job.best_accuracy),
            running_time: status.and_then(|s| s.elapsed_time).or(job.total_time),
        }
    }

    pub fn can_cancel(&self) -> bool {
        self.status.is_cancellable()
    }

    /// Accuracy as `93.20%`, or an em-dash placeholder when unknown.
    pub fn accuracy_label(&self) -> String {
        match self.best_accuracy {
            Some(acc) => format!("{acc:.2}%"),
            None => "\u{2014}".to_string(),
        }
    }

    pub fn running_time_label(&self) -> String {
        match self.running_time {
            Some(secs) => format_duration(secs),
            None => "\u{2014}".to_string(),
        }
    }
}

/// Format seconds as `1h 2m 3s`, `2m 5s` or `42s`.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0s".to_string();
    }
    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{ModelType, TrainingParameters};

    fn job(epochs_completed: u32, epochs: u32) -> Job {
        let mut parameters = TrainingParameters::defaults_for(ModelType::Mlp);
        parameters.common.epochs = epochs;
        Job {
            job_id: "j1".into(),
            experiment_id: 1,
            name: "Job".into(),
            model_type: ModelType::Mlp,
            parameters,
            status: JobStatus::Running,
            epochs_completed,
            best_accuracy: None,
            total_time: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn no_status_falls_back_to_snapshot() {
        let p = JobProgress::derive(&job(3, 10), None);
        assert_eq!(p, JobProgress { current_epoch: 3, total_epochs: 10 });
        assert_eq!(p.label(), "Epoch 3/10");
    }

    #[test]
    fn absent_subfield_falls_back_individually() {
        let j = job(3, 10);
        let status = JobStatusUpdate::new("j1").with_epochs_total(20);
        let p = JobProgress::derive(&j, Some(&status));
        assert_eq!(p.current_epoch, 3);
        assert_eq!(p.total_epochs, 20);
    }

    #[test]
    fn epoch_zero_from_server_is_kept() {
        let status = JobStatusUpdate::new("j1").with_epoch(0);
        let p = JobProgress::derive(&job(3, 10), Some(&status));
        assert_eq!(p.current_epoch, 0);
    }

    #[test]
    fn zero_total_is_zero_fraction() {
        let p = JobProgress { current_epoch: 4, total_epochs: 0 };
        assert_eq!(p.fraction(), 0.0);
        assert_eq!(p.percent(), 0.0);
    }

    #[test]
    fn fraction_is_clamped() {
        let p = JobProgress { current_epoch: 12, total_epochs: 10 };
        assert_eq!(p.fraction(), 1.0);
        let half = JobProgress { current_epoch: 5, total_epochs: 10 };
        assert_eq!(half.percent(), 50.0);
    }

    #[test]
    fn summary_prefers_pushed_values() {
        let mut j = job(3, 10);
        j.best_accuracy = Some(70.0);
        j.total_time = Some(12.0);

        let plain = JobSummary::derive(&j, None);
        assert_eq!(plain.status, JobStatus::Running);
        assert_eq!(plain.accuracy_label(), "70.00%");
        assert!(plain.can_cancel());

        let mut status = JobStatusUpdate::new("j1").with_status(JobStatus::Completed);
        status.best_accuracy = Some(91.256);
        status.elapsed_time = Some(3725.0);
        let live = JobSummary::derive(&j, Some(&status));
        assert_eq!(live.status, JobStatus::Completed);
        assert_eq!(live.accuracy_label(), "91.26%");
        assert_eq!(live.running_time_label(), "1h 2m 5s");
        assert!(!live.can_cancel());
    }

    #[test]
    fn unknown_values_render_placeholder() {
        let s = JobSummary::derive(&job(0, 10), None);
        assert_eq!(s.accuracy_label(), "\u{2014}");
        assert_eq!(s.running_time_label(), "\u{2014}");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(42.4), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(-1.0), "0s");
    }
}
