//! Job-creation form model.
//!
//! [`JobDraft`] holds the user's in-progress input. Selecting a model
//! type swaps in that type's defaults for the type-dependent fields and
//! leaves the shared training fields alone, so edits to optimizer,
//! learning rate, batch size, epochs and scheduler survive a switch.
//!
//! [`JobForm`] wraps a draft with the open/closed state of the creation
//! dialog. Submitting produces a [`CreateJobRequest`] only when every
//! field validates.

use serde::Serialize;

use crate::error::CoreError;
use crate::parameters::{Architecture, CommonParameters, ModelType, TrainingParameters};
use crate::types::DbId;
use crate::validation::{self, FieldError};

/// Model type preselected on a fresh form.
pub const DEFAULT_MODEL_TYPE: ModelType = ModelType::Mlp;

/// Payload of the Job API `create` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateJobRequest {
    pub name: String,
    pub model_type: ModelType,
    pub experiment_id: DbId,
    pub parameters: TrainingParameters,
}

impl CreateJobRequest {
    /// Build a request whose top-level `model_type` is taken from the
    /// parameter set, so the two can never disagree.
    pub fn new(name: String, experiment_id: DbId, parameters: TrainingParameters) -> Self {
        Self {
            name,
            model_type: parameters.model_type(),
            experiment_id,
            parameters,
        }
    }
}

/* --------------------------------------------------------------------------
   JobDraft
   -------------------------------------------------------------------------- */

/// Editable job-creation input.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub name: String,
    pub experiment_id: DbId,
    parameters: TrainingParameters,
}

impl JobDraft {
    /// A draft seeded with the default model type and a timestamped name.
    pub fn new(experiment_id: DbId) -> Self {
        Self {
            name: default_job_name(),
            experiment_id,
            parameters: TrainingParameters::defaults_for(DEFAULT_MODEL_TYPE),
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.parameters.model_type()
    }

    pub fn parameters(&self) -> &TrainingParameters {
        &self.parameters
    }

    pub fn common(&self) -> &CommonParameters {
        &self.parameters.common
    }

    pub fn common_mut(&mut self) -> &mut CommonParameters {
        &mut self.parameters.common
    }

    /// Switch to `model_type`.
    ///
    /// Drops the current variant field, applies the new type's
    /// `hidden_size`, `dropout_rate` and variant defaults, and keeps
    /// every other shared field. Re-selecting the current type is a no-op.
    pub fn select_model_type(&mut self, model_type: ModelType) {
        if model_type == self.model_type() {
            return;
        }
        let defaults = model_type.defaults();
        self.parameters.architecture = defaults.architecture;
        self.parameters.common.hidden_size = Some(defaults.hidden_size);
        self.parameters.common.dropout_rate = Some(defaults.dropout_rate);
        tracing::debug!(model_type = %model_type, "Job form model type changed");
    }

    /// Set the layer count. Only MLP and RNN drafts have one.
    pub fn set_num_layers(&mut self, num_layers: u32) -> Result<(), CoreError> {
        match &mut self.parameters.architecture {
            Architecture::Mlp { num_layers: n } | Architecture::Rnn { num_layers: n } => {
                *n = num_layers;
                Ok(())
            }
            Architecture::Cnn { .. } => Err(CoreError::Conflict(
                "num_layers does not apply to cnn models".to_string(),
            )),
        }
    }

    /// Set the convolution kernel size. Only CNN drafts have one.
    pub fn set_kernel_size(&mut self, kernel_size: u32) -> Result<(), CoreError> {
        match &mut self.parameters.architecture {
            Architecture::Cnn { kernel_size: k } => {
                *k = kernel_size;
                Ok(())
            }
            other => Err(CoreError::Conflict(format!(
                "kernel_size does not apply to {} models",
                other.model_type()
            ))),
        }
    }

    /// First failing field, in form order.
    pub fn validate(&self) -> Result<(), FieldError> {
        validation::validate_name(&self.name)?;
        self.parameters.validate()
    }

    /// Every failing field, in form order.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_name(&self.name) {
            errors.push(e);
        }
        errors.extend(self.parameters.field_errors());
        errors
    }

    /// Validate and assemble the create payload.
    pub fn to_request(&self) -> Result<CreateJobRequest, FieldError> {
        self.validate()?;
        Ok(CreateJobRequest::new(
            self.name.trim().to_string(),
            self.experiment_id,
            self.parameters.clone(),
        ))
    }
}

fn default_job_name() -> String {
    format!("Job {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/* --------------------------------------------------------------------------
   JobForm
   -------------------------------------------------------------------------- */

/// The job-creation dialog: a draft plus whether the dialog is showing.
#[derive(Debug, Clone)]
pub struct JobForm {
    draft: JobDraft,
    open: bool,
}

impl JobForm {
    /// A closed form targeting `experiment_id`.
    pub fn new(experiment_id: DbId) -> Self {
        Self {
            draft: JobDraft::new(experiment_id),
            open: false,
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Hide the dialog. The draft is kept.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &JobDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut JobDraft {
        &mut self.draft
    }

    /// Restore the draft to fresh defaults for the same experiment.
    pub fn reset(&mut self) {
        self.draft = JobDraft::new(self.draft.experiment_id);
    }

    /// Validate the draft and build the payload to send.
    pub fn prepare_submission(&self) -> Result<CreateJobRequest, FieldError> {
        self.draft.to_request()
    }

    /// Close and reset after the server accepted the job.
    pub fn finish_submission(&mut self) {
        self.close();
        self.reset();
    }
}
