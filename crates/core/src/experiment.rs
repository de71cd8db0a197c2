//! Experiments group related training jobs.

use serde::{Deserialize, Serialize};

use crate::types::{timestamp, DbId, Timestamp};
use crate::validation::{self, FieldError};

/// An experiment as listed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<Timestamp>,
}

impl Experiment {
    /// Description text, or a placeholder when none was provided.
    pub fn description_or_default(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => "No description provided.",
        }
    }
}

/// Request body for creating an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateExperiment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateExperiment {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description: description.filter(|d| !d.trim().is_empty()),
        }
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        validation::validate_name(&self.name)
    }
}
