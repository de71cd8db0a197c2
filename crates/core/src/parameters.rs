//! Training hyperparameters, discriminated by model type.
//!
//! The variant-specific field (`num_layers` or `kernel_size`) lives on
//! [`Architecture`], so a parameter set always carries exactly the one
//! that matches its model type. On the wire the variant is flattened
//! into the parameter object next to its `model_type` tag:
//!
//! ```json
//! {"model_type": "cnn", "optimizer": "adam", "learning_rate": 0.001,
//!  "batch_size": 64, "epochs": 10, "kernel_size": 3}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{self, FieldError};

/* --------------------------------------------------------------------------
   Enumerations
   -------------------------------------------------------------------------- */

/// Neural network family a job trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Mlp,
    Cnn,
    Rnn,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [ModelType::Mlp, ModelType::Cnn, ModelType::Rnn];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Mlp => "mlp",
            ModelType::Cnn => "cnn",
            ModelType::Rnn => "rnn",
        }
    }

    /// Human-readable name for selection lists.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelType::Mlp => "Multi-Layer Perceptron (MLP)",
            ModelType::Cnn => "Convolutional Neural Network (CNN)",
            ModelType::Rnn => "Recurrent Neural Network (RNN)",
        }
    }

    /// Type-specific defaults applied when this type is selected.
    pub fn defaults(self) -> ModelDefaults {
        match self {
            ModelType::Mlp => ModelDefaults {
                hidden_size: 128,
                dropout_rate: 0.2,
                architecture: Architecture::Mlp { num_layers: 2 },
            },
            ModelType::Cnn => ModelDefaults {
                hidden_size: 64,
                dropout_rate: 0.25,
                architecture: Architecture::Cnn { kernel_size: 3 },
            },
            ModelType::Rnn => ModelDefaults {
                hidden_size: 128,
                dropout_rate: 0.3,
                architecture: Architecture::Rnn { num_layers: 1 },
            },
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mlp" => Ok(ModelType::Mlp),
            "cnn" => Ok(ModelType::Cnn),
            "rnn" => Ok(ModelType::Rnn),
            other => Err(format!("Unknown model type '{other}'. Must be one of: mlp, cnn, rnn")),
        }
    }
}

/// Optimization algorithm used for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    Sgd,
    Adam,
    Rmsprop,
}

impl Optimizer {
    pub fn as_str(self) -> &'static str {
        match self {
            Optimizer::Sgd => "sgd",
            Optimizer::Adam => "adam",
            Optimizer::Rmsprop => "rmsprop",
        }
    }
}

impl fmt::Display for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
   Architecture
   -------------------------------------------------------------------------- */

/// The variant-specific part of a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "lowercase")]
pub enum Architecture {
    Mlp { num_layers: u32 },
    Cnn { kernel_size: u32 },
    Rnn { num_layers: u32 },
}

impl Architecture {
    pub fn model_type(&self) -> ModelType {
        match self {
            Architecture::Mlp { .. } => ModelType::Mlp,
            Architecture::Cnn { .. } => ModelType::Cnn,
            Architecture::Rnn { .. } => ModelType::Rnn,
        }
    }

    pub fn num_layers(&self) -> Option<u32> {
        match *self {
            Architecture::Mlp { num_layers } | Architecture::Rnn { num_layers } => Some(num_layers),
            Architecture::Cnn { .. } => None,
        }
    }

    pub fn kernel_size(&self) -> Option<u32> {
        match *self {
            Architecture::Cnn { kernel_size } => Some(kernel_size),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        match *self {
            Architecture::Mlp { num_layers } | Architecture::Rnn { num_layers } => {
                validation::validate_num_layers(num_layers)
            }
            Architecture::Cnn { kernel_size } => validation::validate_kernel_size(kernel_size),
        }
    }
}

/// Per-model-type defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelDefaults {
    pub hidden_size: u32,
    pub dropout_rate: f64,
    pub architecture: Architecture,
}

/* --------------------------------------------------------------------------
   Parameter sets
   -------------------------------------------------------------------------- */

/// Fields shared by every model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonParameters {
    pub optimizer: Optimizer,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub epochs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_scheduler: Option<bool>,
}

impl Default for CommonParameters {
    fn default() -> Self {
        Self {
            optimizer: Optimizer::Adam,
            learning_rate: 0.001,
            batch_size: 64,
            epochs: 10,
            dropout_rate: None,
            hidden_size: None,
            use_scheduler: Some(false),
        }
    }
}

/// A complete hyperparameter set as stored on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParameters {
    #[serde(flatten)]
    pub common: CommonParameters,
    #[serde(flatten)]
    pub architecture: Architecture,
}

impl TrainingParameters {
    /// Shared defaults combined with the defaults of `model_type`.
    pub fn defaults_for(model_type: ModelType) -> Self {
        let defaults = model_type.defaults();
        Self {
            common: CommonParameters {
                hidden_size: Some(defaults.hidden_size),
                dropout_rate: Some(defaults.dropout_rate),
                ..CommonParameters::default()
            },
            architecture: defaults.architecture,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.architecture.model_type()
    }

    /// Rebuild a parameter set stored on a job of `model_type`.
    ///
    /// `model_type` is authoritative: a `model_type` key inside `stored`
    /// is ignored. Keys missing from `stored` take that type's defaults,
    /// so rows written before a field existed still load. Keys present
    /// with the wrong shape are still an error.
    pub fn from_stored(
        model_type: ModelType,
        stored: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut merged = match serde_json::to_value(Self::defaults_for(model_type))? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in stored {
            if key != "model_type" {
                merged.insert(key, value);
            }
        }
        serde_json::from_value(serde_json::Value::Object(merged))
    }

    /// Check every field, in form order, and return the first failure.
    pub fn validate(&self) -> Result<(), FieldError> {
        match self.field_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Check every field, in form order, collecting all failures.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let c = &self.common;
        [
            validation::validate_learning_rate(c.learning_rate),
            validation::validate_batch_size(c.batch_size),
            validation::validate_epochs(c.epochs),
            validation::validate_dropout_rate(c.dropout_rate),
            validation::validate_hidden_size(c.hidden_size),
            self.architecture.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }
}
