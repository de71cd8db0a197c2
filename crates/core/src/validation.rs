//! Range checks for job-creation input.
//!
//! Every check returns a [`FieldError`] naming the offending field so
//! the form can block submission and point at the first bad input.

/* --------------------------------------------------------------------------
   Field names
   -------------------------------------------------------------------------- */

pub const FIELD_NAME: &str = "name";
pub const FIELD_LEARNING_RATE: &str = "parameters.learning_rate";
pub const FIELD_BATCH_SIZE: &str = "parameters.batch_size";
pub const FIELD_EPOCHS: &str = "parameters.epochs";
pub const FIELD_DROPOUT_RATE: &str = "parameters.dropout_rate";
pub const FIELD_HIDDEN_SIZE: &str = "parameters.hidden_size";
pub const FIELD_NUM_LAYERS: &str = "parameters.num_layers";
pub const FIELD_KERNEL_SIZE: &str = "parameters.kernel_size";

/* --------------------------------------------------------------------------
   Limits
   -------------------------------------------------------------------------- */

/// Upper bound for the learning rate. The lower bound is exclusive zero.
pub const MAX_LEARNING_RATE: f64 = 1.0;

pub const MIN_BATCH_SIZE: u32 = 1;
pub const MAX_BATCH_SIZE: u32 = 1024;

pub const MIN_EPOCHS: u32 = 1;
pub const MAX_EPOCHS: u32 = 100;

pub const MIN_DROPOUT_RATE: f64 = 0.0;
pub const MAX_DROPOUT_RATE: f64 = 0.9;

pub const MIN_HIDDEN_SIZE: u32 = 1;
pub const MAX_HIDDEN_SIZE: u32 = 1024;

pub const MIN_NUM_LAYERS: u32 = 1;
pub const MAX_NUM_LAYERS: u32 = 10;

pub const MIN_KERNEL_SIZE: u32 = 1;
pub const MAX_KERNEL_SIZE: u32 = 7;

/* --------------------------------------------------------------------------
   FieldError
   -------------------------------------------------------------------------- */

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    /// Dotted path of the field, e.g. `parameters.epochs`.
    pub field: &'static str,
    /// Human-readable reason shown next to the field.
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/* --------------------------------------------------------------------------
   Checks
   -------------------------------------------------------------------------- */

/// Validate a job or experiment name: must contain at least one non-whitespace character.
pub fn validate_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() {
        return Err(FieldError::new(FIELD_NAME, "Name is required"));
    }
    Ok(())
}

/// Validate the learning rate lies in `(0, 1]`.
pub fn validate_learning_rate(value: f64) -> Result<(), FieldError> {
    if !value.is_finite() || value <= 0.0 || value > MAX_LEARNING_RATE {
        return Err(FieldError::new(
            FIELD_LEARNING_RATE,
            format!("Learning rate must be greater than 0 and at most {MAX_LEARNING_RATE}, got {value}"),
        ));
    }
    Ok(())
}

/// Validate an optional dropout rate lies in `[0, 0.9]`.
pub fn validate_dropout_rate(value: Option<f64>) -> Result<(), FieldError> {
    match value {
        Some(v) if !v.is_finite() || !(MIN_DROPOUT_RATE..=MAX_DROPOUT_RATE).contains(&v) => {
            Err(FieldError::new(
                FIELD_DROPOUT_RATE,
                format!(
                    "Dropout rate must be between {MIN_DROPOUT_RATE} and {MAX_DROPOUT_RATE}, got {v}"
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Validate an integer field lies in the inclusive range `[min, max]`.
pub fn validate_int_range(
    field: &'static str,
    label: &str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), FieldError> {
    if value < min || value > max {
        return Err(FieldError::new(
            field,
            format!("{label} must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

pub fn validate_batch_size(value: u32) -> Result<(), FieldError> {
    validate_int_range(FIELD_BATCH_SIZE, "Batch size", value, MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

pub fn validate_epochs(value: u32) -> Result<(), FieldError> {
    validate_int_range(FIELD_EPOCHS, "Epochs", value, MIN_EPOCHS, MAX_EPOCHS)
}

pub fn validate_hidden_size(value: Option<u32>) -> Result<(), FieldError> {
    match value {
        Some(v) => validate_int_range(
            FIELD_HIDDEN_SIZE,
            "Hidden size",
            v,
            MIN_HIDDEN_SIZE,
            MAX_HIDDEN_SIZE,
        ),
        None => Ok(()),
    }
}

pub fn validate_num_layers(value: u32) -> Result<(), FieldError> {
    validate_int_range(
        FIELD_NUM_LAYERS,
        "Number of layers",
        value,
        MIN_NUM_LAYERS,
        MAX_NUM_LAYERS,
    )
}

pub fn validate_kernel_size(value: u32) -> Result<(), FieldError> {
    validate_int_range(
        FIELD_KERNEL_SIZE,
        "Kernel size",
        value,
        MIN_KERNEL_SIZE,
        MAX_KERNEL_SIZE,
    )
}
