//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts finite, non-negative and representable, buffer non-empty)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SluiceConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::time::Duration;

use crate::config::schema::{SluiceConfig, TimeoutConfig, TimeoutMode};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `timeouts.read_secs`.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a whole configuration.
pub fn validate_config(config: &SluiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_timeouts(&config.timeouts, &mut errors);

    if config.body.buffer_size == 0 {
        errors.push(ValidationError {
            field: "body.buffer_size",
            message: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_timeouts(timeouts: &TimeoutConfig, errors: &mut Vec<ValidationError>) {
    let fields = [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.read_secs", timeouts.read_secs),
        ("timeouts.write_secs", timeouts.write_secs),
    ];

    for (field, value) in fields {
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError {
                field,
                message: format!("must be a finite, non-negative number of seconds (got {})", value),
            });
        } else if Duration::try_from_secs_f64(value).is_err() {
            errors.push(ValidationError {
                field,
                message: format!("is too large to be a duration (got {})", value),
            });
        } else if value == 0.0 && timeouts.mode == TimeoutMode::PerOperation {
            // A zero bound would fail every operation that has to wait at all.
            errors.push(ValidationError {
                field,
                message: "must be greater than zero in per_operation mode".to_string(),
            });
        }
    }
}
