//! Experiment validation utilities

use std::collections::HashSet;

use thiserror::Error;

use super::variant::EMPTY_VARIANT_NAME;

/// Validation errors for experiments and variants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("Experiment name cannot be empty")]
    EmptyName,

    #[error("Variant name cannot be empty")]
    EmptyVariantName,

    #[error("Variant name '{0}' is reserved")]
    ReservedVariantName(String),

    #[error("Duplicate variant name: '{0}'")]
    DuplicateVariantName(String),

    #[error("Variant '{0}' has an invalid ratio: {1}")]
    InvalidRatio(String, String),
}

/// Validate an experiment name
pub fn validate_experiment_name(name: &str) -> Result<(), ExperimentValidationError> {
    if name.trim().is_empty() {
        return Err(ExperimentValidationError::EmptyName);
    }

    Ok(())
}

/// Validate a single variant definition
pub fn validate_variant(name: &str, ratio: f64) -> Result<(), ExperimentValidationError> {
    if name.is_empty() {
        return Err(ExperimentValidationError::EmptyVariantName);
    }

    if name == EMPTY_VARIANT_NAME {
        return Err(ExperimentValidationError::ReservedVariantName(
            name.to_string(),
        ));
    }

    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ExperimentValidationError::InvalidRatio(
            name.to_string(),
            ratio.to_string(),
        ));
    }

    Ok(())
}

/// Validate a variant list
///
/// Ratio sums are not checked: a sum below 1 leaves room for the empty variant.
pub fn validate_variants<'a>(
    variants: impl IntoIterator<Item = (&'a str, f64)>,
) -> Result<(), ExperimentValidationError> {
    let mut seen = HashSet::new();

    for (name, ratio) in variants {
        validate_variant(name, ratio)?;

        if !seen.insert(name) {
            return Err(ExperimentValidationError::DuplicateVariantName(
                name.to_string(),
            ));
        }
    }

    Ok(())
}
