//! Errors raised while running experiment callbacks

use std::any::Any;

use thiserror::Error;

/// Failure of an experiment's initial-state factory or tracker
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    #[error("{message}")]
    Callback { message: String },

    #[error("{message}")]
    Panicked { message: String },
}

impl ExperimentError {
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Build an error from a payload caught by `catch_unwind`
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "experiment callback panicked".to_string()
        };

        Self::Panicked { message }
    }

    /// Message recorded in the experiment state on failure
    pub fn message(&self) -> &str {
        match self {
            Self::Callback { message } | Self::Panicked { message } => message,
        }
    }
}
