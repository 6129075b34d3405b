//! Error types for the ws-core engine

use thiserror::Error;

/// Main error type for ws-core
///
/// Sensor problems never surface here; they become quality flags on the
/// snapshot. These variants cover construction, seed decoding and the
/// upstream forecast.
#[derive(Error, Debug)]
pub enum WsCoreError {
    /// Invalid or unloadable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External forecast unavailable or malformed
    #[error("Forecast error: {message}")]
    Forecast { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// State seed could not be encoded or decoded
    #[error("State seed error: {message}")]
    State { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl WsCoreError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new forecast error
    pub fn forecast<S: Into<String>>(message: S) -> Self {
        Self::Forecast {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new state seed error
    pub fn state<S: Into<String>>(message: S) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WsCoreError::Config { message } => {
                format!("Configuration error: {message}. Please check your station settings.")
            }
            WsCoreError::Forecast { .. } => {
                "External forecast unavailable. Using the last cached forecast.".to_string()
            }
            WsCoreError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            WsCoreError::State { .. } => {
                "Saved station state could not be restored. Starting with empty buffers."
                    .to_string()
            }
            WsCoreError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            WsCoreError::General { message } => message.clone(),
        }
    }
}
