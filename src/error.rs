//! Unified error hierarchy for fitsynth
//!
//! Generation itself has no recoverable failure mode: every randomised value
//! is clamped into its documented range before it leaves a generator. What
//! remains is configuration, I/O on the output tree, and the consumer-side
//! readers in [`crate::import`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all fitsynth operations
#[derive(Debug, Error)]
pub enum FitSynthError {
    /// Output serialization / write errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Consumer-side parsing errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while writing the output tree
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO failure while writing a file
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failure
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failure
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// Output directory already exists and is not empty
    #[error("Output directory is not empty: {path}")]
    OutputNotEmpty { path: PathBuf },

    /// Staging directory could not be promoted to the final location
    #[error("Failed to finalize output at {path}: {reason}")]
    FinalizeFailed { path: PathBuf, reason: String },
}

/// Errors raised while reading generated (or real) export files back
#[derive(Debug, Error)]
pub enum ImportError {
    /// File could not be read
    #[error("File not found or unreadable: {path}")]
    Unreadable { path: PathBuf },

    /// Malformed JSON
    #[error("Invalid JSON in {path}: {reason}")]
    InvalidJson { path: PathBuf, reason: String },

    /// Malformed CSV
    #[error("Invalid CSV: {0}")]
    InvalidCsv(#[from] csv::Error),

    /// CSV has neither the legacy nor the readable exercise schema
    #[error("Unrecognised exercise schema, headers: {headers}")]
    UnknownSchema { headers: String },
}

/// Result type alias for fitsynth operations
pub type Result<T> = std::result::Result<T, FitSynthError>;

impl FitSynthError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FitSynthError::Import(ImportError::Unreadable { .. }) => ErrorSeverity::Warning,
            FitSynthError::Validation(_) => ErrorSeverity::Warning,
            FitSynthError::Configuration(_) => ErrorSeverity::Error,
            FitSynthError::Export(_) | FitSynthError::Io(_) => ErrorSeverity::Critical,
            FitSynthError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            FitSynthError::Export(ExportError::WriteFailed { path, .. }) => {
                format!(
                    "Could not write {}. No output was kept; check permissions and free space.",
                    path.display()
                )
            }
            FitSynthError::Export(ExportError::OutputNotEmpty { path }) => {
                format!(
                    "{} already contains files. Choose another directory or pass --force.",
                    path.display()
                )
            }
            FitSynthError::Configuration(reason) => {
                format!("The configuration is invalid: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Run aborted, output discarded
    Critical,
    /// Operation refused
    Error,
    /// Recoverable, reported only
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = FitSynthError::Export(ExportError::OutputNotEmpty {
            path: PathBuf::from("/tmp/out"),
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = FitSynthError::Validation("bad trace".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_user_messages() {
        let err = FitSynthError::Export(ExportError::WriteFailed {
            path: PathBuf::from("heart_rate-2026-01-20.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(err.user_message().contains("No output was kept"));

        let err = FitSynthError::Configuration("days must be positive".to_string());
        assert!(err.user_message().contains("days must be positive"));
    }
}
