//! Error types.
//!
//! Each pipeline component returns its own structured error so callers can
//! tell a bad artifact from a bad record from an unexplainable model.
//! `AppError` is the binary boundary: a message plus a process exit code.

use std::path::PathBuf;

use crate::domain::Field;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure to load the fitted artifacts. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("Artifact '{}' not found.", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read artifact '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact '{}' is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Artifact '{}' is '{found}' v{version}; expected '{expected}' v{supported}.",
        .path.display()
    )]
    Incompatible {
        path: PathBuf,
        found: String,
        version: u32,
        expected: &'static str,
        supported: u32,
    },

    #[error("Artifact '{}' failed validation: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("In-memory {artifact} failed validation: {reason}")]
    Rejected { artifact: &'static str, reason: String },

    #[error("Transform and classifier disagree on the feature layout: {reason}")]
    Mismatch { reason: String },
}

/// A record field outside its declared domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} = {value} is outside [{min}, {max}].")]
    OutOfRange {
        field: Field,
        value: String,
        min: String,
        max: String,
    },
}

/// Encoding or scoring failure for one record. The process keeps serving.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid applicant record: {0}")]
    InvalidRecord(#[from] ValidationError),

    #[error("Cannot encode {field}: unknown category '{value}'.")]
    UnknownCategory { field: Field, value: String },

    #[error("Cannot encode {field}: {reason}")]
    Encoding { field: Field, reason: String },

    #[error("Feature vector has {actual} columns but the classifier expects {expected}.")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Classifier produced a non-finite score.")]
    NonFiniteScore,
}

/// The loaded classifier cannot be explained. The prediction still stands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributionError {
    #[error("Attribution is not supported for {model} classifiers.")]
    UnsupportedModel { model: &'static str },

    #[error("Encoded record has {actual} columns but the classifier expects {expected}.")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl From<ArtifactLoadError> for AppError {
    fn from(err: ArtifactLoadError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::new(3, err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(3, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let missing: AppError = ArtifactLoadError::Missing {
            path: PathBuf::from("artifacts/classifier.json"),
        }
        .into();
        assert_eq!(missing.exit_code(), 2);
        assert!(missing.to_string().contains("artifacts/classifier.json"));

        let pipeline: AppError = PipelineError::NonFiniteScore.into();
        assert_eq!(pipeline.exit_code(), 3);
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = ValidationError::OutOfRange {
            field: Field::Duration,
            value: "0".to_string(),
            min: "4".to_string(),
            max: "72".to_string(),
        };
        assert_eq!(err.to_string(), "Duration = 0 is outside [4, 72].");
        let wrapped = PipelineError::from(err);
        assert!(wrapped.to_string().starts_with("Invalid applicant record"));
    }
}
