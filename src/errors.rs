use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the segmentation pipeline.
///
/// Each variant carries the context of its failure domain (model artifact, inference,
/// tensor shapes, files), so callers never have to parse error strings. A failed request
/// is reported through the worker's event channel instead of tearing the process down.
#[derive(Error, Debug)]
pub enum SegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Model load error: {path:?} could not be loaded")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Precondition violated: {reason}")]
    PreconditionViolation { reason: String },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },

    #[error("Failed to start pipeline worker")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },

    #[error("Pipeline worker is no longer running")]
    PipelineClosed,
}

pub type Result<T> = std::result::Result<T, SegError>;

/// Some helpers (clap value parsers, anyhow contexts) produce `anyhow::Error`;
/// they are all configuration problems by the time they reach the library.
impl From<anyhow::Error> for SegError {
    fn from(err: anyhow::Error) -> Self {
        SegError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Fallback for I/O errors raised without path context. Code that knows the
/// path and operation should build `SegError::FileSystem` directly.
impl From<std::io::Error> for SegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for SegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Runtime errors past model loading always happen while running a session.
impl From<ort::Error> for SegError {
    fn from(err: ort::Error) -> Self {
        Self::Inference {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ndarray::ShapeError> for SegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Inference {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

impl SegError {
    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_fall_back_to_unknown_path() {
        let err: SegError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        match err {
            SegError::FileSystem { path, operation, .. } => {
                assert_eq!(path, PathBuf::from("unknown"));
                assert_eq!(operation, "unknown");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn precondition_message_is_readable() {
        let err = SegError::precondition("score buffer has 3 values, expected 8");
        assert_eq!(
            err.to_string(),
            "Precondition violated: score buffer has 3 values, expected 8"
        );
    }

    #[test]
    fn worker_spawn_failure_keeps_its_cause() {
        let err = SegError::WorkerSpawn {
            source: std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left"),
        };
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain, "Failed to start pipeline worker: no threads left");
    }
}
