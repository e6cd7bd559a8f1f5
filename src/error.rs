use std::path::PathBuf;

use crate::detector::ModelPhase;

pub type Result<T> = std::result::Result<T, DetectError>;

/// Failures surfaced by the detection core.
/// "No language detected" is not one of them, see `DetectionResult::undetected`.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("no trained model is available, train the model first")]
    NotTrained,
    #[error("no model artifact at {}", path.display())]
    ModelNotFound { path: PathBuf },
    #[error("model artifact is corrupt or incompatible: {0}")]
    CorruptArtifact(String),
    #[error("insufficient training data: {0}")]
    InsufficientData(String),
    #[error("a training run is already in progress")]
    TrainingInProgress,
    #[error("invalid model state transition {from:?} -> {to:?}")]
    InvalidTransition { from: ModelPhase, to: ModelPhase },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("feature vector has dimension {found}, model expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("malformed corpus line {line}: {reason}")]
    MalformedCorpus { line: usize, reason: String },
    #[error("failed to encode model artifact: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DetectError {
    /// true when the caller should prompt for training rather than alert an operator
    pub fn is_not_trained(&self) -> bool {
        matches!(self, DetectError::NotTrained | DetectError::ModelNotFound { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, DetectError::CorruptArtifact(_))
    }
}
