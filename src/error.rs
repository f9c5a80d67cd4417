use facematch_vision::VisionError;
use thiserror::Error;

/// Outcome of a failed request.
///
/// Every variant except [`ServiceError::Unexpected`] is an expected business
/// outcome that callers report as `success: false`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("could not decode image: {0}")]
    DecodeFailure(String),

    #[error("no face detected; make sure the face is clearly visible in the image")]
    NoFaceDetected,

    #[error("invalid known encodings: {0}")]
    InvalidReferenceSet(String),

    #[error("known encoding {index} has {actual} values, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ServiceError::Unexpected(_))
    }
}

impl From<VisionError> for ServiceError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Decode(message) => ServiceError::DecodeFailure(message),
            other => ServiceError::Unexpected(other.into()),
        }
    }
}
