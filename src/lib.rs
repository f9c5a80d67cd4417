pub mod config;
pub mod error;
pub mod matcher;
pub mod reference;
pub mod response;
pub mod service;

pub use error::ServiceError;
pub use matcher::{MatchResult, Matcher};
pub use reference::ReferenceSet;
pub use service::{Detection, Service};

// Re-export vision types for convenience
pub use facematch_vision::{
    face, pipeline, Encoding, FaceDetector, FaceEncoding, FaceRegion, Pipeline, SelectionStrategy,
    ENCODING_LEN,
};
