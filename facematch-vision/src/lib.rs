pub mod cascade;
pub mod detector;
pub mod error;
pub mod face;
pub mod group;
pub mod integral;
pub mod model;
pub mod pipeline;
pub mod selection;

// Re-export commonly used types
pub use cascade::HaarCascade;
pub use detector::{CascadeDetector, DetectorParams, FaceDetector};
pub use error::{VisionError, VisionResult};
pub use face::{Encoding, FaceRegion, ENCODING_LEN, PATCH_SIZE};
pub use pipeline::{FaceEncoding, FaceScan, Pipeline};
pub use selection::SelectionStrategy;
