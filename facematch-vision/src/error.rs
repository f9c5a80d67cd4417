use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("image exceeds decoder limits: {0}")]
    Limits(String),

    #[error("encoding must have {expected} values, got {actual}")]
    EncodingLength { expected: usize, actual: usize },

    #[error("encoding value {value} at index {index} is outside [0.0, 1.0]")]
    EncodingRange { index: usize, value: f64 },

    #[error(
        "face region {x},{y} {width}x{height} does not fit a {image_width}x{image_height} image"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("invalid cascade: {0}")]
    Cascade(String),

    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
}

pub type VisionResult<T> = Result<T, VisionError>;
