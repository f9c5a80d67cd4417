//! Plain result records handed back to the request-handling layer.

use facematch_vision::{FaceEncoding, FaceRegion, ENCODING_LEN, PATCH_SIZE};
use serde::Serialize;

use crate::error::ServiceError;
use crate::matcher::MatchResult;
use crate::service::Detection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

/// Either a success payload or `{ success: false, message }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Response<T> {
    /// Fold business failures into `success: false`; unexpected faults stay errors.
    pub fn from_outcome<U: Into<T>>(outcome: Result<U, ServiceError>) -> anyhow::Result<Self> {
        match outcome {
            Ok(payload) => Ok(Response::Success(payload.into())),
            Err(ServiceError::Unexpected(err)) => {
                log::error!("Error processing image: {err:#}");
                Err(err)
            }
            Err(err) => Ok(Response::Failure(Failure {
                success: false,
                message: err.to_string(),
            })),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodePayload {
    pub success: bool,
    pub message: String,
    pub width: u32,
    pub height: u32,
    pub vector_length: usize,
    pub encoding: Vec<f64>,
    pub faces_detected: usize,
}

impl From<FaceEncoding> for EncodePayload {
    fn from(face: FaceEncoding) -> Self {
        Self {
            success: true,
            message: "Face encoded successfully".into(),
            width: PATCH_SIZE,
            height: PATCH_SIZE,
            vector_length: ENCODING_LEN,
            encoding: face.encoding.to_vec(),
            faces_detected: face.faces_detected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizePayload {
    pub success: bool,
    pub best_index: usize,
    pub distance: f64,
    pub is_match: bool,
    pub threshold: f64,
    pub confidence: f64,
}

impl From<MatchResult> for RecognizePayload {
    fn from(m: MatchResult) -> Self {
        Self {
            success: true,
            best_index: m.best_index,
            distance: m.distance,
            is_match: m.is_match,
            threshold: m.threshold,
            confidence: m.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectPayload {
    pub success: bool,
    pub faces_detected: usize,
    pub faces: Vec<FaceRegion>,
    pub image_width: u32,
    pub image_height: u32,
}

impl From<Detection> for DetectPayload {
    fn from(d: Detection) -> Self {
        Self {
            success: true,
            faces_detected: d.faces.len(),
            faces: d.faces,
            image_width: d.image_width,
            image_height: d.image_height,
        }
    }
}

pub type EncodeResponse = Response<EncodePayload>;
pub type RecognizeResponse = Response<RecognizePayload>;
pub type DetectResponse = Response<DetectPayload>;
