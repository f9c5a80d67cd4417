use anyhow::{Context, Result};
use facematch_vision::{model, FaceEncoding, FaceRegion, Pipeline};
use log::{info, warn};

use crate::config::Config;
use crate::error::ServiceError;
use crate::matcher::{MatchResult, Matcher};
use crate::reference::ReferenceSet;

/// Face locations found by a `detect` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub faces: Vec<FaceRegion>,
    pub image_width: u32,
    pub image_height: u32,
}

/// Encode / recognize / detect over one shared, read-only pipeline.
///
/// Requests do not share mutable state, so a `Service` can sit behind an `Arc`
/// and serve concurrent callers.
pub struct Service {
    pipeline: Pipeline,
    matcher: Matcher,
}

impl Service {
    pub fn new(pipeline: Pipeline, matcher: Matcher) -> Self {
        Self { pipeline, matcher }
    }

    /// Load the cascade named by `cfg` and build the service around it.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let detector = model::cascade_detector(&cfg.cascade, cfg.detector)
            .context("loading face detector")?;
        info!(
            "Using MATCH_THRESHOLD={}, CONFIDENCE_MAX_DISTANCE={}, selection={}",
            cfg.match_threshold, cfg.confidence_max_distance, cfg.selection
        );
        Ok(Self::new(
            Pipeline::new(Box::new(detector), cfg.selection),
            Matcher::from_config(cfg),
        ))
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Encode the selected face in `image`.
    pub fn encode(&self, image: &[u8]) -> Result<FaceEncoding, ServiceError> {
        let face = self.encode_face(image)?;
        info!(
            "Face encoded successfully. Vector length: {}",
            face.encoding.dimension()
        );
        Ok(face)
    }

    /// Parse `known_json` and recognize the face in `image` against it.
    ///
    /// The reference payload is validated before the image is touched.
    pub fn recognize_json(
        &self,
        image: &[u8],
        known_json: impl AsRef<[u8]>,
    ) -> Result<MatchResult, ServiceError> {
        let known = ReferenceSet::from_json(known_json)?;
        info!("Loaded {} known encodings", known.len());
        self.recognize(image, &known)
    }

    /// Compare the selected face in `image` with every known encoding.
    pub fn recognize(
        &self,
        image: &[u8],
        known: &ReferenceSet,
    ) -> Result<MatchResult, ServiceError> {
        let face = self.encode_face(image)?;
        let result = self
            .matcher
            .best_match(&face.encoding, known.encodings())
            .ok_or_else(|| {
                ServiceError::InvalidReferenceSet(
                    "known encodings must be a non-empty array".into(),
                )
            })?;

        info!(
            "Best match: index={}, distance={:.4}, is_match={}, threshold={}, confidence={:.1}%",
            result.best_index, result.distance, result.is_match, result.threshold, result.confidence
        );
        Ok(result)
    }

    /// Locate every face without encoding.
    pub fn detect(&self, image: &[u8]) -> Result<Detection, ServiceError> {
        let scan = self.pipeline.scan(image).inspect_err(log_failure)?;
        let (image_width, image_height) = scan.dimensions();
        info!("Detected {} face(s)", scan.regions.len());
        Ok(Detection {
            faces: scan.regions,
            image_width,
            image_height,
        })
    }

    fn encode_face(&self, image: &[u8]) -> Result<FaceEncoding, ServiceError> {
        let scan = self.pipeline.scan(image).inspect_err(log_failure)?;
        let Some(face) = self.pipeline.encode_selected(&scan)? else {
            warn!("No face detected in image");
            return Err(ServiceError::NoFaceDetected);
        };

        let r = face.region;
        info!(
            "Face detected at position: x={}, y={}, w={}, h={} ({} candidate(s), {})",
            r.x,
            r.y,
            r.width,
            r.height,
            face.faces_detected,
            self.pipeline.selection()
        );
        Ok(face)
    }
}

fn log_failure(err: &facematch_vision::VisionError) {
    log::error!("{err}");
}
