use image::{imageops, GrayImage};
use serde::{Deserialize, Serialize};

use crate::cascade::HaarCascade;
use crate::error::{VisionError, VisionResult};
use crate::face::FaceRegion;
use crate::group::{self, GROUP_EPS};
use crate::integral::IntegralImage;

/// Pluggable face locator.
///
/// Implementations are loaded once and shared between requests, so detection
/// takes `&self` and must be safe to call concurrently.
pub trait FaceDetector: Send + Sync {
    /// Candidate face regions in detector order. An empty result means "no face".
    fn detect(&self, gray: &GrayImage) -> Vec<FaceRegion>;
}

/// Sliding-window search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Growth of the search window between pyramid levels.
    pub scale_factor: f64,
    /// A grouped region must collect more than this many raw windows.
    pub min_neighbors: u32,
    /// Smallest reported face side, in pixels.
    pub min_size: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 60,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> VisionResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(VisionError::InvalidParams(format!(
                "scale_factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_size == 0 {
            return Err(VisionError::InvalidParams("min_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Multi-scale Haar cascade detector.
#[derive(Debug, Clone)]
pub struct CascadeDetector {
    cascade: HaarCascade,
    params: DetectorParams,
}

impl CascadeDetector {
    pub fn new(cascade: HaarCascade, params: DetectorParams) -> VisionResult<Self> {
        params.validate()?;
        Ok(Self { cascade, params })
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn cascade(&self) -> &HaarCascade {
        &self.cascade
    }

    /// Every window accepted by the cascade, before grouping.
    ///
    /// The image is shrunk by successive powers of `scale_factor` and the fixed
    /// cascade window slides over each level: every 2 px while the level is at
    /// most 2x smaller, every pixel beyond that. Levels whose window maps to less
    /// than `min_size` in the source image are skipped.
    pub fn raw_windows(&self, gray: &GrayImage) -> Vec<FaceRegion> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let mut windows = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let scaled_w = (f64::from(img_w) / factor).round() as u32;
            let scaled_h = (f64::from(img_h) / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                break;
            }

            let window_w = (f64::from(win_w) * factor).round() as u32;
            let window_h = (f64::from(win_h) * factor).round() as u32;
            if window_w >= self.params.min_size && window_h >= self.params.min_size {
                let integral = if (scaled_w, scaled_h) == (img_w, img_h) {
                    IntegralImage::new(gray)
                } else {
                    let scaled =
                        imageops::resize(gray, scaled_w, scaled_h, imageops::FilterType::Triangle);
                    IntegralImage::new(&scaled)
                };
                let step = if factor > 2.0 { 1 } else { 2 };
                let before = windows.len();

                for y in (0..=scaled_h - win_h).step_by(step) {
                    for x in (0..=scaled_w - win_w).step_by(step) {
                        if self.cascade.classify(&integral, x, y) {
                            windows.push(FaceRegion::new(
                                (f64::from(x) * factor).round() as u32,
                                (f64::from(y) * factor).round() as u32,
                                window_w,
                                window_h,
                            ));
                        }
                    }
                }

                log::debug!(
                    "scale {:.3}: level {}x{}, window {}x{}, {} hits",
                    factor,
                    scaled_w,
                    scaled_h,
                    window_w,
                    window_h,
                    windows.len() - before
                );
            }

            factor *= self.params.scale_factor;
        }

        windows
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceRegion> {
        let (width, height) = gray.dimensions();
        let raw = self.raw_windows(gray);
        let min_size = self.params.min_size;

        // Averaged or rounded windows can overhang the border by a pixel or two.
        group::group_rectangles(&raw, self.params.min_neighbors, GROUP_EPS)
            .into_iter()
            .filter_map(|r| r.clamp_to(width, height))
            .filter(|r| r.width >= min_size && r.height >= min_size)
            .collect()
    }
}
