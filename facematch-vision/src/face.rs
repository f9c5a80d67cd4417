use image::{imageops, GrayImage};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{VisionError, VisionResult};

/// Side length of the normalized face patch.
pub const PATCH_SIZE: u32 = 100;

/// Number of values in every [`Encoding`].
pub const ENCODING_LEN: usize = (PATCH_SIZE * PATCH_SIZE) as usize;

/// Candidate face rectangle in grayscale image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// True when the region is non-empty and lies fully inside a `width` × `height` image.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        self.width > 0
            && self.height > 0
            && right <= u64::from(width)
            && bottom <= u64::from(height)
    }

    /// Shrink the region so it fits inside a `width` × `height` image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<FaceRegion> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clamped = FaceRegion {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        (clamped.width > 0 && clamped.height > 0).then_some(clamped)
    }
}

/// Normalized face patch: 100×100 intensities in `[0.0, 1.0]`, flattened row-major.
///
/// This is a raw pixel encoding, not a learned embedding. Two encodings are only
/// comparable when both came from the same patch size and normalization, which is
/// why construction from foreign data goes through [`Encoding::try_from_vec`].
/// The values are private so every `Encoding` has exactly [`ENCODING_LEN`] of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    vector: Array1<f64>,
}

impl Encoding {
    /// Validate externally supplied values: exact length, finite, and in `[0.0, 1.0]`.
    pub fn try_from_vec(values: Vec<f64>) -> VisionResult<Self> {
        if values.len() != ENCODING_LEN {
            return Err(VisionError::EncodingLength {
                expected: ENCODING_LEN,
                actual: values.len(),
            });
        }
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(VisionError::EncodingRange { index, value });
        }
        Ok(Self {
            vector: Array1::from_vec(values),
        })
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.vector.view()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.vector.to_vec()
    }

    /// Euclidean distance to another encoding.
    pub fn distance(&self, other: &Encoding) -> f64 {
        let diff = &self.vector - &other.vector;
        diff.dot(&diff).sqrt()
    }
}

/// Crop `region` exactly, stretch it to 100×100 and scale intensities to `[0, 1]`.
pub fn encode_face(gray: &GrayImage, region: &FaceRegion) -> VisionResult<Encoding> {
    let (image_width, image_height) = gray.dimensions();
    if !region.fits(image_width, image_height) {
        return Err(VisionError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            image_width,
            image_height,
        });
    }

    let crop = imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image();
    let patch = imageops::resize(
        &crop,
        PATCH_SIZE,
        PATCH_SIZE,
        imageops::FilterType::Triangle,
    );

    let vector: Array1<f64> = patch
        .as_raw()
        .iter()
        .map(|&p| f64::from(p) / 255.0)
        .collect();

    Ok(Encoding { vector })
}
