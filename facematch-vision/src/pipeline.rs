use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageDecoder, ImageError, ImageReader, Luma};

use crate::detector::FaceDetector;
use crate::error::{VisionError, VisionResult};
use crate::face::{self, Encoding, FaceRegion};
use crate::selection::SelectionStrategy;

/// Decoded grayscale frame and every face region found in it.
pub struct FaceScan {
    pub gray: GrayImage,
    pub regions: Vec<FaceRegion>,
}

impl FaceScan {
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

/// The chosen face and its encoding.
#[derive(Debug, Clone)]
pub struct FaceEncoding {
    pub region: FaceRegion,
    pub encoding: Encoding,
    pub faces_detected: usize,
}

/// Full pipeline: decode → grayscale → locate → select → encode
pub struct Pipeline {
    detector: Box<dyn FaceDetector>,
    selection: SelectionStrategy,
}

impl Pipeline {
    pub fn new(detector: Box<dyn FaceDetector>, selection: SelectionStrategy) -> Self {
        Self {
            detector,
            selection,
        }
    }

    pub fn selection(&self) -> SelectionStrategy {
        self.selection
    }

    /// Decode raw bytes and locate candidate faces.
    pub fn scan(&self, bytes: &[u8]) -> VisionResult<FaceScan> {
        let gray = to_gray(&decode_image(bytes)?);
        let regions = self.detector.detect(&gray);
        log::debug!(
            "{} face region(s) in {}x{} image",
            regions.len(),
            gray.width(),
            gray.height()
        );
        Ok(FaceScan { gray, regions })
    }

    /// Pick one face with the configured strategy and encode it.
    ///
    /// Returns `None` when the scan found no face.
    pub fn encode_selected(&self, scan: &FaceScan) -> VisionResult<Option<FaceEncoding>> {
        let (width, height) = scan.dimensions();
        let Some(region) = self.selection.select(&scan.regions, width, height) else {
            return Ok(None);
        };

        let encoding = face::encode_face(&scan.gray, region)?;
        Ok(Some(FaceEncoding {
            region: *region,
            encoding,
            faces_detected: scan.regions.len(),
        }))
    }

    /// Process an image: detect the selected face and return its encoding
    pub fn process_image(&self, bytes: &[u8]) -> VisionResult<Option<FaceEncoding>> {
        let scan = self.scan(bytes)?;
        self.encode_selected(&scan)
    }
}

/// Decode a JPEG/PNG/... buffer and turn it upright according to its EXIF
/// orientation. Decoder limit violations are reported separately from malformed input.
pub fn decode_image(bytes: &[u8]) -> VisionResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::Decode(e.to_string()))?;
    let mut decoder = reader.into_decoder().map_err(decode_err)?;
    let orientation = decoder.orientation().map_err(decode_err)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn decode_err(err: ImageError) -> VisionError {
    match err {
        ImageError::Limits(e) => VisionError::Limits(e.to_string()),
        other => VisionError::Decode(other.to_string()),
    }
}

/// BT.601 luma in 14-bit fixed point, the weighting used by OpenCV's `BGR2GRAY`.
/// `image`'s own `to_luma8` uses BT.709 weights instead.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868;
        Luma([((luma + (1 << 13)) >> 14) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_gray_uses_bt601_weights() {
        let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255], [0, 0, 0]];
        let img = RgbImage::from_fn(colors.len() as u32, 1, |x, _| Rgb(colors[x as usize]));
        let gray = to_gray(&DynamicImage::ImageRgb8(img));
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![76, 150, 29, 255, 0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_image(b"GIF89a"), Err(VisionError::Decode(_))));
        assert!(matches!(decode_image(&[]), Err(VisionError::Decode(_))));
    }
}
