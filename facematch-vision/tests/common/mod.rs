#![allow(dead_code)]

use facematch_vision::{FaceDetector, FaceRegion};
use image::{GrayImage, RgbImage};

/// Build a one-stage cascade whose single stump always yields `leaf`.
pub fn constant_cascade(leaf: f32) -> String {
    format!(
        r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>24</height>
  <width>24</width>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 0.</internalNodes>
          <leafValues>
            {leaf} {leaf}</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 12 24 -1.</_>
        <_>
          12 0 12 24 1.</_></rects></_></features></cascade>
</opencv_storage>
"#
    )
}

pub fn accept_all_cascade() -> String {
    constant_cascade(1.0)
}

pub fn reject_all_cascade() -> String {
    constant_cascade(-1.0)
}

/// Detector returning a fixed list of regions.
pub struct FixedDetector(pub Vec<FaceRegion>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _gray: &GrayImage) -> Vec<FaceRegion> {
        self.0.clone()
    }
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;

    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ]);
    }
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

/// JPEG of `gradient_png`'s pattern with an APP1 Exif segment carrying `orientation`.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    use std::io::Cursor;

    let img = image::load_from_memory(&gradient_png(width, height)).unwrap();
    let mut jpeg = Vec::new();
    img.write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .unwrap();

    // Little-endian TIFF header, one IFD with a single SHORT Orientation (0x0112) entry.
    let mut tiff = vec![b'I', b'I', 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x00];
    tiff.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let length = (2 + 6 + tiff.len()) as u16;
    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&length.to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    // Right after SOI.
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}
