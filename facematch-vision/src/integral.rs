//! Summed-area tables for constant-time rectangle sums.

use image::GrayImage;
use ndarray::Array2;

/// Integral and squared-integral images with a zero top row and left column.
pub struct IntegralImage {
    sum: Array2<i64>,
    sq_sum: Array2<i64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut sum = Array2::<i64>::zeros((h + 1, w + 1));
        let mut sq_sum = Array2::<i64>::zeros((h + 1, w + 1));

        for (y, row) in gray.as_raw().chunks_exact(w.max(1)).take(h).enumerate() {
            let mut row_sum = 0i64;
            let mut row_sq = 0i64;
            for (x, &p) in row.iter().enumerate() {
                let p = i64::from(p);
                row_sum += p;
                row_sq += p * p;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row_sum;
                sq_sum[[y + 1, x + 1]] = sq_sum[[y, x + 1]] + row_sq;
            }
        }

        Self { sum, sq_sum }
    }

    fn area_of(table: &Array2<i64>, x: u32, y: u32, width: u32, height: u32) -> i64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        table[[y1, x1]] - table[[y0, x1]] - table[[y1, x0]] + table[[y0, x0]]
    }

    pub fn rect_sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        Self::area_of(&self.sum, x, y, width, height)
    }

    pub fn rect_sq_sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        Self::area_of(&self.sq_sum, x, y, width, height)
    }

    /// Reciprocal of `area × stddev` over the rectangle; `1.0` for flat patches.
    pub fn variance_norm(&self, x: u32, y: u32, width: u32, height: u32) -> f32 {
        let area = f64::from(width) * f64::from(height);
        let s = self.rect_sum(x, y, width, height) as f64;
        let sq = self.rect_sq_sum(x, y, width, height) as f64;
        let nf = area * sq - s * s;
        let nf = if nf > 0.0 { nf.sqrt() } else { 1.0 };
        (1.0 / nf) as f32
    }
}
