// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-bit-per-pixel bitmaps for thermal label printers.

use image::GrayImage;

/// A packed monochrome bitmap. Rows are MSB-first; a set bit is a black dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl MonoBitmap {
    /// An all-white bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// Binarize a grayscale image.
    ///
    /// `threshold` is a darkness percentage: at 70 only pixels at least 70%
    /// dark become black dots, so light greys and anti-aliasing drop out.
    pub fn from_luma(image: &GrayImage, threshold: u8) -> Self {
        let cutoff = luma_cutoff(threshold);
        let mut bitmap = Self::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            if u16::from(pixel.0[0]) < cutoff {
                bitmap.set(x, y, true);
            }
        }
        bitmap
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the dot at (x, y) is black. Out-of-range reads are white.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.data[y as usize * self.stride + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Set or clear a dot. Out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, black: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.stride + x as usize / 8;
        let mask = 0x80 >> (x % 8);
        if black {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
    }

    /// Packed bytes of one row.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    pub fn black_dots(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Luma values strictly below the returned cutoff are black.
fn luma_cutoff(threshold: u8) -> u16 {
    let threshold = u16::from(threshold.min(100));
    (100 - threshold) * 255 / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn cutoff_for_default_threshold() {
        assert_eq!(luma_cutoff(70), 76);
        assert_eq!(luma_cutoff(100), 0);
        assert_eq!(luma_cutoff(0), 255);
    }

    #[test]
    fn rows_pack_msb_first() {
        let mut bitmap = MonoBitmap::new(10, 2);
        bitmap.set(0, 0, true);
        bitmap.set(9, 0, true);
        bitmap.set(3, 1, true);
        assert_eq!(bitmap.row(0), &[0b1000_0000, 0b0100_0000]);
        assert_eq!(bitmap.row(1), &[0b0001_0000, 0]);
        assert_eq!(bitmap.black_dots(), 3);
        bitmap.set(9, 0, false);
        assert!(!bitmap.get(9, 0));
    }

    #[test]
    fn out_of_range_is_white_and_ignored() {
        let mut bitmap = MonoBitmap::new(4, 4);
        bitmap.set(4, 0, true);
        assert!(!bitmap.get(4, 0));
        assert_eq!(bitmap.black_dots(), 0);
    }

    #[test]
    fn thresholding_splits_grey_levels() {
        let mut image = GrayImage::from_pixel(3, 1, Luma([255]));
        image.put_pixel(0, 0, Luma([0]));
        image.put_pixel(1, 0, Luma([75]));
        image.put_pixel(2, 0, Luma([76]));
        let bitmap = MonoBitmap::from_luma(&image, 70);
        assert!(bitmap.get(0, 0));
        assert!(bitmap.get(1, 0));
        assert!(!bitmap.get(2, 0));
    }
}
