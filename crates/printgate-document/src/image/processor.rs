// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, orient, fit to a label, and binarize.

use image::{DynamicImage, GrayImage, Luma};
use printgate_core::error::{PrintgateError, Result};
use tracing::{debug, instrument};

use crate::bitmap::MonoBitmap;

/// Image pipeline for a single in-memory page.
///
/// Each transformation consumes `self` and returns a new processor, so calls
/// chain:
///
/// ```ignore
/// let bitmap = ImageProcessor::from_bytes(&png)?
///     .fit(1164, 1660)
///     .to_bitmap(70);
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode PNG, JPEG, GIF and the other formats the `image` crate knows.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            PrintgateError::UnsupportedDocument(format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Scale to cover `width` x `height` and crop the overflow from the centre.
    ///
    /// A landscape image headed for a portrait label (or the reverse) is turned
    /// a quarter first so that less of it is cropped away.
    #[instrument(skip(self), fields(from_w = self.image.width(), from_h = self.image.height()))]
    pub fn fit(self, width: u32, height: u32) -> Self {
        let image = if orientation_differs(self.image.width(), self.image.height(), width, height)
        {
            debug!("Rotating to match label orientation");
            self.image.rotate90()
        } else {
            self.image
        };
        let fitted = image.resize_to_fill(width, height, image::imageops::FilterType::Lanczos3);
        debug!(
            new_w = fitted.width(),
            new_h = fitted.height(),
            "Fit complete"
        );
        Self { image: fitted }
    }

    /// Rec. 601 grayscale with transparency composited onto white paper.
    pub fn to_luma_on_white(&self) -> GrayImage {
        let rgba = self.image.to_rgba8();
        GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let over_white = |c: u8| -> u32 {
                (u32::from(c) * u32::from(a) + 255 * (255 - u32::from(a))) / 255
            };
            let luma = (299 * over_white(r) + 587 * over_white(g) + 114 * over_white(b)) / 1000;
            Luma([luma.min(255) as u8])
        })
    }

    // -- Output ---------------------------------------------------------------

    /// Binarize using a darkness percentage (see [`MonoBitmap::from_luma`]).
    pub fn to_bitmap(&self, threshold: u8) -> MonoBitmap {
        MonoBitmap::from_luma(&self.to_luma_on_white(), threshold)
    }
}

fn orientation_differs(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> bool {
    src_w != src_h && dst_w != dst_h && (src_w > src_h) != (dst_w > dst_h)
}
