// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printgate-document — Turning uploaded documents into something a printer
// can take.
//
// Classifies uploads by content type, rasterizes PDF pages through poppler,
// and prepares 1-bit bitmaps sized for fixed-geometry label printers.

pub mod bitmap;
pub mod content;
pub mod image;
pub mod pdf;

pub use bitmap::MonoBitmap;
pub use content::{DocumentKind, ensure_supported};
pub use self::image::ImageProcessor;
pub use pdf::PdfRasterizer;
