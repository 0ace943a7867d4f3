// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF validation (lopdf) and page rasterization through poppler's pdftoppm.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use lopdf::Document;
use printgate_core::error::{PrintgateError, Result};
use tracing::{debug, info, instrument, warn};

/// Renders PDF pages to images of a fixed pixel size.
///
/// Runs an external rasterizer, so call it from a blocking context.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    program: String,
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PdfRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parse the document and return its page count.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn validate(data: &[u8]) -> Result<usize> {
        let document = Document::load_mem(data).map_err(|err| {
            PrintgateError::UnsupportedDocument(format!("failed to load PDF: {err}"))
        })?;
        let pages = document.get_pages().len();
        if pages == 0 {
            return Err(PrintgateError::UnsupportedDocument(
                "PDF has no pages".into(),
            ));
        }
        debug!(pages, "PDF validated");
        Ok(pages)
    }

    /// Render every page at exactly `width` x `height` pixels, in page order.
    #[instrument(skip(self, data), fields(program = %self.program, bytes_len = data.len()))]
    pub fn rasterize(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<DynamicImage>> {
        let expected_pages = Self::validate(data)?;

        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.pdf");
        std::fs::write(&input, data)?;
        let prefix = workdir.path().join("page");

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-scale-to-x")
            .arg(width.to_string())
            .arg("-scale-to-y")
            .arg(height.to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|err| {
                PrintgateError::Conversion(format!("could not run {}: {err}", self.program))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "PDF rasterizer failed");
            return Err(PrintgateError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let pages = rendered_pages(workdir.path())?;
        if pages.len() != expected_pages {
            warn!(
                expected_pages,
                rendered = pages.len(),
                "Rasterizer produced an unexpected page count"
            );
        }
        let images = pages
            .iter()
            .map(|path| {
                image::open(path).map_err(|err| {
                    PrintgateError::Conversion(format!(
                        "failed to read rendered page {}: {err}",
                        path.display()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(pages = images.len(), width, height, "PDF rasterized");
        Ok(images)
    }
}

/// `page-1.png`, `page-2.png`, ... in page order.
///
/// pdftoppm zero-pads the number to the width of the page count, so sorting
/// by the parsed number is safer than sorting file names.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}
