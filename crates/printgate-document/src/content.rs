// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-type classification for uploaded documents.

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::PrintFile;

/// The document families the gateway knows how to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Classify a MIME content type. Parameters (`; charset=...`) are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = essence(content_type);
        if essence == "application/pdf" {
            Some(Self::Pdf)
        } else if essence.starts_with("image/") && essence.len() > "image/".len() {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// The bare MIME type to announce as a spooler's `document-format`.
    pub fn mime_type(self, content_type: &str) -> String {
        match self {
            Self::Pdf => "application/pdf".to_string(),
            Self::Image => essence(content_type),
        }
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check every file up front so that nothing reaches a printer unless the
/// whole batch is printable.
pub fn ensure_supported(files: &[PrintFile]) -> Result<Vec<DocumentKind>> {
    files
        .iter()
        .map(|file| {
            DocumentKind::from_content_type(&file.content_type).ok_or_else(|| {
                PrintgateError::UnsupportedDocument(format!(
                    "Unknown file type: {}",
                    file.content_type
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pdf_and_images() {
        assert_eq!(
            DocumentKind::from_content_type("application/pdf"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_content_type("Application/PDF; name=label.pdf"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_content_type("image/png"),
            Some(DocumentKind::Image)
        );
        assert_eq!(DocumentKind::from_content_type("image/"), None);
        assert_eq!(DocumentKind::from_content_type("text/plain"), None);
    }

    #[test]
    fn mime_type_drops_parameters() {
        assert_eq!(
            DocumentKind::Pdf.mime_type("Application/PDF; name=label.pdf"),
            "application/pdf"
        );
        assert_eq!(DocumentKind::Image.mime_type("IMAGE/PNG ; q=1"), "image/png");
    }

    #[test]
    fn one_bad_file_rejects_the_batch() {
        let files = vec![
            PrintFile::new("application/pdf", b"%PDF-1.4".to_vec()),
            PrintFile::new("application/msword", vec![0xd0, 0xcf]),
        ];
        let err = ensure_supported(&files).unwrap_err();
        assert!(matches!(err, PrintgateError::UnsupportedDocument(_)));
        assert!(err.to_string().contains("application/msword"));
    }
}
