// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printgate.

use thiserror::Error;

/// Top-level error type for all printgate operations.
#[derive(Debug, Error)]
pub enum PrintgateError {
    // -- Client input --
    #[error("{0}")]
    InvalidRequest(String),

    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("No printer is attached")]
    NoPrinter,

    #[error("No matching printer is attached")]
    NoMatchingPrinter,

    #[error("Error fetching file: {0}")]
    Fetch(String),

    // -- Origin allowlist --
    #[error("Origin header cannot be parsed: {0:?}")]
    InvalidOrigin(String),

    #[error("Visit {approve_url} to allow this domain to use the printer.")]
    OriginNotAllowed { origin: String, approve_url: String },

    // -- Lookups --
    #[error("Unrecognized job ID: {0}")]
    JobNotFound(String),

    // -- Backends --
    #[error("print spooler request failed: {0}")]
    Spooler(String),

    #[error("USB transfer failed: {0}")]
    Usb(String),

    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("{0}")]
    Internal(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which side of the request/response boundary an error belongs to.
///
/// The HTTP layer turns this into a status code; nothing else should need to
/// inspect individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something we will never accept. Not retried.
    BadRequest,
    /// The request was well-formed but blocked by the origin allowlist.
    Forbidden,
    /// The thing asked about does not exist (or no longer exists).
    NotFound,
    /// A backend or local failure. The caller may retry the whole request.
    Internal,
}

impl PrintgateError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedDocument(_)
            | Self::NoPrinter
            | Self::NoMatchingPrinter
            | Self::Fetch(_)
            | Self::InvalidOrigin(_) => ErrorKind::BadRequest,

            Self::OriginNotAllowed { .. } => ErrorKind::Forbidden,

            Self::JobNotFound(_) => ErrorKind::NotFound,

            Self::Spooler(_)
            | Self::Usb(_)
            | Self::Conversion(_)
            | Self::Internal(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Short title used in JSON error bodies.
    pub fn title(&self) -> &'static str {
        match self.kind() {
            ErrorKind::BadRequest => "400 Bad Request",
            ErrorKind::Forbidden => "403 Forbidden",
            ErrorKind::NotFound => "404 Not Found",
            ErrorKind::Internal => "500 Internal Server Error",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintgateError>;
