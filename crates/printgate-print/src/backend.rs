// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print backend contract and the closed set of backend kinds.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use printgate_core::config::AppConfig;
use printgate_core::error::Result;
use printgate_core::types::{MediaSize, PrintFile, PrintJob, PrinterDetails, PrinterSelector, SizeUnit};

use crate::brother_ql::BrotherQlBackend;
use crate::cups::CupsBackend;

/// Everything about a job except the printer and the documents.
///
/// Options and media have already been normalized against the printer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintTicket {
    pub job_title: String,
    pub is_async: bool,
    pub media_size: Option<MediaSize>,
    pub options: BTreeMap<String, String>,
}

/// One printing technology: enumerate printers, submit jobs, look jobs up.
#[async_trait]
pub trait PrintBackend: Send + Sync {
    /// Stable name used in selectors and composite printer ids.
    fn system_name(&self) -> &'static str;

    /// Whether the runtime dependency (scheduler, libusb) is reachable.
    /// Never fails; problems just mean `false`.
    async fn is_supported(&self) -> bool;

    /// Printers matching `selector`. Entries that cannot be described are
    /// skipped with a warning rather than failing the whole listing.
    async fn get_printers(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>>;

    async fn print(
        &self,
        printer: &PrinterDetails,
        files: &[PrintFile],
        ticket: &PrintTicket,
    ) -> Result<PrintJob>;

    /// `None` when this backend does not know the id.
    async fn get_job(&self, job_id: &str) -> Result<Option<PrintJob>>;

    /// Encode an undeclared media size for submission, or `None` when the
    /// backend only prints fixed geometries.
    fn custom_media_size(&self, name: &str, width: f64, height: f64, units: SizeUnit)
    -> Option<MediaSize>;
}

/// The registered backends, most full-featured first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Cups,
    BrotherQl,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Cups, BackendKind::BrotherQl];

    pub fn system_name(self) -> &'static str {
        match self {
            Self::Cups => "cups",
            Self::BrotherQl => "brother_ql",
        }
    }

    /// Names of every registered kind, in preference order.
    pub fn system_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.system_name()).collect()
    }

    pub fn from_system_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.system_name() == name)
    }

    /// Construct the backend. No I/O happens here; probing is left to
    /// [`PrintBackend::is_supported`].
    pub fn build(self, config: &AppConfig) -> Result<Arc<dyn PrintBackend>> {
        Ok(match self {
            Self::Cups => Arc::new(CupsBackend::new(config)?),
            Self::BrotherQl => Arc::new(BrotherQlBackend::new(config)),
        })
    }
}
