// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The enabled print systems, and printer lookup across them.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use printgate_core::config::AppConfig;
use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{PrinterDetails, PrinterSelector};

use crate::backend::{BackendKind, PrintBackend};

/// Backends that passed their startup support check, in preference order.
///
/// Built once at startup and never changed afterwards.
#[derive(Clone)]
pub struct PrintSystemProvider {
    backends: Vec<Arc<dyn PrintBackend>>,
}

impl PrintSystemProvider {
    /// Build every configured backend and keep the ones that work here.
    pub async fn detect(config: &AppConfig) -> Result<Self> {
        let mut candidates = Vec::new();
        for kind in BackendKind::ALL {
            let name = kind.system_name();
            if !config.print_system_enabled(name) {
                info!(system = name, "Print system disabled by configuration");
                continue;
            }
            candidates.push(kind.build(config)?);
        }
        Ok(Self::keep_supported(candidates).await)
    }

    /// Keep the candidates that report themselves usable, in order.
    pub async fn keep_supported(candidates: Vec<Arc<dyn PrintBackend>>) -> Self {
        let mut backends = Vec::new();
        for backend in candidates {
            let name = backend.system_name();
            if backend.is_supported().await {
                info!(system = name, "Print system enabled");
                backends.push(backend);
            } else {
                info!(system = name, "Print system not supported on this machine");
            }
        }
        Self { backends }
    }

    pub fn from_backends(backends: Vec<Arc<dyn PrintBackend>>) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &[Arc<dyn PrintBackend>] {
        &self.backends
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.system_name()).collect()
    }

    /// Every matching printer, grouped by backend in preference order.
    pub async fn list(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>> {
        let mut printers = Vec::new();
        for backend in &self.backends {
            printers.extend(backend.get_printers(selector).await?);
        }
        Ok(printers)
    }

    /// The first matching printer and the backend that owns it.
    #[instrument(skip(self))]
    pub async fn resolve(&self, selector: &PrinterSelector) -> Result<(PrinterDetails, Arc<dyn PrintBackend>)> {
        for backend in &self.backends {
            if let Some(printer) = backend.get_printers(selector).await?.into_iter().next() {
                debug!(printer = %printer.id(), "Printer resolved");
                return Ok((printer, Arc::clone(backend)));
            }
        }
        if selector.is_empty() {
            Err(PrintgateError::NoPrinter)
        } else {
            Err(PrintgateError::NoMatchingPrinter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, label_printer, office_printer};

    fn both() -> PrintSystemProvider {
        PrintSystemProvider::from_backends(vec![
            Arc::new(FakeBackend::new("cups").with_printer(office_printer())),
            Arc::new(FakeBackend::new("brother_ql").with_printer(label_printer())),
        ])
    }

    #[tokio::test]
    async fn empty_selector_takes_preferred_backend() {
        let (printer, backend) = both().resolve(&PrinterSelector::default()).await.unwrap();
        assert_eq!(printer.name, "Office Laser");
        assert_eq!(backend.system_name(), "cups");
    }

    #[tokio::test]
    async fn selector_can_reach_later_backend() {
        let selector = PrinterSelector {
            model_prefix: "ql-".into(),
            ..PrinterSelector::default()
        };
        let (printer, backend) = both().resolve(&selector).await.unwrap();
        assert_eq!(printer.model, "QL-1050");
        assert_eq!(backend.system_name(), "brother_ql");
    }

    #[tokio::test]
    async fn nothing_attached_is_no_printer() {
        let provider = PrintSystemProvider::from_backends(vec![]);
        let err = provider.resolve(&PrinterSelector::default()).await.err().unwrap();
        assert!(matches!(err, PrintgateError::NoPrinter));
        assert_eq!(err.to_string(), "No printer is attached");
    }

    #[tokio::test]
    async fn unmatched_selector_is_no_matching_printer() {
        let selector = PrinterSelector {
            name: Some("Kitchen".into()),
            ..PrinterSelector::default()
        };
        let err = both().resolve(&selector).await.err().unwrap();
        assert!(matches!(err, PrintgateError::NoMatchingPrinter));
    }

    #[tokio::test]
    async fn list_spans_backends_in_order() {
        let printers = both().list(&PrinterSelector::default()).await.unwrap();
        let ids: Vec<String> = printers.iter().map(PrinterDetails::id).collect();
        assert_eq!(ids, vec!["cups:Office_Laser", "brother_ql:usb://0x04f9:0x2020/A1B2C3"]);
    }

    #[tokio::test]
    async fn unsupported_backends_are_left_out() {
        let provider = PrintSystemProvider::keep_supported(vec![
            Arc::new(FakeBackend::new("cups").with_printer(office_printer()).unsupported()),
            Arc::new(FakeBackend::new("brother_ql").with_printer(label_printer())),
        ])
        .await;
        assert_eq!(provider.system_names(), vec!["brother_ql"]);

        let (printer, _) = provider.resolve(&PrinterSelector::default()).await.unwrap();
        assert_eq!(printer.print_system, "brother_ql");
    }

    #[tokio::test]
    async fn disabled_systems_are_not_built() {
        let config = AppConfig {
            print_systems: vec![],
            ..AppConfig::default()
        };
        let provider = PrintSystemProvider::detect(&config).await.unwrap();
        assert!(provider.backends().is_empty());
    }
}
