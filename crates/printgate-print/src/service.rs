// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print service: the three operations the gateway exposes, independent of
// any transport.

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{MediaSizeRequest, PrintFile, PrintJob, PrinterDetails, PrinterSelector};
use printgate_document::ensure_supported;

use crate::backend::{BackendKind, PrintTicket};
use crate::normalize::{normalize, validate_media_request, validate_options};
use crate::provider::PrintSystemProvider;

/// A decoded print request. Files are already in memory.
#[derive(Debug, Clone, Default)]
pub struct PrintRequest {
    pub job_title: String,
    pub options: BTreeMap<String, String>,
    pub is_async: bool,
    pub files: Vec<PrintFile>,
    pub selector: PrinterSelector,
    pub media: MediaSizeRequest,
}

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedJob {
    pub job: PrintJob,
    /// Capability mismatches that were corrected rather than rejected.
    pub warnings: Vec<String>,
    pub print_system: &'static str,
}

#[derive(Clone)]
pub struct PrintService {
    provider: PrintSystemProvider,
}

impl PrintService {
    pub fn new(provider: PrintSystemProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &PrintSystemProvider {
        &self.provider
    }

    pub async fn list_printers(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>> {
        selector.validate(&BackendKind::system_names())?;
        self.provider.list(selector).await
    }

    /// Validate, resolve a printer, fit the request to it, and print.
    ///
    /// Nothing reaches a backend until the whole request has validated.
    #[instrument(skip(self, request), fields(files = request.files.len(), is_async = request.is_async))]
    pub async fn submit_print(&self, request: PrintRequest) -> Result<SubmittedJob> {
        if request.files.is_empty() {
            return Err(PrintgateError::InvalidRequest("Must specify a list of files".into()));
        }
        ensure_supported(&request.files)?;
        validate_options(&request.options)?;
        let media = validate_media_request(&request.media)?;
        request.selector.validate(&BackendKind::system_names())?;

        let (printer, backend) = self.provider.resolve(&request.selector).await?;
        let normalized = normalize(backend.as_ref(), &printer, &request.options, media.as_ref());
        for warning in &normalized.warnings {
            warn!(printer = %printer.name, "{warning}");
        }

        let digests: Vec<String> = request.files.iter().map(PrintFile::digest).collect();
        info!(
            printer = %printer.name,
            system = backend.system_name(),
            files = ?digests,
            "Printing {} file(s)",
            request.files.len()
        );

        let ticket = PrintTicket {
            job_title: request.job_title,
            is_async: request.is_async,
            media_size: normalized.media_size,
            options: normalized.options,
        };
        let job = backend.print(&printer, &request.files, &ticket).await?;
        info!(
            job_id = %job.job_id,
            state = job.job_state.as_str(),
            mode = if request.is_async { "async" } else { "synchronous" },
            "Print job submitted"
        );

        Ok(SubmittedJob {
            job,
            warnings: normalized.warnings,
            print_system: backend.system_name(),
        })
    }

    /// Ask every backend about `job_id`. Exactly one may answer.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<PrintJob>> {
        let mut found = Vec::new();
        for backend in self.provider.backends() {
            if let Some(job) = backend.get_job(job_id).await? {
                found.push(job);
            }
        }
        if found.len() > 1 {
            return Err(PrintgateError::Internal(
                "Multiple print systems returned job results".into(),
            ));
        }
        Ok(found.pop())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use printgate_core::types::JobState;

    use super::*;
    use crate::backend::PrintBackend;
    use crate::testing::{FakeBackend, label_printer, office_printer};

    fn pdf() -> PrintFile {
        PrintFile::new("application/pdf", b"%PDF-1.4".to_vec())
    }

    fn request(options: &[(&str, &str)]) -> PrintRequest {
        PrintRequest {
            job_title: "Shipping label".into(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: vec![pdf()],
            ..PrintRequest::default()
        }
    }

    fn office() -> (PrintService, Arc<FakeBackend>) {
        let cups = Arc::new(FakeBackend::new("cups").with_printer(office_printer()));
        let backends: Vec<Arc<dyn PrintBackend>> = vec![cups.clone()];
        (PrintService::new(PrintSystemProvider::from_backends(backends)), cups)
    }

    #[tokio::test]
    async fn no_backends_means_no_printer() {
        let service = PrintService::new(PrintSystemProvider::from_backends(vec![]));
        let err = service.submit_print(request(&[])).await.unwrap_err();
        assert_eq!(err.to_string(), "No printer is attached");
    }

    #[tokio::test]
    async fn unknown_options_are_dropped_with_a_warning() {
        let (service, cups) = office();
        let submitted = service
            .submit_print(request(&[("copies", "3"), ("bogus-key", "x")]))
            .await
            .unwrap();
        assert_eq!(submitted.warnings, vec!["Printer does not support option: 'bogus-key'"]);
        assert_eq!(submitted.print_system, "cups");
        assert_eq!(submitted.job.job_state, JobState::Completed);

        let submissions = cups.submissions.lock().unwrap();
        let sent: Vec<(&str, &str)> = submissions[0]
            .ticket
            .options
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(sent, vec![("copies", "3")]);
        assert_eq!(submissions[0].ticket.job_title, "Shipping label");
        assert_eq!(submissions[0].printer, "Office_Laser");
        assert_eq!(submissions[0].files, 1);
    }

    #[tokio::test]
    async fn declared_media_name_wins_over_dimensions() {
        let (service, cups) = office();
        let mut req = request(&[]);
        req.media = MediaSizeRequest {
            name: Some("letter".into()),
            width: Some(8.5),
            height: Some(14.0),
            units: Some("inches".into()),
        };
        let submitted = service.submit_print(req).await.unwrap();
        assert_eq!(submitted.warnings.len(), 1);

        let submissions = cups.submissions.lock().unwrap();
        let media = submissions[0].ticket.media_size.as_ref().unwrap();
        assert_eq!(media.full_identifier, "na_letter_8.5x11in");
        assert_eq!((media.width, media.height), (8.5, 11.0));
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_a_backend() {
        let (service, cups) = office();

        let mut req = request(&[]);
        req.files = vec![PrintFile::new("text/plain", b"x".to_vec())];
        assert!(matches!(
            service.submit_print(req).await.unwrap_err(),
            PrintgateError::UnsupportedDocument(_)
        ));

        let req = request(&[("", "x")]);
        assert!(matches!(
            service.submit_print(req).await.unwrap_err(),
            PrintgateError::InvalidRequest(_)
        ));

        let mut req = request(&[]);
        req.selector.print_system = Some("lpd".into());
        assert!(matches!(
            service.submit_print(req).await.unwrap_err(),
            PrintgateError::InvalidRequest(_)
        ));

        let mut req = request(&[]);
        req.files.clear();
        assert_eq!(
            service.submit_print(req).await.unwrap_err().to_string(),
            "Must specify a list of files"
        );

        assert!(cups.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn selector_routes_to_label_printer() {
        let labels = Arc::new(FakeBackend::new("brother_ql").with_printer(label_printer()));
        let backends: Vec<Arc<dyn PrintBackend>> = vec![
            Arc::new(FakeBackend::new("cups").with_printer(office_printer())),
            labels.clone(),
        ];
        let service = PrintService::new(PrintSystemProvider::from_backends(backends));
        let mut req = request(&[("copies", "2")]);
        req.selector.print_system = Some("brother_ql".into());
        req.is_async = true;

        let submitted = service.submit_print(req).await.unwrap();
        assert_eq!(submitted.print_system, "brother_ql");
        assert_eq!(submitted.job.job_state, JobState::Pending);
        assert_eq!(submitted.warnings, vec!["Printer does not support option: 'copies'"]);
        let submissions = labels.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].printer, "usb://0x04f9:0x2020/A1B2C3");
    }

    #[tokio::test]
    async fn job_lookup_is_unique_across_backends() {
        let job = PrintJob::new("7", JobState::Processing, vec![]);
        let one: Vec<Arc<dyn PrintBackend>> = vec![
            Arc::new(FakeBackend::new("cups").with_job(job.clone())),
            Arc::new(FakeBackend::new("brother_ql")),
        ];
        let service = PrintService::new(PrintSystemProvider::from_backends(one));
        assert_eq!(service.get_job("7").await.unwrap(), Some(job.clone()));
        assert_eq!(service.get_job("8").await.unwrap(), None);

        let two: Vec<Arc<dyn PrintBackend>> = vec![
            Arc::new(FakeBackend::new("cups").with_job(job.clone())),
            Arc::new(FakeBackend::new("brother_ql").with_job(job)),
        ];
        let service = PrintService::new(PrintSystemProvider::from_backends(two));
        assert!(matches!(
            service.get_job("7").await.unwrap_err(),
            PrintgateError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn listing_rejects_unknown_print_system() {
        let (service, _) = office();
        let selector = PrinterSelector {
            print_system: Some("lpd".into()),
            ..PrinterSelector::default()
        };
        assert!(service.list_printers(&selector).await.is_err());
        assert_eq!(
            service
                .list_printers(&PrinterSelector::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
