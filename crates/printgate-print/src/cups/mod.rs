// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS backend: printers, capabilities, and jobs from the local scheduler.

pub mod attributes;
pub mod client;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use printgate_core::config::AppConfig;
use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{MediaSize, PrintFile, PrintJob, PrinterDetails, PrinterSelector, SizeUnit};
use printgate_document::ensure_supported;

use crate::backend::{BackendKind, PrintBackend, PrintTicket};
use crate::poll::{PollPolicy, wait_for_job};

use self::attributes::{Capabilities, JobValue, QueueSummary, encode_option, job_from_attributes};
use self::client::{CupsConnection, IppExchange, JobAttribute};

/// Print through a CUPS scheduler over IPP.
///
/// The connection is owned here and every exchange goes through its lock.
/// A submission holds the lock until its documents are sent; polling takes it
/// per request, so a long poll never blocks other callers.
pub struct CupsBackend {
    connection: Mutex<Box<dyn IppExchange>>,
    poll_policy: PollPolicy,
}

impl CupsBackend {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let connection = CupsConnection::new(&config.effective_cups_uri())?;
        Ok(Self::with_exchange(Box::new(connection), config))
    }

    pub fn with_exchange(exchange: Box<dyn IppExchange>, config: &AppConfig) -> Self {
        Self {
            connection: Mutex::new(exchange),
            poll_policy: PollPolicy::from_config(config),
        }
    }

    async fn describe(&self, summary: QueueSummary) -> Result<PrinterDetails> {
        let attrs = self
            .connection
            .lock()
            .await
            .get_printer_attributes(&summary.queue)
            .await?;
        let capabilities = Capabilities::from_attributes(&attrs);
        Ok(PrinterDetails {
            name: summary.name,
            model: summary.model,
            identifier: summary.queue,
            printer_state: summary.state,
            state_reasons: summary.state_reasons,
            print_system: self.system_name().to_string(),
            default_media_size: capabilities.default_media_size,
            media_sizes: capabilities.media_sizes,
            supported_options: capabilities.options,
        })
    }
}

/// Job attributes for a submission, in a stable order.
///
/// Pages are scaled to the media unless the caller chose otherwise.
fn job_attributes(ticket: &PrintTicket) -> Vec<JobAttribute> {
    let mut attributes: Vec<JobAttribute> = ticket
        .options
        .iter()
        .map(|(name, value)| JobAttribute {
            name: name.clone(),
            values: encode_option(name, value),
        })
        .filter(|attribute| !attribute.values.is_empty())
        .collect();
    if !ticket.options.contains_key("fit-to-page") {
        attributes.push(JobAttribute {
            name: "fit-to-page".into(),
            values: vec![JobValue::Boolean(true)],
        });
    }
    if let Some(media) = &ticket.media_size {
        attributes.push(JobAttribute {
            name: "media".into(),
            values: vec![JobValue::Keyword(media.full_identifier.clone())],
        });
    }
    attributes
}

#[async_trait]
impl PrintBackend for CupsBackend {
    fn system_name(&self) -> &'static str {
        BackendKind::Cups.system_name()
    }

    async fn is_supported(&self) -> bool {
        if !cfg!(unix) {
            return false;
        }
        let connection = self.connection.lock().await;
        match connection.get_printers().await {
            Ok(_) => true,
            Err(err) => {
                info!(base = connection.base(), error = %err, "CUPS scheduler not reachable");
                false
            }
        }
    }

    #[instrument(skip(self, selector))]
    async fn get_printers(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>> {
        if let Some(system) = &selector.print_system
            && system != self.system_name()
        {
            return Ok(Vec::new());
        }
        let queues = self.connection.lock().await.get_printers().await?;

        let mut printers = Vec::new();
        for attrs in &queues {
            let Some(summary) = QueueSummary::from_attributes(attrs) else {
                warn!("Skipping printer entry without name or state");
                continue;
            };
            if !summary.is_usable() || !selector.matches_name_and_model(&summary.name, &summary.model) {
                continue;
            }
            let queue = summary.queue.clone();
            match self.describe(summary).await {
                Ok(printer) => printers.push(printer),
                Err(err) => warn!(queue = %queue, error = %err, "Skipping printer with unreadable attributes"),
            }
        }
        debug!(count = printers.len(), "CUPS printers listed");
        Ok(printers)
    }

    #[instrument(skip(self, printer, files, ticket), fields(queue = %printer.identifier, files = files.len()))]
    async fn print(&self, printer: &PrinterDetails, files: &[PrintFile], ticket: &PrintTicket) -> Result<PrintJob> {
        let formats: Vec<String> = ensure_supported(files)?
            .into_iter()
            .zip(files)
            .map(|(kind, file)| kind.mime_type(&file.content_type))
            .collect();
        let attributes = job_attributes(ticket);
        let queue = printer.identifier.as_str();

        let job_id = match files {
            [] => {
                return Err(PrintgateError::InvalidRequest("Must specify a list of files".into()));
            }
            [file] => {
                self.connection
                    .lock()
                    .await
                    .print_job(queue, &ticket.job_title, file, &formats[0], &attributes)
                    .await?
            }
            many => {
                let connection = self.connection.lock().await;
                let job_id = connection.create_job(queue, &ticket.job_title, &attributes).await?;
                for (index, (file, format)) in many.iter().zip(&formats).enumerate() {
                    let last = index + 1 == many.len();
                    if let Err(err) = connection.send_document(queue, job_id, file, format, last).await {
                        // A job missing its last document would sit in the queue forever.
                        match connection.cancel_job(queue, job_id).await {
                            Ok(()) => warn!(job_id, error = %err, "Cancelled partially sent job"),
                            Err(cancel_err) => {
                                warn!(job_id, error = %cancel_err, "Could not cancel partially sent job")
                            }
                        }
                        return Err(err);
                    }
                }
                job_id
            }
        };
        info!(job_id, "Submitted CUPS job");

        let job_id = job_id.to_string();
        wait_for_job(&job_id, ticket.is_async, &self.poll_policy, || self.get_job(&job_id)).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<PrintJob>> {
        if !job_id.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(None);
        }
        let Ok(id) = job_id.parse::<i32>() else {
            return Ok(None);
        };
        let attrs = self.connection.lock().await.get_job_attributes(id).await?;
        attrs.map(|attrs| job_from_attributes(id, &attrs)).transpose()
    }

    fn custom_media_size(&self, name: &str, width: f64, height: f64, units: SizeUnit) -> Option<MediaSize> {
        attributes::custom_media_size(name, width, height, units)
    }
}
