// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Brother QL backend: USB label printers driven with the raster protocol.

pub mod labels;
pub mod raster;
pub mod status;
pub mod usb;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use printgate_core::config::AppConfig;
use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{
    JobState, MediaSize, PrintFile, PrintJob, PrinterDetails, PrinterSelector, PrinterState, SizeUnit,
};
use printgate_document::{DocumentKind, ImageProcessor, MonoBitmap, PdfRasterizer, ensure_supported};

use crate::backend::{BackendKind, PrintBackend, PrintTicket};

use self::labels::{Label, find_label, find_model, labels_for};
use self::status::{PrinterStatus, STATUS_FRAME_LEN, StatusType};
use self::usb::{LabelTransport, RusbBus, UsbBus, UsbPrinter};

/// How long a synchronous job waits for the printer to report back.
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const STATUS_POLL: Duration = Duration::from_millis(5);

/// Print images and PDFs on QL label printers attached over USB.
///
/// Jobs are not tracked after submission. A synchronous job reports the
/// outcome the printer sent back; an asynchronous one is pending forever.
pub struct BrotherQlBackend {
    bus: Arc<dyn UsbBus>,
    /// One transfer at a time across every attached printer.
    device_lock: Arc<Mutex<()>>,
    rasterizer: PdfRasterizer,
    threshold: u8,
    status_timeout: Duration,
}

impl BrotherQlBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_bus(Arc::new(RusbBus), config)
    }

    pub fn with_bus(bus: Arc<dyn UsbBus>, config: &AppConfig) -> Self {
        Self {
            bus,
            device_lock: Arc::new(Mutex::new(())),
            rasterizer: PdfRasterizer::new(config.pdf_rasterizer.clone()),
            threshold: config.label_threshold,
            status_timeout: STATUS_TIMEOUT,
        }
    }

    fn describe(&self, printer: &UsbPrinter) -> Option<PrinterDetails> {
        let model = find_model(&printer.product)?;
        let media_sizes: Vec<MediaSize> = labels_for(model.name).filter_map(Label::media_size).collect();
        let default_media_size = media_sizes.first()?.name.clone();
        Some(PrinterDetails {
            name: printer.display_name(),
            model: printer.product.clone(),
            identifier: printer.identifier(),
            printer_state: PrinterState::Idle,
            state_reasons: Vec::new(),
            print_system: self.system_name().to_string(),
            default_media_size,
            media_sizes,
            supported_options: Vec::new(),
        })
    }
}

#[async_trait]
impl PrintBackend for BrotherQlBackend {
    fn system_name(&self) -> &'static str {
        BackendKind::BrotherQl.system_name()
    }

    async fn is_supported(&self) -> bool {
        let bus = Arc::clone(&self.bus);
        tokio::task::spawn_blocking(move || bus.probe())
            .await
            .unwrap_or(false)
    }

    #[instrument(skip(self, selector))]
    async fn get_printers(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>> {
        if let Some(system) = &selector.print_system
            && system != self.system_name()
        {
            return Ok(Vec::new());
        }
        let bus = Arc::clone(&self.bus);
        let attached = tokio::task::spawn_blocking(move || bus.list())
            .await
            .map_err(|err| PrintgateError::Internal(format!("USB enumeration task failed: {err}")))??;

        let printers: Vec<PrinterDetails> = attached
            .iter()
            .filter_map(|printer| {
                let details = self.describe(printer);
                if details.is_none() {
                    warn!(product = %printer.product, "Skipping QL model without raster geometry");
                }
                details
            })
            .filter(|printer| selector.matches_name_and_model(&printer.name, &printer.model))
            .collect();
        debug!(count = printers.len(), "Brother QL printers listed");
        Ok(printers)
    }

    #[instrument(skip(self, printer, files, ticket), fields(printer = %printer.identifier, files = files.len()))]
    async fn print(&self, printer: &PrinterDetails, files: &[PrintFile], ticket: &PrintTicket) -> Result<PrintJob> {
        let kinds = ensure_supported(files)?;
        let model = find_model(&printer.model)
            .ok_or_else(|| PrintgateError::InvalidRequest(format!("Unsupported label printer model: {}", printer.model)))?;
        let label = match &ticket.media_size {
            Some(media) => find_label(model.name, media).ok_or_else(|| {
                PrintgateError::InvalidRequest(format!(
                    "Label size '{}' is not supported by {}",
                    media.name, model.name
                ))
            })?,
            None => labels_for(model.name)
                .next()
                .ok_or_else(|| PrintgateError::Internal(format!("no label stock for {}", model.name)))?,
        };

        let files = files.to_vec();
        let rasterizer = self.rasterizer.clone();
        let threshold = self.threshold;
        let (stream, pages) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, usize)> {
            let pages = render_pages(&files, &kinds, label, &rasterizer, threshold)?;
            Ok((raster::encode(&pages, label, model)?, pages.len()))
        })
        .await
        .map_err(|err| PrintgateError::Internal(format!("label rendering task failed: {err}")))??;
        info!(label = label.name, pages, bytes = stream.len(), "Label job rendered");

        let bus = Arc::clone(&self.bus);
        let lock = Arc::clone(&self.device_lock);
        let identifier = printer.identifier.clone();
        if ticket.is_async {
            tokio::task::spawn_blocking(move || {
                if let Err(err) = transfer(bus.as_ref(), &lock, &identifier, &stream, pages, None) {
                    error!(printer = %identifier, error = %err, "Detached label job failed");
                }
            });
            return Ok(PrintJob::untracked(JobState::Pending, Vec::new()));
        }

        let timeout = self.status_timeout;
        tokio::task::spawn_blocking(move || {
            transfer(bus.as_ref(), &lock, &identifier, &stream, pages, Some(timeout))
        })
        .await
        .map_err(|err| PrintgateError::Internal(format!("label transfer task failed: {err}")))?
    }

    async fn get_job(&self, _job_id: &str) -> Result<Option<PrintJob>> {
        Ok(None)
    }

    fn custom_media_size(&self, _name: &str, _width: f64, _height: f64, _units: SizeUnit) -> Option<MediaSize> {
        None
    }
}

/// Turn every file into label-sized bitmaps, in order. PDFs contribute one
/// bitmap per page.
fn render_pages(
    files: &[PrintFile],
    kinds: &[DocumentKind],
    label: &Label,
    rasterizer: &PdfRasterizer,
    threshold: u8,
) -> Result<Vec<MonoBitmap>> {
    let (width, height) = label.dots_printable;
    let mut pages = Vec::new();
    for (file, kind) in files.iter().zip(kinds) {
        match kind {
            DocumentKind::Pdf => {
                for image in rasterizer.rasterize(&file.content, width, height)? {
                    pages.push(ImageProcessor::from_dynamic(image).fit(width, height).to_bitmap(threshold));
                }
            }
            DocumentKind::Image => {
                pages.push(ImageProcessor::from_bytes(&file.content)?.fit(width, height).to_bitmap(threshold));
            }
        }
    }
    Ok(pages)
}

/// Send a rendered job. With `wait`, block until the printer reports the
/// outcome or the timeout passes.
fn transfer(
    bus: &dyn UsbBus,
    lock: &Mutex<()>,
    identifier: &str,
    stream: &[u8],
    pages: usize,
    wait: Option<Duration>,
) -> Result<PrintJob> {
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let mut transport = bus.open(identifier)?;
    transport.write_all(stream)?;
    debug!(bytes = stream.len(), "Raster data written");
    match wait {
        None => Ok(PrintJob::untracked(JobState::Pending, Vec::new())),
        Some(timeout) => await_completion(transport.as_mut(), pages, timeout),
    }
}

/// Read status frames until every page is printed and the printer waits for
/// the next job. An error frame ends the wait early.
fn await_completion(transport: &mut dyn LabelTransport, pages: usize, timeout: Duration) -> Result<PrintJob> {
    let started = Instant::now();
    let mut frame = [0u8; STATUS_FRAME_LEN];
    let mut completed = 0usize;
    let mut last: Option<PrinterStatus> = None;

    while started.elapsed() < timeout {
        let read = transport.read(&mut frame)?;
        if read == 0 {
            std::thread::sleep(STATUS_POLL);
            continue;
        }
        let Some(status) = PrinterStatus::parse(&frame[..read]) else {
            debug!(read, "Ignoring partial status frame");
            continue;
        };
        if !status.errors.is_empty() {
            warn!(errors = ?status.errors, "Printer reported errors");
        }
        let failed = status.status_type == StatusType::ErrorOccurred;
        if status.status_type == StatusType::PrintingCompleted {
            completed += 1;
        }
        let ready = status.is_waiting_to_receive();
        last = Some(status);
        if failed {
            break;
        }
        if completed >= pages && ready {
            info!(pages, "Label job printed");
            return Ok(PrintJob::untracked(JobState::Completed, Vec::new()));
        }
    }

    if completed >= pages && last.as_ref().is_none_or(|status| status.errors.is_empty()) {
        info!(pages, "Label job printed, printer did not report ready");
        return Ok(PrintJob::untracked(JobState::Completed, Vec::new()));
    }
    let reasons = last.map(|status| status.errors).unwrap_or_default();
    warn!(completed, pages, reasons = ?reasons, "Label job did not print");
    Ok(PrintJob::untracked(JobState::Aborted, reasons))
}
