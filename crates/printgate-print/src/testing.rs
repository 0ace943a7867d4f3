// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory backend and printer fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use printgate_core::error::Result;
use printgate_core::types::{
    JobState, MediaSize, PrintFile, PrintJob, PrintOption, PrinterDetails, PrinterSelector, PrinterState,
    SizeUnit,
};

use crate::backend::{PrintBackend, PrintTicket};
use crate::cups::attributes::{custom_media_size, media_from_keyword};

/// A CUPS-like office printer: letter and A4, `copies` 1 to 100, `sides`.
pub fn office_printer() -> PrinterDetails {
    PrinterDetails {
        name: "Office Laser".into(),
        model: "HP LaserJet Pro".into(),
        identifier: "Office_Laser".into(),
        printer_state: PrinterState::Idle,
        state_reasons: vec![],
        print_system: "cups".into(),
        default_media_size: "letter".into(),
        media_sizes: ["na_letter_8.5x11in", "iso_a4_210x297mm"]
            .iter()
            .filter_map(|keyword| media_from_keyword(keyword))
            .collect(),
        supported_options: vec![
            PrintOption::new("copies", "Copies", Some("1".into()), (1..=100).map(|n| n.to_string()))
                .unwrap(),
            PrintOption::new(
                "sides",
                "Sides",
                Some("one-sided".into()),
                vec!["one-sided".to_string(), "two-sided-long-edge".to_string()],
            )
            .unwrap(),
        ],
    }
}

/// A label printer with one fixed size and no options.
pub fn label_printer() -> PrinterDetails {
    PrinterDetails {
        name: "Brother QL-1050 (A1B2C3)".into(),
        model: "QL-1050".into(),
        identifier: "usb://0x04f9:0x2020/A1B2C3".into(),
        printer_state: PrinterState::Idle,
        state_reasons: vec![],
        print_system: "brother_ql".into(),
        default_media_size: "103x164".into(),
        media_sizes: vec![
            MediaSize::new("103x164", 103.0, 164.0, SizeUnit::Millimeters, "custom_103x164mm_103x164mm")
                .unwrap(),
        ],
        supported_options: vec![],
    }
}

/// What a [`FakeBackend`] was asked to print.
#[derive(Debug, Clone)]
pub struct Submission {
    pub printer: String,
    pub files: usize,
    pub ticket: PrintTicket,
}

pub struct FakeBackend {
    name: &'static str,
    supported: bool,
    custom_sizes: bool,
    printers: Vec<PrinterDetails>,
    jobs: Mutex<HashMap<String, PrintJob>>,
    pub submissions: Mutex<Vec<Submission>>,
}

impl FakeBackend {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            supported: true,
            custom_sizes: false,
            printers: Vec::new(),
            jobs: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_printer(mut self, printer: PrinterDetails) -> Self {
        self.printers.push(printer);
        self
    }

    pub fn with_custom_sizes(mut self) -> Self {
        self.custom_sizes = true;
        self
    }

    pub fn with_job(self, job: PrintJob) -> Self {
        self.jobs.lock().unwrap().insert(job.job_id.clone(), job);
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }
}

#[async_trait]
impl PrintBackend for FakeBackend {
    fn system_name(&self) -> &'static str {
        self.name
    }

    async fn is_supported(&self) -> bool {
        self.supported
    }

    async fn get_printers(&self, selector: &PrinterSelector) -> Result<Vec<PrinterDetails>> {
        Ok(self
            .printers
            .iter()
            .filter(|printer| selector.matches(printer))
            .cloned()
            .collect())
    }

    async fn print(&self, printer: &PrinterDetails, files: &[PrintFile], ticket: &PrintTicket) -> Result<PrintJob> {
        self.submissions.lock().unwrap().push(Submission {
            printer: printer.identifier.clone(),
            files: files.len(),
            ticket: ticket.clone(),
        });
        let state = if ticket.is_async {
            JobState::Pending
        } else {
            JobState::Completed
        };
        let job = PrintJob::new("1", state, vec![]);
        self.jobs.lock().unwrap().insert(job.job_id.clone(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<PrintJob>> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    fn custom_media_size(&self, name: &str, width: f64, height: f64, units: SizeUnit) -> Option<MediaSize> {
        if self.custom_sizes {
            custom_media_size(name, width, height, units)
        } else {
            None
        }
    }
}
