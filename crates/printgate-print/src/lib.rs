// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printgate Print — the printer abstraction and job submission pipeline.
// Backends for the CUPS spooler (IPP) and Brother QL label printers (USB),
// selector resolution across them, request normalization against printer
// capabilities, and bounded job polling.

pub mod backend;
pub mod brother_ql;
pub mod cups;
pub mod normalize;
pub mod poll;
pub mod provider;
pub mod service;

#[cfg(test)]
mod testing;

pub use backend::{BackendKind, PrintBackend, PrintTicket};
pub use brother_ql::BrotherQlBackend;
pub use cups::CupsBackend;
pub use normalize::NormalizedRequest;
pub use poll::{PollPolicy, wait_for_job};
pub use provider::PrintSystemProvider;
pub use service::{PrintRequest, PrintService, SubmittedJob};
