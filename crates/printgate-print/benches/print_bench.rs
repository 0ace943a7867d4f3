// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for printgate-print: Brother QL raster encoding and
// option sanitization against a capability-rich printer.

use std::collections::BTreeMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printgate_core::types::{PrintOption, PrinterDetails, PrinterState};
use printgate_document::MonoBitmap;
use printgate_print::brother_ql::labels::{LABELS, find_model};
use printgate_print::brother_ql::raster;
use printgate_print::normalize::sanitize_options;

/// A checkerboard 103x164 label, encoded for a QL-1050.
fn bench_raster_encode(c: &mut Criterion) {
    let label = &LABELS[0];
    let Some(model) = find_model("QL-1050") else {
        return;
    };
    let (width, height) = label.dots_printable;
    let mut page = MonoBitmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            page.set(x, y, (x / 8 + y / 8) % 2 == 0);
        }
    }
    let pages = vec![page];

    c.bench_function("raster_encode (103x164, QL-1050)", |b| {
        b.iter(|| {
            let stream = raster::encode(black_box(&pages), label, model);
            black_box(stream.map(|s| s.len()).unwrap_or_default());
        });
    });
}

/// Twenty declared options, half of the request unsupported.
fn bench_sanitize_options(c: &mut Criterion) {
    let supported_options = (0..20)
        .filter_map(|i| {
            PrintOption::new(
                format!("option-{i}"),
                format!("Option {i}"),
                None,
                (0..10).map(|n| format!("choice-{n}")),
            )
        })
        .collect();
    let printer = PrinterDetails {
        name: "Bench".into(),
        model: "Bench".into(),
        identifier: "Bench".into(),
        printer_state: PrinterState::Idle,
        state_reasons: vec![],
        print_system: "cups".into(),
        default_media_size: String::new(),
        media_sizes: vec![],
        supported_options,
    };
    let options: BTreeMap<String, String> = (0..40)
        .map(|i| (format!("option-{i}"), format!("choice-{}", i % 12)))
        .collect();

    c.bench_function("sanitize_options (40 requested, 20 declared)", |b| {
        b.iter(|| black_box(sanitize_options(black_box(&printer), black_box(&options))));
    });
}

criterion_group!(benches, bench_raster_encode, bench_sanitize_options);
criterion_main!(benches);
