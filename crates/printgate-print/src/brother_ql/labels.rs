// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label stock and printer model geometry for the Brother QL raster protocol.

use printgate_core::types::{MediaSize, SizeUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactor {
    DieCut,
    Endless,
}

impl FormFactor {
    /// Media type byte of the `ESC i z` print information command.
    pub fn media_type(self) -> u8 {
        match self {
            Self::DieCut => 0x0B,
            Self::Endless => 0x0A,
        }
    }
}

/// One roll of label stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// Short name, also the advertised media size name.
    pub name: &'static str,
    /// Printed label size in millimetres, as sold.
    pub size_mm: (u16, u16),
    /// Tape width and length reported to the printer.
    pub tape_mm: (u8, u8),
    pub form_factor: FormFactor,
    pub dots_total: (u32, u32),
    /// Area the head can reach; rendered pages have exactly this size.
    pub dots_printable: (u32, u32),
    /// Unprintable dots on the right edge of the head, before model offsets.
    pub offset_right: u32,
    pub feed_margin: u16,
    /// Models able to print this stock. Empty means every model.
    pub models: &'static [&'static str],
}

pub const LABELS: &[Label] = &[
    Label {
        name: "103x164",
        size_mm: (103, 164),
        tape_mm: (104, 164),
        form_factor: FormFactor::DieCut,
        dots_total: (1200, 1804),
        dots_printable: (1164, 1660),
        offset_right: 12,
        feed_margin: 0,
        models: &["QL-1050", "QL-1060N"],
    },
    Label {
        name: "62x100",
        size_mm: (62, 100),
        tape_mm: (62, 100),
        form_factor: FormFactor::DieCut,
        dots_total: (732, 1179),
        dots_printable: (696, 1109),
        offset_right: 12,
        feed_margin: 0,
        models: &[],
    },
];

impl Label {
    pub fn supports(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.contains(&model)
    }

    pub fn identifier(&self) -> String {
        let (w, h) = self.size_mm;
        format!("custom_{w}x{h}mm_{w}x{h}mm")
    }

    pub fn media_size(&self) -> Option<MediaSize> {
        let (w, h) = self.size_mm;
        MediaSize::new(self.name, f64::from(w), f64::from(h), SizeUnit::Millimeters, self.identifier())
    }
}

/// Stock for `model`, in table order.
pub fn labels_for(model: &str) -> impl Iterator<Item = &'static Label> + '_ {
    LABELS.iter().filter(move |label| label.supports(model))
}

/// Find stock by advertised name or full identifier.
pub fn find_label(model: &str, media: &MediaSize) -> Option<&'static Label> {
    labels_for(model)
        .find(|label| label.name == media.name || label.identifier() == media.full_identifier)
}

/// Print head geometry of one printer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    pub name: &'static str,
    pub bytes_per_row: usize,
    /// Extra right-hand offset on wide heads, in dots.
    pub additional_offset_right: u32,
}

impl Model {
    pub fn head_dots(&self) -> u32 {
        (self.bytes_per_row * 8) as u32
    }
}

pub const MODELS: &[Model] = &[
    Model { name: "QL-1050", bytes_per_row: 162, additional_offset_right: 44 },
    Model { name: "QL-1060N", bytes_per_row: 162, additional_offset_right: 44 },
    Model { name: "QL-570", bytes_per_row: 90, additional_offset_right: 0 },
    Model { name: "QL-580N", bytes_per_row: 90, additional_offset_right: 0 },
    Model { name: "QL-700", bytes_per_row: 90, additional_offset_right: 0 },
    Model { name: "QL-710W", bytes_per_row: 90, additional_offset_right: 0 },
    Model { name: "QL-720NW", bytes_per_row: 90, additional_offset_right: 0 },
];

pub fn find_model(name: &str) -> Option<&'static Model> {
    MODELS.iter().find(|model| model.name == name)
}
