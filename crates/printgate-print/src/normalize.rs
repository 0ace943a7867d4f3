// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request normalization: strict syntax checks before any backend I/O, then
// best-effort fitting of options and media to what the printer declares.
//
// Syntax problems reject the request. Capability mismatches only drop the
// offending setting and add a warning for the caller.

use std::collections::BTreeMap;

use tracing::{debug, info};

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{MediaSize, MediaSizeRequest, PrinterDetails, SizeUnit, is_valid_dimension};

use crate::backend::PrintBackend;

/// Longest accepted option keyword or value, in bytes.
const MAX_OPTION_LEN: usize = 255;

/// Longest accepted media size name, in characters.
const MAX_MEDIA_NAME_LEN: usize = 64;

/// A media request that passed syntax validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMediaRequest {
    pub name: Option<String>,
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub units: SizeUnit,
}

impl Dimensions {
    /// Compact label such as `4x6inches` or `62x100mm`.
    fn label(&self) -> String {
        format!("{}x{}{}", self.width, self.height, self.units.as_str())
    }
}

/// Options and media fitted to one printer, plus what had to be dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRequest {
    pub options: BTreeMap<String, String>,
    pub media_size: Option<MediaSize>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Syntax validation
// ---------------------------------------------------------------------------

/// Reject empty or oversized option keys and values.
pub fn validate_options(options: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in options {
        if key.is_empty() || key.len() > MAX_OPTION_LEN {
            return Err(PrintgateError::InvalidRequest(format!(
                "Invalid option name {key:?}: must be 1 to {MAX_OPTION_LEN} bytes"
            )));
        }
        if value.is_empty() || value.len() > MAX_OPTION_LEN {
            return Err(PrintgateError::InvalidRequest(format!(
                "Invalid value for option '{key}': must be 1 to {MAX_OPTION_LEN} bytes"
            )));
        }
    }
    Ok(())
}

/// Check the shape of a media request. `None` means the caller did not ask
/// for anything and the printer default applies.
pub fn validate_media_request(request: &MediaSizeRequest) -> Result<Option<ValidMediaRequest>> {
    let name = match request.name.as_deref() {
        None | Some("") => None,
        Some(name) => {
            validate_media_name(name)?;
            Some(name.to_string())
        }
    };

    let dimensions = match (request.width, request.height, request.units.as_deref()) {
        (None, None, None) => None,
        (Some(width), Some(height), Some(units)) => {
            if !is_valid_dimension(width) || !is_valid_dimension(height) {
                return Err(PrintgateError::InvalidRequest(
                    "mediaSize.width and mediaSize.height must be positive numbers".into(),
                ));
            }
            let units = SizeUnit::parse(units).ok_or_else(|| {
                PrintgateError::InvalidRequest(format!(
                    "Invalid value for mediaSize.units: {units:?}. Must be one of points, inches, mm"
                ))
            })?;
            Some(Dimensions {
                width,
                height,
                units,
            })
        }
        (Some(_), _, _) => {
            return Err(PrintgateError::InvalidRequest(
                "mediaSize.width requires mediaSize.height and mediaSize.units".into(),
            ));
        }
        (None, _, _) => {
            return Err(PrintgateError::InvalidRequest(
                "mediaSize.height and mediaSize.units require mediaSize.width".into(),
            ));
        }
    };

    if name.is_none() && dimensions.is_none() {
        return Ok(None);
    }
    Ok(Some(ValidMediaRequest { name, dimensions }))
}

fn validate_media_name(name: &str) -> Result<()> {
    if name.chars().count() > MAX_MEDIA_NAME_LEN {
        return Err(PrintgateError::InvalidRequest(format!(
            "mediaSize.name is longer than {MAX_MEDIA_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(PrintgateError::InvalidRequest(format!(
            "Invalid value for mediaSize.name: {name:?}. Use letters, digits, '.', '_' and '-'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Capability fitting
// ---------------------------------------------------------------------------

/// Keep only declared keyword/choice pairs.
///
/// Running the result through again yields the same map and no warnings.
pub fn sanitize_options(
    printer: &PrinterDetails,
    options: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut kept = BTreeMap::new();
    let mut warnings = Vec::new();
    for (key, value) in options {
        match printer.option(key) {
            None => warnings.push(format!("Printer does not support option: '{key}'")),
            Some(option) if !option.accepts(value) => warnings.push(format!(
                "Printer does not support option '{key}={value}'. Supported choices are: {}",
                option.choices.join(", ")
            )),
            Some(_) => {
                kept.insert(key.clone(), value.clone());
            }
        }
    }
    if !warnings.is_empty() {
        debug!(dropped = warnings.len(), printer = %printer.name, "Dropped unsupported options");
    }
    (kept, warnings)
}

/// Pick the media size to submit.
///
/// A declared name always wins over the caller's dimensions. Anything the
/// printer does not declare goes through the backend's custom size encoding,
/// or is dropped when the backend has none.
pub fn resolve_media_size(
    backend: &dyn PrintBackend,
    printer: &PrinterDetails,
    request: Option<&ValidMediaRequest>,
) -> (Option<MediaSize>, Vec<String>) {
    let Some(request) = request else {
        return (None, Vec::new());
    };
    let mut warnings = Vec::new();

    let resolved = match (&request.name, request.dimensions) {
        (Some(name), dimensions) => {
            if let Some(declared) = printer.media_size(name) {
                if let Some(dims) = dimensions
                    && !declared.matches_dimensions(dims.width, dims.height, dims.units)
                {
                    warnings.push(format!(
                        "Media size '{}' is {}x{} {} on this printer, not {}x{} {}. Using the printer's size.",
                        declared.name,
                        declared.width,
                        declared.height,
                        declared.units.as_str(),
                        dims.width,
                        dims.height,
                        dims.units.as_str()
                    ));
                }
                Some(declared.clone())
            } else if let Some(dims) = dimensions {
                match backend.custom_media_size(name, dims.width, dims.height, dims.units) {
                    Some(custom) => {
                        warnings.push(format!(
                            "Printer does not declare media size '{name}'. Submitting it as a custom {} size.",
                            dims.label()
                        ));
                        Some(custom)
                    }
                    None => {
                        warnings.push(format!(
                            "Printer does not support custom media size '{name}'. Supported sizes are: {}",
                            declared_names(printer)
                        ));
                        None
                    }
                }
            } else {
                warnings.push(format!(
                    "Printer does not support media size '{name}'. Supported sizes are: {}",
                    declared_names(printer)
                ));
                None
            }
        }
        (None, Some(dims)) => {
            let by_dimensions = printer
                .media_sizes
                .iter()
                .find(|m| m.matches_dimensions(dims.width, dims.height, dims.units));
            if let Some(declared) = by_dimensions {
                Some(declared.clone())
            } else {
                let name = dims.label();
                match backend.custom_media_size(&name, dims.width, dims.height, dims.units) {
                    Some(custom) => Some(custom),
                    None => {
                        warnings.push(format!(
                            "Printer does not support custom media size {name}. Supported sizes are: {}",
                            declared_names(printer)
                        ));
                        None
                    }
                }
            }
        }
        (None, None) => None,
    };
    (resolved, warnings)
}

fn declared_names(printer: &PrinterDetails) -> String {
    if printer.media_sizes.is_empty() {
        return "(none)".into();
    }
    printer
        .media_sizes
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fit validated options and media to `printer`.
pub fn normalize(
    backend: &dyn PrintBackend,
    printer: &PrinterDetails,
    options: &BTreeMap<String, String>,
    media: Option<&ValidMediaRequest>,
) -> NormalizedRequest {
    let (options, mut warnings) = sanitize_options(printer, options);
    let (media_size, media_warnings) = resolve_media_size(backend, printer, media);
    warnings.extend(media_warnings);
    if let Some(media) = &media_size {
        info!(media = %media.full_identifier, printer = %printer.name, "Media size resolved");
    }
    NormalizedRequest {
        options,
        media_size,
        warnings,
    }
}
