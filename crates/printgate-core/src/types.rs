// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printgate gateway.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PrintgateError, Result};

/// A document to print, as uploaded or downloaded by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintFile {
    pub content_type: String,
    pub content: Vec<u8>,
}

impl PrintFile {
    pub fn new(content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            content,
        }
    }

    /// Hex SHA-256 of the content, for log correlation.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

/// Lifecycle states of a print job (RFC 8011 §5.3.7 `job-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending = 3,
    PendingHeld = 4,
    Processing = 5,
    Stopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

impl JobState {
    /// Map an IPP `job-state` enum value.
    pub fn from_ipp(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Pending),
            4 => Some(Self::PendingHeld),
            5 => Some(Self::Processing),
            6 => Some(Self::Stopped),
            7 => Some(Self::Canceled),
            8 => Some(Self::Aborted),
            9 => Some(Self::Completed),
            _ => None,
        }
    }

    /// Lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingHeld => "pending_held",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
        }
    }

    /// The only states a synchronous submission keeps waiting on.
    pub fn is_pending_or_processing(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// Printer states (RFC 8011 §5.4.11 `printer-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    Idle = 3,
    Processing = 4,
    Stopped = 5,
}

impl PrinterState {
    pub fn from_ipp(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Idle),
            4 => Some(Self::Processing),
            5 => Some(Self::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
        }
    }
}

/// A snapshot of a job as reported by its backend.
///
/// Never updated in place: polling fetches a fresh snapshot each time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    /// Backend job id. Empty for backends without job tracking.
    pub job_id: String,
    pub job_state: JobState,
    pub job_state_reasons: Vec<String>,
}

impl PrintJob {
    pub fn new(job_id: impl Into<String>, job_state: JobState, job_state_reasons: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job_state,
            job_state_reasons,
        }
    }

    /// A job snapshot for backends that have no job identity.
    pub fn untracked(job_state: JobState, job_state_reasons: Vec<String>) -> Self {
        Self::new(String::new(), job_state, job_state_reasons)
    }
}

/// Measurement units for media dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeUnit {
    #[serde(rename = "points")]
    Points,
    #[serde(rename = "inches")]
    Inches,
    #[serde(rename = "mm")]
    Millimeters,
}

impl SizeUnit {
    /// Parse the wire token (`points`, `inches`, `mm`).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "points" => Some(Self::Points),
            "inches" => Some(Self::Inches),
            "mm" => Some(Self::Millimeters),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Inches => "inches",
            Self::Millimeters => "mm",
        }
    }

    /// Convert a length in this unit to PostScript points.
    pub fn to_points(&self, value: f64) -> f64 {
        match self {
            Self::Points => value,
            Self::Inches => value * 72.0,
            Self::Millimeters => value * 72.0 / 25.4,
        }
    }
}

/// Tolerance used when comparing media dimensions across units.
const DIMENSION_TOLERANCE_POINTS: f64 = 0.5;

/// A named physical media size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSize {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub units: SizeUnit,
    /// Backend-specific token used only when submitting a job.
    pub full_identifier: String,
}

impl MediaSize {
    /// Build a media size, rejecting non-finite or non-positive dimensions.
    pub fn new(
        name: impl Into<String>,
        width: f64,
        height: f64,
        units: SizeUnit,
        full_identifier: impl Into<String>,
    ) -> Option<Self> {
        if !is_valid_dimension(width) || !is_valid_dimension(height) {
            return None;
        }
        Some(Self {
            name: name.into(),
            width,
            height,
            units,
            full_identifier: full_identifier.into(),
        })
    }

    /// Whether the given dimensions describe this size (after unit conversion).
    pub fn matches_dimensions(&self, width: f64, height: f64, units: SizeUnit) -> bool {
        let same = |a: f64, a_units: SizeUnit, b: f64, b_units: SizeUnit| {
            (a_units.to_points(a) - b_units.to_points(b)).abs() <= DIMENSION_TOLERANCE_POINTS
        };
        same(self.width, self.units, width, units) && same(self.height, self.units, height, units)
    }
}

/// Whether a dimension value is usable.
pub fn is_valid_dimension(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// A printer-declared job option with a finite set of valid choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOption {
    pub keyword: String,
    pub display_name: String,
    pub default_choice: Option<String>,
    pub choices: Vec<String>,
}

impl PrintOption {
    /// Build an option, enforcing that `choices` is non-empty and that the
    /// default (if any) is one of them.
    ///
    /// Empty and duplicate choices are dropped, keeping first-seen order.
    pub fn new(
        keyword: impl Into<String>,
        display_name: impl Into<String>,
        default_choice: Option<String>,
        choices: impl IntoIterator<Item = String>,
    ) -> Option<Self> {
        let mut unique: Vec<String> = Vec::new();
        for choice in choices {
            if !choice.is_empty() && !unique.contains(&choice) {
                unique.push(choice);
            }
        }
        if unique.is_empty() {
            return None;
        }
        let default_choice = default_choice.filter(|d| unique.contains(d));
        Some(Self {
            keyword: keyword.into(),
            display_name: display_name.into(),
            default_choice,
            choices: unique,
        })
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c == value)
    }
}

/// Everything a backend knows about one printer.
///
/// Rebuilt on every enumeration; state and capabilities change underneath us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterDetails {
    pub name: String,
    pub model: String,
    /// Backend-internal handle (queue name, USB path). Opaque elsewhere.
    pub identifier: String,
    pub printer_state: PrinterState,
    pub state_reasons: Vec<String>,
    pub print_system: String,
    /// Name of one entry in `media_sizes`, or empty when none are declared.
    pub default_media_size: String,
    pub media_sizes: Vec<MediaSize>,
    pub supported_options: Vec<PrintOption>,
}

impl PrinterDetails {
    /// Composite id exposed to callers.
    pub fn id(&self) -> String {
        format!("{}:{}", self.print_system, self.identifier)
    }

    pub fn option(&self, keyword: &str) -> Option<&PrintOption> {
        self.supported_options.iter().find(|o| o.keyword == keyword)
    }

    /// Look up a declared media size by name (case-insensitive).
    pub fn media_size(&self, name: &str) -> Option<&MediaSize> {
        self.media_sizes
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn default_media(&self) -> Option<&MediaSize> {
        self.media_size(&self.default_media_size)
    }
}

/// Partial-match filter used to pick one printer among all backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSelector {
    pub name: Option<String>,
    pub print_system: Option<String>,
    pub name_prefix: String,
    pub model_prefix: String,
}

impl PrinterSelector {
    /// True when no criterion is set, i.e. the selector matches everything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.print_system.is_none()
            && self.name_prefix.is_empty()
            && self.model_prefix.is_empty()
    }

    /// Reject a `print_system` that names no registered backend.
    pub fn validate(&self, known_systems: &[&str]) -> Result<()> {
        match &self.print_system {
            Some(system) if !known_systems.contains(&system.as_str()) => {
                Err(PrintgateError::InvalidRequest(format!(
                    "Invalid value for printerSelector.printSystem. Must be null, or one of {}",
                    known_systems.join(", ")
                )))
            }
            _ => Ok(()),
        }
    }

    /// Name and model checks only; the backend name is compared separately by
    /// backends that already know which system they are.
    pub fn matches_name_and_model(&self, name: &str, model: &str) -> bool {
        if let Some(wanted) = &self.name
            && !wanted.eq_ignore_ascii_case(name)
        {
            return false;
        }
        starts_with_ignore_case(name, &self.name_prefix)
            && starts_with_ignore_case(model, &self.model_prefix)
    }

    pub fn matches(&self, printer: &PrinterDetails) -> bool {
        if let Some(system) = &self.print_system
            && system != &printer.print_system
        {
            return false;
        }
        self.matches_name_and_model(&printer.name, &printer.model)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// A caller's raw media-size request, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSizeRequest {
    pub name: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub units: Option<String>,
}

impl MediaSizeRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.width.is_none() && self.height.is_none() && self.units.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer(name: &str, model: &str, system: &str) -> PrinterDetails {
        PrinterDetails {
            name: name.into(),
            model: model.into(),
            identifier: "queue".into(),
            printer_state: PrinterState::Idle,
            state_reasons: vec![],
            print_system: system.into(),
            default_media_size: String::new(),
            media_sizes: vec![],
            supported_options: vec![],
        }
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector = PrinterSelector::default();
        assert!(selector.is_empty());
        assert!(selector.matches(&printer("Office", "HP LaserJet", "cups")));
        assert!(selector.matches(&printer("", "", "brother_ql")));
    }

    #[test]
    fn selector_fields_are_case_insensitive() {
        let p = printer("Front Desk Label", "QL-1050", "brother_ql");
        let by_name = PrinterSelector {
            name: Some("front desk label".into()),
            ..Default::default()
        };
        let by_prefix = PrinterSelector {
            name_prefix: "FRONT".into(),
            model_prefix: "ql-".into(),
            ..Default::default()
        };
        assert!(by_name.matches(&p));
        assert!(by_prefix.matches(&p));
    }

    #[test]
    fn selector_rejects_any_failing_field() {
        let p = printer("Office", "HP LaserJet", "cups");
        let wrong_system = PrinterSelector {
            print_system: Some("brother_ql".into()),
            ..Default::default()
        };
        let wrong_model = PrinterSelector {
            name_prefix: "off".into(),
            model_prefix: "Canon".into(),
            ..Default::default()
        };
        let wrong_name = PrinterSelector {
            name: Some("Office 2".into()),
            ..Default::default()
        };
        assert!(!wrong_system.matches(&p));
        assert!(!wrong_model.matches(&p));
        assert!(!wrong_name.matches(&p));
    }

    #[test]
    fn selector_validates_print_system() {
        let selector = PrinterSelector {
            print_system: Some("lpd".into()),
            ..Default::default()
        };
        assert!(selector.validate(&["cups", "brother_ql"]).is_err());
        assert!(PrinterSelector::default().validate(&["cups"]).is_ok());
    }

    #[test]
    fn print_option_drops_foreign_default() {
        let option = PrintOption::new(
            "sides",
            "Sides",
            Some("two-sided-long-edge".into()),
            vec!["one-sided".to_string(), "one-sided".to_string(), String::new()],
        )
        .unwrap();
        assert_eq!(option.choices, vec!["one-sided"]);
        assert_eq!(option.default_choice, None);
    }

    #[test]
    fn print_option_requires_choices() {
        assert!(PrintOption::new("sides", "Sides", None, Vec::<String>::new()).is_none());
    }

    #[test]
    fn media_size_rejects_bad_dimensions() {
        assert!(MediaSize::new("x", 0.0, 1.0, SizeUnit::Inches, "x").is_none());
        assert!(MediaSize::new("x", f64::NAN, 1.0, SizeUnit::Inches, "x").is_none());
        assert!(MediaSize::new("x", 1.0, f64::INFINITY, SizeUnit::Inches, "x").is_none());
    }

    #[test]
    fn media_dimensions_compare_across_units() {
        let a4 = MediaSize::new("a4", 210.0, 297.0, SizeUnit::Millimeters, "iso_a4_210x297mm").unwrap();
        assert!(a4.matches_dimensions(595.28, 841.89, SizeUnit::Points));
        assert!(!a4.matches_dimensions(8.5, 11.0, SizeUnit::Inches));
    }

    #[test]
    fn job_state_round_trips_ipp_values() {
        assert_eq!(JobState::from_ipp(9), Some(JobState::Completed));
        assert_eq!(JobState::from_ipp(2), None);
        assert!(JobState::Pending.is_pending_or_processing());
        assert!(!JobState::PendingHeld.is_pending_or_processing());
        assert_eq!(JobState::PendingHeld.as_str(), "pending_held");
    }

    #[test]
    fn printer_id_combines_system_and_identifier() {
        assert_eq!(printer("a", "b", "cups").id(), "cups:queue");
    }
}
