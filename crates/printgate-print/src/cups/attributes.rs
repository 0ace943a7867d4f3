// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer and job attribute interpretation for the CUPS backend.
//
// Works on a small owned attribute model so that capability parsing does not
// depend on the wire types of the IPP client.

use std::collections::HashMap;

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{JobState, MediaSize, PrintJob, PrintOption, PrinterState, SizeUnit};

/// Most choices listed for an option declared as an integer range.
pub const MAX_RANGE_CHOICES: i32 = 100;

/// IPP `resolution` units value for dots per inch.
const DOTS_PER_INCH: i8 = 3;

/// An attribute value as read from a response.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `integer` and `enum`.
    Integer(i32),
    Boolean(bool),
    /// Keywords, names, text, URIs, MIME types.
    Text(String),
    Range(i32, i32),
    Resolution { cross_feed: i32, feed: i32, units: i8 },
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Single values as a one-element slice, lists as their items.
    pub fn items(&self) -> &[AttrValue] {
        match self {
            Self::List(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The value spelled the way a job attribute would be written.
    pub fn to_choice(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Range(min, max) => format!("{min}-{max}"),
            Self::Resolution {
                cross_feed,
                feed,
                units,
            } => {
                let suffix = if *units == DOTS_PER_INCH { "dpi" } else { "dpcm" };
                if cross_feed == feed {
                    format!("{cross_feed}{suffix}")
                } else {
                    format!("{cross_feed}x{feed}{suffix}")
                }
            }
            Self::List(items) => items
                .iter()
                .map(AttrValue::to_choice)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Every choice this value allows. Ranges are expanded, up to a cap.
    fn expand_choices(&self, out: &mut Vec<String>) {
        match self {
            Self::List(items) => {
                for item in items {
                    item.expand_choices(out);
                }
            }
            Self::Range(min, max) => {
                let last = (*max).min(min.saturating_add(MAX_RANGE_CHOICES - 1));
                out.extend((*min..=last).map(|n| n.to_string()));
            }
            other => out.push(other.to_choice()),
        }
    }
}

/// One attribute group, keyed by attribute name.
pub type AttrMap = HashMap<String, AttrValue>;

fn text<'a>(attrs: &'a AttrMap, name: &str) -> Option<&'a str> {
    match attrs.get(name)?.items().first()? {
        AttrValue::Text(value) => Some(value.as_str()),
        _ => None,
    }
}

fn texts(attrs: &AttrMap, name: &str) -> Vec<String> {
    attrs
        .get(name)
        .map(|value| value.items().iter().map(AttrValue::to_choice).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

/// What CUPS-Get-Printers tells us about a queue before the detailed query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSummary {
    /// CUPS queue name, used as the printer identifier.
    pub queue: String,
    /// `printer-info`, falling back to the queue name.
    pub name: String,
    pub model: String,
    pub state: PrinterState,
    pub state_reasons: Vec<String>,
}

impl QueueSummary {
    /// `None` for groups without a queue name or state.
    pub fn from_attributes(attrs: &AttrMap) -> Option<Self> {
        let queue = text(attrs, "printer-name")?.to_string();
        let state = attrs
            .get("printer-state")
            .and_then(AttrValue::as_integer)
            .and_then(PrinterState::from_ipp)?;
        let name = text(attrs, "printer-info")
            .filter(|info| !info.is_empty())
            .unwrap_or(queue.as_str())
            .to_string();
        let model = text(attrs, "printer-make-and-model")
            .unwrap_or_default()
            .to_string();
        let state_reasons = texts(attrs, "printer-state-reasons")
            .into_iter()
            .filter(|reason| reason != "none")
            .collect();
        Some(Self {
            queue,
            name,
            model,
            state,
            state_reasons,
        })
    }

    /// Stopped queues and queues whose device reports itself offline cannot
    /// take a job right now.
    pub fn is_usable(&self) -> bool {
        self.state != PrinterState::Stopped
            && !self
                .state_reasons
                .iter()
                .any(|reason| reason.starts_with("offline-report"))
    }
}

/// Media sizes and job options declared by Get-Printer-Attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub media_sizes: Vec<MediaSize>,
    pub default_media_size: String,
    pub options: Vec<PrintOption>,
}

impl Capabilities {
    pub fn from_attributes(attrs: &AttrMap) -> Self {
        let mut media_sizes: Vec<MediaSize> = Vec::new();
        for keyword in texts(attrs, "media-supported") {
            if let Some(size) = media_from_keyword(&keyword)
                && !media_sizes.iter().any(|m| m.name == size.name)
            {
                media_sizes.push(size);
            }
        }
        let default_media_size = text(attrs, "media-default")
            .and_then(media_from_keyword)
            .map(|size| size.name)
            .filter(|name| media_sizes.iter().any(|m| &m.name == name))
            .or_else(|| media_sizes.first().map(|m| m.name.clone()))
            .unwrap_or_default();

        let mut keywords = texts(attrs, "job-creation-attributes-supported");
        keywords.sort();
        keywords.dedup();
        let options = keywords
            .iter()
            .filter(|keyword| is_option_keyword(keyword))
            .filter_map(|keyword| option_from_attributes(attrs, keyword))
            .collect();

        Self {
            media_sizes,
            default_media_size,
            options,
        }
    }
}

/// Media has its own request field; collections cannot be chosen from a list.
fn is_option_keyword(keyword: &str) -> bool {
    keyword != "media" && !keyword.ends_with("-col")
}

fn option_from_attributes(attrs: &AttrMap, keyword: &str) -> Option<PrintOption> {
    let default = attrs.get(&format!("{keyword}-default"))?;
    let supported = attrs.get(&format!("{keyword}-supported"))?;
    let mut choices = Vec::new();
    supported.expand_choices(&mut choices);
    PrintOption::new(
        keyword,
        display_name(keyword),
        Some(default.to_choice()),
        choices,
    )
}

/// `print-color-mode` becomes `Print Color Mode`.
pub fn display_name(keyword: &str) -> String {
    keyword
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Parse a PWG 5101.1 self-describing media name such as
/// `na_letter_8.5x11in` or `iso_a4_210x297mm`.
///
/// The user-facing name is the middle part (`letter`, `a4`). Custom size
/// ranges (`custom_min_*`, `custom_max_*`) are not sizes and yield `None`.
pub fn media_from_keyword(keyword: &str) -> Option<MediaSize> {
    let (prefix, dims) = keyword.rsplit_once('_')?;
    let (class, name) = prefix.split_once('_')?;
    if name.is_empty() || (class == "custom" && (name.starts_with("min") || name.starts_with("max"))) {
        return None;
    }
    let (numbers, units) = if let Some(numbers) = dims.strip_suffix("in") {
        (numbers, SizeUnit::Inches)
    } else if let Some(numbers) = dims.strip_suffix("mm") {
        (numbers, SizeUnit::Millimeters)
    } else {
        return None;
    };
    let (width, height) = numbers.split_once('x')?;
    MediaSize::new(
        name,
        width.parse().ok()?,
        height.parse().ok()?,
        units,
        keyword,
    )
}

/// A PWG custom media name, `custom_{name}_{w}x{h}{in|mm}`.
///
/// PWG names carry no points unit, so points are expressed in inches.
pub fn custom_media_size(name: &str, width: f64, height: f64, units: SizeUnit) -> Option<MediaSize> {
    let (w, h, suffix) = match units {
        SizeUnit::Millimeters => (width, height, "mm"),
        SizeUnit::Inches => (width, height, "in"),
        SizeUnit::Points => (width / 72.0, height / 72.0, "in"),
    };
    let identifier = format!(
        "custom_{name}_{}x{}{suffix}",
        format_dimension(w),
        format_dimension(h)
    );
    MediaSize::new(name, width, height, units, identifier)
}

/// At most four decimals, without trailing zeros.
fn format_dimension(value: f64) -> String {
    let fixed = format!("{value:.4}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Build a job snapshot from a Get-Job-Attributes job group.
pub fn job_from_attributes(job_id: i32, attrs: &AttrMap) -> Result<PrintJob> {
    let job_state = attrs
        .get("job-state")
        .and_then(AttrValue::as_integer)
        .and_then(JobState::from_ipp)
        .ok_or_else(|| PrintgateError::Spooler("Failed to get job state from CUPS".into()))?;
    let mut reasons = texts(attrs, "job-state-reasons");
    if reasons == ["none"] {
        reasons.clear();
    }
    Ok(PrintJob::new(job_id.to_string(), job_state, reasons))
}

// ---------------------------------------------------------------------------
// Job attribute encoding
// ---------------------------------------------------------------------------

/// A typed job attribute value ready for the IPP encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum JobValue {
    Integer(i32),
    Enum(i32),
    Boolean(bool),
    Range(i32, i32),
    Resolution { cross_feed: i32, feed: i32, units: i8 },
    Keyword(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Integer,
    Enum,
    Boolean,
    Range,
    Resolution,
    Keyword,
}

/// Value syntax of the job attributes that are not plain keywords.
fn syntax_of(keyword: &str) -> Syntax {
    match keyword {
        "copies" | "job-priority" | "job-cancel-after" | "number-up" => Syntax::Integer,
        "finishings" | "orientation-requested" | "print-quality" => Syntax::Enum,
        "fit-to-page" | "mirror" => Syntax::Boolean,
        "page-ranges" => Syntax::Range,
        "printer-resolution" => Syntax::Resolution,
        _ => Syntax::Keyword,
    }
}

/// Encode one option string. Comma-separated values become several values;
/// anything that does not parse under the attribute's syntax is sent as a
/// keyword and left for the scheduler to judge.
pub fn encode_option(keyword: &str, value: &str) -> Vec<JobValue> {
    let syntax = syntax_of(keyword);
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| encode_value(syntax, part).unwrap_or_else(|| JobValue::Keyword(part.to_string())))
        .collect()
}

fn encode_value(syntax: Syntax, value: &str) -> Option<JobValue> {
    match syntax {
        Syntax::Integer => value.parse().ok().map(JobValue::Integer),
        Syntax::Enum => value.parse().ok().map(JobValue::Enum),
        Syntax::Boolean => match value {
            "true" | "yes" | "on" => Some(JobValue::Boolean(true)),
            "false" | "no" | "off" => Some(JobValue::Boolean(false)),
            _ => None,
        },
        Syntax::Range => {
            let (min, max) = value.split_once('-').unwrap_or((value, value));
            Some(JobValue::Range(min.trim().parse().ok()?, max.trim().parse().ok()?))
        }
        Syntax::Resolution => parse_resolution(value),
        Syntax::Keyword => Some(JobValue::Keyword(value.to_string())),
    }
}

/// `600dpi`, `600x1200dpi`, or `118dpcm`.
fn parse_resolution(value: &str) -> Option<JobValue> {
    let (numbers, units) = if let Some(numbers) = value.strip_suffix("dpi") {
        (numbers, DOTS_PER_INCH)
    } else if let Some(numbers) = value.strip_suffix("dpcm") {
        (numbers, DOTS_PER_INCH + 1)
    } else {
        return None;
    };
    let (cross_feed, feed) = numbers.split_once('x').unwrap_or((numbers, numbers));
    Some(JobValue::Resolution {
        cross_feed: cross_feed.parse().ok()?,
        feed: feed.parse().ok()?,
        units,
    })
}
