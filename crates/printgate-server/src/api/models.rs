// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire shapes of the JSON API. Field names are camelCase on the wire.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::{MediaSize, MediaSizeRequest, PrintJob, PrintOption, PrinterDetails, PrinterSelector};

/// Parse a request body, reporting malformed JSON as a client error.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|err| PrintgateError::InvalidRequest(format!("Invalid request body: {err}")))
}

/// Build a selector from `printerSelector` fields, rejecting keys it does
/// not know. Empty values mean "not set".
pub fn parse_selector<'a>(
    fields: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
) -> Result<PrinterSelector> {
    let mut selector = PrinterSelector::default();
    let mut unknown = Vec::new();
    for (key, value) in fields {
        let value = value.filter(|v| !v.is_empty());
        match key {
            "name" => selector.name = value.map(str::to_owned),
            "printSystem" => selector.print_system = value.map(str::to_owned),
            "namePrefix" => selector.name_prefix = value.unwrap_or_default().to_owned(),
            "modelPrefix" => selector.model_prefix = value.unwrap_or_default().to_owned(),
            other => unknown.push(other),
        }
    }
    if !unknown.is_empty() {
        return Err(PrintgateError::InvalidRequest(format!(
            "Unknown printerSelector field: {}",
            unknown.join(", ")
        )));
    }
    Ok(selector)
}

/// `printerSelector` as it appears in a JSON body: strings or nulls only.
pub fn selector_from_json(fields: &Map<String, Value>) -> Result<PrinterSelector> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let value = match value {
            Value::Null => None,
            Value::String(s) => Some(s.as_str()),
            other => {
                return Err(PrintgateError::InvalidRequest(format!(
                    "Invalid value for printerSelector.{key}: {other}"
                )));
            }
        };
        pairs.push((key.as_str(), value));
    }
    parse_selector(pairs)
}

/// One entry of `files`: either a URL to download, or inline base64.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_url: Option<String>,
    pub content_type: Option<String>,
    pub base64: Option<String>,
}

/// Body of `POST /print-job`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintJobPayload {
    pub job_title: Option<String>,
    pub options: Option<BTreeMap<String, String>>,
    /// Older name for `options`.
    pub cups_options: Option<BTreeMap<String, String>>,
    #[serde(rename = "async")]
    pub is_async: Option<bool>,
    pub files: Option<Vec<FileDescriptor>>,
    /// Older name for `files`.
    pub print_jobs: Option<Vec<FileDescriptor>>,
    pub printer_selector: Option<Map<String, Value>>,
    pub media_size: Option<MediaSizeRequest>,
}

impl PrintJobPayload {
    pub fn selector(&self) -> Result<PrinterSelector> {
        match &self.printer_selector {
            Some(fields) => selector_from_json(fields),
            None => Ok(PrinterSelector::default()),
        }
    }

    /// `options`, or `cupsOptions` when `options` is missing or empty.
    pub fn take_options(&mut self) -> BTreeMap<String, String> {
        self.options
            .take()
            .filter(|options| !options.is_empty())
            .or_else(|| self.cups_options.take())
            .unwrap_or_default()
    }

    /// `files`, or `printJobs` when `files` is missing or empty.
    pub fn take_files(&mut self) -> Vec<FileDescriptor> {
        self.files
            .take()
            .filter(|files| !files.is_empty())
            .or_else(|| self.print_jobs.take())
            .unwrap_or_default()
    }
}

/// Body of `POST /domains/submit`.
#[derive(Debug, Deserialize)]
pub struct DomainSubmission {
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaSizeResponse {
    pub key: String,
    pub width: f64,
    pub height: f64,
    pub units: &'static str,
}

impl From<&MediaSize> for MediaSizeResponse {
    fn from(size: &MediaSize) -> Self {
        Self {
            key: size.name.clone(),
            width: size.width,
            height: size.height,
            units: size.units.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub key: String,
    pub default_choice: Option<String>,
    pub choices: Vec<String>,
    pub display_name: String,
    pub display_position: usize,
}

impl OptionResponse {
    fn new(option: &PrintOption, position: usize) -> Self {
        Self {
            key: option.keyword.clone(),
            default_choice: option.default_choice.clone(),
            choices: option.choices.clone(),
            display_name: option.display_name.clone(),
            display_position: position,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterResponse {
    pub name: String,
    pub id: String,
    pub model: String,
    pub printer_state: &'static str,
    pub state_reasons: Vec<String>,
    pub print_system: String,
    pub default_media_size: String,
    pub media_sizes: Vec<MediaSizeResponse>,
    pub supported_options: BTreeMap<String, OptionResponse>,
}

impl From<&PrinterDetails> for PrinterResponse {
    fn from(printer: &PrinterDetails) -> Self {
        Self {
            name: printer.name.clone(),
            id: printer.id(),
            model: printer.model.clone(),
            printer_state: printer.printer_state.as_str(),
            state_reasons: printer.state_reasons.clone(),
            print_system: printer.print_system.clone(),
            default_media_size: printer.default_media_size.clone(),
            media_sizes: printer.media_sizes.iter().map(MediaSizeResponse::from).collect(),
            supported_options: printer
                .supported_options
                .iter()
                .enumerate()
                .map(|(position, option)| {
                    (option.keyword.clone(), OptionResponse::new(option, position))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrintersResponse {
    pub printers: Vec<PrinterResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub job_id: String,
    pub job_state: &'static str,
    pub job_state_reasons: Vec<String>,
    /// Newline-joined; absent when there is nothing to report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

impl JobResponse {
    pub fn new(job: &PrintJob, warnings: &[String]) -> Self {
        Self {
            job_id: job.job_id.clone(),
            job_state: job.job_state.as_str(),
            job_state_reasons: job.job_state_reasons.clone(),
            warnings: (!warnings.is_empty()).then(|| warnings.join("\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_selector_fields() {
        let selector = parse_selector([
            ("namePrefix", Some("Office")),
            ("printSystem", Some("cups")),
            ("name", Some("")),
        ])
        .unwrap();
        assert_eq!(selector.name_prefix, "Office");
        assert_eq!(selector.print_system.as_deref(), Some("cups"));
        assert_eq!(selector.name, None);
    }

    #[test]
    fn unknown_selector_fields_are_named() {
        let err = parse_selector([("model", Some("QL")), ("name", None)]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown printerSelector field: model");
    }

    #[test]
    fn json_selector_rejects_non_strings() {
        let fields = json!({"name": 7});
        let err = selector_from_json(fields.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for printerSelector.name: 7");

        let fields = json!({"modelPrefix": "QL-", "name": null});
        let selector = selector_from_json(fields.as_object().unwrap()).unwrap();
        assert_eq!(selector.model_prefix, "QL-");
        assert!(selector.name.is_none());
    }

    #[test]
    fn deprecated_aliases_fill_in() {
        let mut payload: PrintJobPayload = decode_json(
            br#"{"options": {}, "cupsOptions": {"copies": "2"},
                 "printJobs": [{"contentType": "application/pdf", "base64": "JVBERg=="}]}"#,
        )
        .unwrap();
        assert_eq!(payload.take_options().get("copies").map(String::as_str), Some("2"));
        let files = payload.take_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn non_string_title_is_a_bad_request() {
        let err = decode_json::<PrintJobPayload>(br#"{"jobTitle": 5}"#).unwrap_err();
        assert!(matches!(err, PrintgateError::InvalidRequest(_)));
    }

    #[test]
    fn warnings_are_joined_or_omitted() {
        let job = PrintJob::new("12", printgate_core::types::JobState::Completed, vec![]);
        let quiet = serde_json::to_value(JobResponse::new(&job, &[])).unwrap();
        assert_eq!(
            quiet,
            json!({"jobId": "12", "jobState": "completed", "jobStateReasons": []})
        );
        let noisy = JobResponse::new(&job, &["a".into(), "b".into()]);
        assert_eq!(noisy.warnings.as_deref(), Some("a\nb"));
    }
}
