// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async IPP connection to the local CUPS scheduler.
//
// Uses the `ipp` crate's async API to send:
//   - CUPS-Get-Printers        (CUPS Implementation of IPP §4.2)
//   - Get-Printer-Attributes   (RFC 8011 §4.2.5)
//   - Print-Job                (RFC 8011 §4.2.1)
//   - Create-Job               (RFC 8011 §4.2.4)
//   - Send-Document            (RFC 8011 §4.3.1)
//   - Cancel-Job               (RFC 8011 §4.3.3)
//   - Get-Job-Attributes       (RFC 8011 §4.3.4)

use std::io::Cursor;

use async_trait::async_trait;
use ipp::operation::IppOperation;
use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::PrintFile;

use super::attributes::{AttrMap, AttrValue, JobValue};

/// A job attribute to send with Print-Job or Create-Job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobAttribute {
    pub name: String,
    pub values: Vec<JobValue>,
}

/// The IPP requests the CUPS backend makes, one method per operation.
///
/// [`CupsConnection`] talks to a real scheduler; tests substitute a fake.
#[async_trait]
pub trait IppExchange: Send + Sync {
    /// Scheduler URI, for logging.
    fn base(&self) -> &str;

    /// One attribute map per queue known to the scheduler.
    async fn get_printers(&self) -> Result<Vec<AttrMap>>;

    async fn get_printer_attributes(&self, queue: &str) -> Result<AttrMap>;

    /// Submit a single document. Returns the scheduler's job id.
    async fn print_job(
        &self,
        queue: &str,
        job_title: &str,
        file: &PrintFile,
        format: &str,
        attributes: &[JobAttribute],
    ) -> Result<i32>;

    /// Open a job that documents are added to with [`Self::send_document`].
    async fn create_job(&self, queue: &str, job_title: &str, attributes: &[JobAttribute]) -> Result<i32>;

    async fn send_document(&self, queue: &str, job_id: i32, file: &PrintFile, format: &str, last: bool)
    -> Result<()>;

    async fn cancel_job(&self, queue: &str, job_id: i32) -> Result<()>;

    /// `None` when the scheduler does not (or no longer) know the job.
    async fn get_job_attributes(&self, job_id: i32) -> Result<Option<AttrMap>>;
}

/// Connection to one CUPS scheduler.
///
/// Requests are posted to the scheduler root; printers and jobs are addressed
/// through the `printer-uri` and `job-id` operation attributes.
pub struct CupsConnection {
    base: String,
    client: AsyncIppClient,
}

impl CupsConnection {
    /// `base` is the scheduler URI, e.g. `ipp://localhost:631`.
    pub fn new(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/').to_string();
        let root = parse_uri(&format!("{base}/"))?;
        Ok(Self {
            base,
            client: AsyncIppClient::new(root),
        })
    }

    fn printer_uri(&self, queue: &str) -> Result<Uri> {
        parse_uri(&format!("{}/printers/{queue}", self.base))
    }

    fn root_uri(&self) -> Result<Uri> {
        parse_uri(&format!("{}/", self.base))
    }

    /// Send one operation and turn transport failures into spooler errors.
    /// The status code is left for the caller to judge.
    async fn exchange<R: Into<IppRequestResponse>>(&self, name: &str, request: R) -> Result<IppRequestResponse> {
        debug!(operation = name, "sending IPP request");
        self.client.send(request).await.map_err(|e| {
            error!(operation = name, error = %e, "IPP request failed");
            PrintgateError::Spooler(format!("{name}: {e}"))
        })
    }

    async fn exchange_ok<R: Into<IppRequestResponse>>(&self, name: &str, request: R) -> Result<IppRequestResponse> {
        let response = self.exchange(name, request).await?;
        let code = response.header().status_code();
        if !code.is_success() {
            error!(operation = name, status = ?code, "IPP request rejected");
            return Err(PrintgateError::Spooler(format!("{name} returned status {code:?}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl IppExchange for CupsConnection {
    fn base(&self) -> &str {
        &self.base
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn get_printers(&self) -> Result<Vec<AttrMap>> {
        let operation = IppOperationBuilder::cups().get_printers();
        let response = self.exchange_ok("CUPS-Get-Printers", operation).await?;
        let printers = groups(&response, DelimiterTag::PrinterAttributes);
        debug!(count = printers.len(), "received printer list");
        Ok(printers)
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn get_printer_attributes(&self, queue: &str) -> Result<AttrMap> {
        let operation = IppOperationBuilder::get_printer_attributes(self.printer_uri(queue)?).build();
        let response = self.exchange_ok("Get-Printer-Attributes", operation).await?;
        let attrs = groups(&response, DelimiterTag::PrinterAttributes)
            .into_iter()
            .next()
            .unwrap_or_default();
        debug!(count = attrs.len(), "received printer attributes");
        Ok(attrs)
    }

    #[instrument(skip(self, file, attributes), fields(base = %self.base, bytes = file.content.len()))]
    async fn print_job(
        &self,
        queue: &str,
        job_title: &str,
        file: &PrintFile,
        format: &str,
        attributes: &[JobAttribute],
    ) -> Result<i32> {
        let payload = IppPayload::new(Cursor::new(file.content.clone()));
        let mut builder = IppOperationBuilder::print_job(self.printer_uri(queue)?, payload)
            .job_title(job_title)
            .document_format(format);
        for attribute in attributes {
            builder = builder.attribute(to_ipp_attribute(attribute));
        }
        let response = self.exchange_ok("Print-Job", builder.build()).await?;
        let job_id = job_id(&response)?;
        info!(job_id, "print job accepted by scheduler");
        Ok(job_id)
    }

    #[instrument(skip(self, attributes), fields(base = %self.base))]
    async fn create_job(&self, queue: &str, job_title: &str, attributes: &[JobAttribute]) -> Result<i32> {
        let mut builder = IppOperationBuilder::create_job(self.printer_uri(queue)?).job_name(job_title);
        for attribute in attributes {
            builder = builder.attribute(to_ipp_attribute(attribute));
        }
        let response = self.exchange_ok("Create-Job", builder.build()).await?;
        let job_id = job_id(&response)?;
        info!(job_id, "job created");
        Ok(job_id)
    }

    #[instrument(skip(self, file), fields(base = %self.base, bytes = file.content.len()))]
    async fn send_document(&self, queue: &str, job_id: i32, file: &PrintFile, format: &str, last: bool) -> Result<()> {
        let payload = IppPayload::new(Cursor::new(file.content.clone()));
        let mut request = IppOperationBuilder::send_document(self.printer_uri(queue)?, job_id, payload)
            .last(last)
            .build()
            .into_ipp_request();
        // The Send-Document builder has no setter for the format.
        request
            .attributes_mut()
            .add(DelimiterTag::OperationAttributes, document_format(format));
        self.exchange_ok("Send-Document", request).await?;
        debug!(job_id, last, format, "document sent");
        Ok(())
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn cancel_job(&self, queue: &str, job_id: i32) -> Result<()> {
        let operation = IppOperationBuilder::cancel_job(self.printer_uri(queue)?, job_id).build();
        info!(job_id, "sending Cancel-Job");
        self.exchange_ok("Cancel-Job", operation).await?;
        info!(job_id, "job cancelled");
        Ok(())
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn get_job_attributes(&self, job_id: i32) -> Result<Option<AttrMap>> {
        let operation = IppOperationBuilder::get_job_attributes(self.root_uri()?, job_id).build();
        let response = self.exchange("Get-Job-Attributes", operation).await?;
        let code = response.header().status_code();
        if code == StatusCode::ClientErrorNotFound {
            debug!(job_id, "job not found");
            return Ok(None);
        }
        if !code.is_success() {
            error!(job_id, status = ?code, "Get-Job-Attributes failed");
            return Err(PrintgateError::Spooler(format!(
                "Failed to get job attributes from CUPS: status {code:?}"
            )));
        }
        Ok(groups(&response, DelimiterTag::JobAttributes).into_iter().next())
    }
}

fn parse_uri(uri: &str) -> Result<Uri> {
    uri.parse()
        .map_err(|e| PrintgateError::Spooler(format!("invalid URI '{uri}': {e}")))
}

// ---------------------------------------------------------------------------
// Conversions between the IPP wire model and the local attribute model
// ---------------------------------------------------------------------------

fn document_format(format: &str) -> IppAttribute {
    IppAttribute::new("document-format", IppValue::MimeMediaType(format.to_string()))
}

fn groups(response: &IppRequestResponse, tag: DelimiterTag) -> Vec<AttrMap> {
    response
        .attributes()
        .groups_of(tag)
        .map(|group| {
            group
                .attributes()
                .iter()
                .map(|(name, attr)| (name.clone(), AttrValue::from(attr.value())))
                .collect()
        })
        .collect()
}

fn job_id(response: &IppRequestResponse) -> Result<i32> {
    groups(response, DelimiterTag::JobAttributes)
        .iter()
        .find_map(|group| group.get("job-id").and_then(AttrValue::as_integer))
        .ok_or_else(|| PrintgateError::Spooler("response missing job-id attribute".into()))
}

impl From<&IppValue> for AttrValue {
    fn from(value: &IppValue) -> Self {
        match value {
            IppValue::Integer(v) | IppValue::Enum(v) => AttrValue::Integer(*v),
            IppValue::Boolean(v) => AttrValue::Boolean(*v),
            IppValue::RangeOfInteger { min, max } => AttrValue::Range(*min, *max),
            IppValue::Resolution {
                cross_feed,
                feed,
                units,
            } => AttrValue::Resolution {
                cross_feed: *cross_feed,
                feed: *feed,
                units: *units,
            },
            IppValue::Array(items) => AttrValue::List(items.iter().map(AttrValue::from).collect()),
            other => AttrValue::Text(other.to_string()),
        }
    }
}

fn to_ipp_value(value: &JobValue) -> IppValue {
    match value {
        JobValue::Integer(v) => IppValue::Integer(*v),
        JobValue::Enum(v) => IppValue::Enum(*v),
        JobValue::Boolean(v) => IppValue::Boolean(*v),
        JobValue::Range(min, max) => IppValue::RangeOfInteger { min: *min, max: *max },
        JobValue::Resolution {
            cross_feed,
            feed,
            units,
        } => IppValue::Resolution {
            cross_feed: *cross_feed,
            feed: *feed,
            units: *units,
        },
        JobValue::Keyword(v) => IppValue::Keyword(v.clone()),
    }
}

fn to_ipp_attribute(attribute: &JobAttribute) -> IppAttribute {
    let value = match attribute.values.as_slice() {
        [single] => to_ipp_value(single),
        many => IppValue::Array(many.iter().map(to_ipp_value).collect()),
    };
    IppAttribute::new(attribute.name.as_str(), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_accepts_scheduler_uri() {
        let connection = CupsConnection::new("ipp://localhost:631/").unwrap();
        assert_eq!(connection.base(), "ipp://localhost:631");
        assert_eq!(
            connection.printer_uri("Office").unwrap().to_string(),
            "ipp://localhost:631/printers/Office"
        );
    }

    #[test]
    fn connection_rejects_invalid_uri() {
        assert!(CupsConnection::new("not a valid uri %%%").is_err());
    }

    #[test]
    fn document_format_is_a_mime_type() {
        let attribute = document_format("image/png");
        assert_eq!(attribute.name(), "document-format");
        assert_eq!(attribute.value(), &IppValue::MimeMediaType("image/png".into()));
    }

    #[test]
    fn arrays_and_ranges_convert() {
        let value = IppValue::Array(vec![
            IppValue::Keyword("one-sided".into()),
            IppValue::RangeOfInteger { min: 1, max: 5 },
        ]);
        assert_eq!(
            AttrValue::from(&value),
            AttrValue::List(vec![
                AttrValue::Text("one-sided".into()),
                AttrValue::Range(1, 5)
            ])
        );
    }

    #[test]
    fn multi_valued_options_become_arrays() {
        let attribute = JobAttribute {
            name: "finishings".into(),
            values: vec![JobValue::Enum(4), JobValue::Enum(5)],
        };
        let ipp = to_ipp_attribute(&attribute);
        assert_eq!(ipp.name(), "finishings");
        assert!(matches!(ipp.value(), IppValue::Array(items) if items.len() == 2));
    }
}
