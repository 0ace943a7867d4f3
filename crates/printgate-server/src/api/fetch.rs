// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turning `files[]` descriptors into in-memory documents.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::PrintFile;

use super::models::FileDescriptor;

/// Downloads a document named by URL.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PrintFile>;
}

/// Plain HTTP(S) GET through reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<PrintFile> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| PrintgateError::Fetch(err.to_string()))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let content = response
            .bytes()
            .await
            .map_err(|err| PrintgateError::Fetch(err.to_string()))?;
        debug!(bytes = content.len(), content_type = %content_type, "Fetched file");
        Ok(PrintFile::new(content_type, content.to_vec()))
    }
}

/// Resolve every descriptor, in order.
///
/// Each distinct URL is downloaded once and all downloads run concurrently.
/// Nothing is returned until every download has finished.
pub async fn resolve_files(fetcher: &dyn FileFetcher, descriptors: &[FileDescriptor]) -> Result<Vec<PrintFile>> {
    let mut urls: Vec<&str> = Vec::new();
    for url in descriptors.iter().filter_map(|d| d.file_url.as_deref()) {
        if url.is_empty() {
            return Err(PrintgateError::InvalidRequest(format!("Invalid fileUrl: {url:?}")));
        }
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    let downloads = join_all(urls.iter().map(|url| fetcher.fetch(url))).await;
    let mut fetched: HashMap<&str, Result<PrintFile>> = urls.into_iter().zip(downloads).collect();

    let mut files = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let file = match descriptor.file_url.as_deref() {
            Some(url) => match fetched.get(url) {
                Some(Ok(file)) => file.clone(),
                Some(Err(_)) => {
                    // Surface the first failure in request order.
                    return Err(match fetched.remove(url) {
                        Some(Err(err)) => err,
                        _ => PrintgateError::Fetch(url.to_string()),
                    });
                }
                None => return Err(PrintgateError::Fetch(url.to_string())),
            },
            None => decode_inline(descriptor)?,
        };
        files.push(file);
    }
    Ok(files)
}

fn decode_inline(descriptor: &FileDescriptor) -> Result<PrintFile> {
    let content_type = descriptor
        .content_type
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            PrintgateError::InvalidRequest("Must specify files[].contentType or files[].fileUrl".into())
        })?;
    let encoded = descriptor
        .base64
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            PrintgateError::InvalidRequest("Must specify files[].contentType or files[].base64".into())
        })?;
    let content = STANDARD
        .decode(encoded)
        .map_err(|err| PrintgateError::InvalidRequest(format!("Value for files[].base64 is invalid: {err}")))?;
    Ok(PrintFile::new(content_type, content))
}
