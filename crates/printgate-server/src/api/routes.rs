// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request handlers.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse};
use serde_json::json;
use tracing::instrument;

use printgate_core::error::PrintgateError;
use printgate_core::types::PrinterSelector;
use printgate_print::PrintRequest;

use super::error::ApiError;
use super::fetch::resolve_files;
use super::models::{
    DomainSubmission, JobResponse, PrintJobPayload, PrinterResponse, PrintersResponse, decode_json,
    parse_selector,
};
use super::base_url;
use crate::AppState;
use crate::allowlist::{is_valid_origin, normalize_origin};
use crate::pages::{APPROVE_PAGE_HEADERS, IndexPage, approve_page};

/// `GET /`
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Html<String>, ApiError> {
    let printers = state.service.list_printers(&PrinterSelector::default()).await?;
    let api_base = base_url(&headers);
    let page = IndexPage {
        version: state.version,
        external_access: state.config.enable_external_access,
        api_base: &api_base,
        printers: &printers,
    };
    Ok(Html(page.render()))
}

/// `GET /printers`
pub async fn list_printers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PrintersResponse>, ApiError> {
    let selector = parse_selector(params.iter().map(|(k, v)| (k.as_str(), Some(v.as_str()))))?;
    let printers = state.service.list_printers(&selector).await?;
    Ok(Json(PrintersResponse {
        printers: printers.iter().map(PrinterResponse::from).collect(),
    }))
}

/// `POST /print-job`
#[instrument(skip_all)]
pub async fn submit_print_job(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let mut payload: PrintJobPayload = decode_json(&body)?;
    let selector = payload.selector()?;
    let options = payload.take_options();
    let descriptors = payload.take_files();
    if descriptors.is_empty() {
        return Err(PrintgateError::InvalidRequest("Must specify a list of files".into()).into());
    }
    let files = resolve_files(state.fetcher.as_ref(), &descriptors).await?;

    let request = PrintRequest {
        job_title: payload.job_title.unwrap_or_default(),
        options,
        is_async: payload.is_async.unwrap_or(false),
        files,
        selector,
        media: payload.media_size.unwrap_or_default(),
    };
    let submitted = state.service.submit_print(request).await?;
    let location = format!("/print-jobs/{}", submitted.job.job_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(JobResponse::new(&submitted.job, &submitted.warnings)),
    ))
}

/// `GET /print-jobs/{job_id}`
pub async fn get_print_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    match state.service.get_job(&job_id).await? {
        Some(job) => Ok(Json(JobResponse::new(&job, &[]))),
        None => Err(PrintgateError::JobNotFound(job_id).into()),
    }
}

/// `GET /domains/approve?origin=`
pub async fn approve_domain_page(
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let origin = params
        .get("origin")
        .filter(|o| !o.is_empty())
        .ok_or_else(|| PrintgateError::InvalidRequest("Must specify an origin parameter".into()))?;
    let normalized = normalize_origin(origin);
    if !is_valid_origin(&normalized) {
        return Err(PrintgateError::InvalidRequest("Origin parameter is invalid".into()).into());
    }
    Ok((APPROVE_PAGE_HEADERS, Html(approve_page(&normalized))))
}

/// `POST /domains/submit`
pub async fn submit_domain(State(state): State<AppState>, body: Bytes) -> Result<Json<serde_json::Value>, ApiError> {
    let submission: DomainSubmission = decode_json(&body)?;
    let origin = submission
        .origin
        .filter(|o| !o.is_empty())
        .ok_or_else(|| PrintgateError::InvalidRequest("No origin parameter specified".into()))?;
    state.allowlist.approve(&origin)?;
    Ok(Json(json!({})))
}
