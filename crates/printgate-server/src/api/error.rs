// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use printgate_core::error::{ErrorKind, PrintgateError};

/// A [`PrintgateError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PrintgateError);

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub title: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PrintgateError> for ApiError {
    fn from(err: PrintgateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        let href = match &self.0 {
            PrintgateError::OriginNotAllowed { approve_url, .. } => Some(approve_url.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            title: self.0.title(),
            description: self.0.to_string(),
            href,
        };
        (status, Json(body)).into_response()
    }
}
