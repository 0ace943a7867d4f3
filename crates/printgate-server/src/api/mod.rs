// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON API: payloads, handlers, and error mapping.

pub mod error;
pub mod fetch;
pub mod models;
pub mod routes;

use axum::http::{HeaderMap, header};

pub use error::ApiError;
pub use fetch::{FileFetcher, HttpFetcher};

/// `http://{Host}` as the client addressed us, or empty (relative links)
/// when the request carried no usable `Host`.
pub fn base_url(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .filter(|host| !host.is_empty())
        .map(|host| format!("http://{host}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn base_url_from_host() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers), "");
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3888"));
        assert_eq!(base_url(&headers), "http://localhost:3888");
    }
}
