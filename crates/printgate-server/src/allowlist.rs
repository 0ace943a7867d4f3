// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Origin allowlist: which web origins may drive the printers, the file that
// persists approvals, and the middleware that enforces it.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use printgate_core::error::{PrintgateError, Result};

use crate::AppState;
use crate::api::{ApiError, base_url};

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS, HEAD";
const ALLOW_HEADERS: &str = "Content-Type";
const MAX_AGE_SECS: &str = "86400";

/// Lowercase, drop trailing slashes, and drop the scheme's default port.
pub fn normalize_origin(origin: &str) -> String {
    let origin = origin.trim().to_lowercase();
    let origin = origin.trim_end_matches('/');
    let stripped = if origin.starts_with("http://") {
        origin.strip_suffix(":80")
    } else if origin.starts_with("https://") {
        origin.strip_suffix(":443")
    } else {
        None
    };
    stripped.unwrap_or(origin).to_string()
}

/// Whether `origin` is a normalized `http(s)://host[:port]`.
///
/// The host is a DNS name, an IPv4 address, or a bracketed IPv6 address.
/// Default ports must already have been removed by [`normalize_origin`].
pub fn is_valid_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    if origin.ends_with(":80") || origin.ends_with(":443") {
        return false;
    }

    let port = if let Some(inner) = rest.strip_prefix('[') {
        let Some((address, after)) = inner.split_once(']') else {
            return false;
        };
        let address_ok = !address.is_empty()
            && address
                .chars()
                .all(|c| matches!(c, ':' | '.' | 'a'..='f' | '0'..='9'));
        if !address_ok {
            return false;
        }
        after
    } else {
        let end = rest.find(':').unwrap_or(rest.len());
        let host = &rest[..end];
        let host_ok = !host.is_empty()
            && host
                .chars()
                .all(|c| matches!(c, '-' | '.' | 'a'..='z' | '0'..='9'));
        if !host_ok {
            return false;
        }
        &rest[end..]
    };

    match port.strip_prefix(':') {
        None => port.is_empty(),
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// Percent-encode a query value, leaving unreserved characters and `/`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(char::from(byte))
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Approved origins, optionally backed by a newline-separated file.
#[derive(Debug, Default)]
pub struct Allowlist {
    path: Option<PathBuf>,
    origins: RwLock<BTreeSet<String>>,
}

impl Allowlist {
    /// Read the allowlist file. A missing file is an empty list; lines that
    /// are not valid origins are skipped.
    pub fn load(path: PathBuf) -> Result<Self> {
        let origins = match std::fs::read_to_string(&path) {
            Ok(data) => data
                .lines()
                .map(normalize_origin)
                .filter(|origin| {
                    let valid = is_valid_origin(origin);
                    if !valid && !origin.is_empty() {
                        warn!(origin = %origin, "Ignoring malformed allowlist entry");
                    }
                    valid
                })
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(err) => return Err(err.into()),
        };
        info!(path = %path.display(), count = origins.len(), "Loaded origin allowlist");
        Ok(Self {
            path: Some(path),
            origins: RwLock::new(origins),
        })
    }

    /// A list that forgets approvals on restart.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Allow `origin` for this run only.
    pub fn allow(&self, origin: &str) {
        let origin = normalize_origin(origin);
        if is_valid_origin(&origin) {
            self.origins
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(origin);
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize_origin(origin))
    }

    pub fn origins(&self) -> Vec<String> {
        self.origins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Allow `origin` and append it to the allowlist file.
    ///
    /// Already-approved origins are not written twice.
    pub fn approve(&self, origin: &str) -> Result<()> {
        let origin = normalize_origin(origin);
        if !is_valid_origin(&origin) {
            return Err(PrintgateError::InvalidRequest(
                "The origin parameter is invalid".into(),
            ));
        }
        let mut origins = self.origins.write().unwrap_or_else(PoisonError::into_inner);
        if origins.contains(&origin) {
            return Ok(());
        }
        if let Some(path) = &self.path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{origin}")?;
        }
        info!(origin = %origin, "Origin approved");
        origins.insert(origin);
        Ok(())
    }
}

/// Reject requests from origins that have not been approved, and add CORS
/// headers to every response that carried an `Origin`.
///
/// Requests without an `Origin` header (curl, same-origin GETs) pass
/// through untouched.
pub async fn enforce_origin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header_value = request
        .headers()
        .get(header::ORIGIN)
        .filter(|value| !value.is_empty())
        .cloned();

    if request.method() == Method::OPTIONS {
        let response = StatusCode::OK.into_response();
        return match header_value {
            Some(value) => with_cors(response, value),
            None => response,
        };
    }
    let Some(value) = header_value else {
        return next.run(request).await;
    };

    let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
    let origin = normalize_origin(&raw);
    let response = if !is_valid_origin(&origin) {
        ApiError::from(PrintgateError::InvalidOrigin(raw)).into_response()
    } else if state.allowlist.is_allowed(&origin) || is_own_origin(request.headers(), &origin) {
        next.run(request).await
    } else {
        warn!(origin = %origin, path = %request.uri().path(), "Request from unapproved origin");
        let approve_url = format!(
            "{}/domains/approve?origin={}",
            base_url(request.headers()),
            quote(&origin)
        );
        ApiError::from(PrintgateError::OriginNotAllowed { origin, approve_url }).into_response()
    };
    with_cors(response, value)
}

/// Pages served by the gateway itself (the approval form) post back with
/// the gateway's own origin.
fn is_own_origin(headers: &HeaderMap, origin: &str) -> bool {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .is_some_and(|host| normalize_origin(&format!("http://{host}")) == origin)
}

fn with_cors(mut response: Response, origin: HeaderValue) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_drops_case_slash_and_default_port() {
        assert_eq!(normalize_origin("HTTPS://Shop.Example.com/"), "https://shop.example.com");
        assert_eq!(normalize_origin("http://localhost:80"), "http://localhost");
        assert_eq!(normalize_origin("https://localhost:443//"), "https://localhost");
        assert_eq!(normalize_origin("http://localhost:443"), "http://localhost:443");
        assert_eq!(normalize_origin("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn valid_origins() {
        for origin in [
            "http://localhost",
            "https://shop.example.com",
            "http://127.0.0.1:8080",
            "http://[::1]:3000",
            "https://[fe80::1]",
        ] {
            assert!(is_valid_origin(origin), "{origin}");
        }
    }

    #[test]
    fn invalid_origins() {
        for origin in [
            "",
            "null",
            "shop.example.com",
            "ftp://shop.example.com",
            "https://",
            "https://shop.example.com/path",
            "https://Shop.example.com",
            "http://localhost:",
            "http://localhost:http",
            "https://shop.example.com:80",
            "http://localhost:443",
            "http://[::1",
            "http://[zz::1]",
        ] {
            assert!(!is_valid_origin(origin), "{origin}");
        }
    }

    #[test]
    fn quote_keeps_slashes() {
        assert_eq!(quote("https://shop.example.com"), "https%3A//shop.example.com");
        assert_eq!(quote("http://[::1]:80"), "http%3A//%5B%3A%3A1%5D%3A80");
    }

    #[test]
    fn approvals_are_persisted_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_domains.txt");
        std::fs::write(&path, "https://a.example\nnot an origin\n\n").unwrap();

        let allowlist = Allowlist::load(path.clone()).unwrap();
        assert_eq!(allowlist.origins(), vec!["https://a.example"]);

        allowlist.approve("HTTPS://B.example/").unwrap();
        allowlist.approve("https://b.example").unwrap();
        allowlist.approve("https://a.example").unwrap();
        assert!(allowlist.is_allowed("https://b.example"));

        let reloaded = Allowlist::load(path.clone()).unwrap();
        assert_eq!(reloaded.origins(), vec!["https://a.example", "https://b.example"]);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("https://b.example").count(), 1);
    }

    #[test]
    fn invalid_approval_is_rejected() {
        let allowlist = Allowlist::in_memory();
        let err = allowlist.approve("javascript:alert(1)").unwrap_err();
        assert_eq!(err.to_string(), "The origin parameter is invalid");
        assert!(allowlist.origins().is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let allowlist = Allowlist::load(dir.path().join("absent.txt")).unwrap();
        assert!(allowlist.origins().is_empty());
        allowlist.allow("http://localhost:8080");
        assert!(allowlist.is_allowed("http://LOCALHOST:8080/"));
    }
}
