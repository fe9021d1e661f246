//! HTTP request types for the host-does-IO pattern.
//!
//! # Design
//! Requests are plain data. The client assembles an `HttpRequest` (method,
//! URL, header list, body) and hands it to a `Transport`, which performs the
//! round trip and returns the raw status line and header lines. Keeping
//! assembly separate from I/O makes every header the client sends visible
//! to tests.

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::response::Cookies;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `headers` is ordered and may repeat names; a transport sends them in
/// this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Assemble a request the way the Service Layer expects it.
    ///
    /// The header list always starts with `Content-Type: application/json`
    /// and a `Content-Length` matching the serialized body (0 without one).
    /// All session cookies are folded into a single `Cookie` header as
    /// `name=value;` pairs, then `extra_headers` follow verbatim.
    pub fn assemble(
        method: HttpMethod,
        url: impl Into<String>,
        extra_headers: &[(String, String)],
        cookies: &Cookies,
        body: Option<&Value>,
    ) -> Result<Self> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let length = body.as_ref().map_or(0, String::len);

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Content-Length".to_string(), length.to_string()),
        ];
        if !cookies.is_empty() {
            headers.push(("Cookie".to_string(), fold_cookies(cookies)));
        }
        headers.extend(extra_headers.iter().cloned());

        Ok(Self {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn fold_cookies(cookies: &Cookies) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value};"))
        .collect()
}
