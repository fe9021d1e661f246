//! Raw response parsing.
//!
//! # Overview
//! A transport hands back what it read off the wire: the status line, a flat
//! list of header lines and the body. `RawResponse::parse` turns that into
//! an immutable `Response` with a status code, a header multimap and the
//! cookies set by the server.
//!
//! # Design
//! - Header names compare case-insensitively and are stored lower-cased.
//! - Every header maps to an ordered list of values, so a repeated header
//!   (most often `Set-Cookie`) keeps all of its values in arrival order.
//! - The first `Content-Type` is stored without its parameters
//!   (`application/json; charset=utf-8` becomes `application/json`).
//! - Each `Set-Cookie` line contributes exactly one cookie: the first
//!   `name=value` pair, with attributes such as `path` dropped.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// Cookie name to value, in the order the server set them.
pub type Cookies = IndexMap<String, String>;

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(IndexMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, creating the entry on first sight.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of `name` in arrival order; empty when absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a transport read from the wire, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Status line first, then one entry per header line.
    pub lines: Vec<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(lines: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            lines,
            body: body.into(),
        }
    }

    pub fn parse(self) -> Result<Response> {
        Response::from_raw(self)
    }
}

/// A parsed HTTP response. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    cookies: Cookies,
    body: String,
}

impl Response {
    pub fn new(status: u16, headers: Headers, cookies: Cookies, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            cookies,
            body: body.into(),
        }
    }

    /// Parse a raw status line, header lines and body.
    ///
    /// Fails only when the status line carries no numeric code; any
    /// status, including 4xx and 5xx, parses successfully.
    pub fn from_raw(raw: RawResponse) -> Result<Self> {
        let mut lines = raw.lines.into_iter();
        let status_line = lines
            .next()
            .ok_or_else(|| Error::Transport("response has no status line".to_string()))?;
        let status = parse_status(&status_line)?;

        let mut headers = Headers::new();
        let mut cookies = Cookies::new();

        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();

            if name.eq_ignore_ascii_case("set-cookie") {
                if let Some((cookie, cookie_value)) = parse_set_cookie(value) {
                    cookies.insert(cookie, cookie_value);
                }
                headers.append(name, value);
            } else if name.eq_ignore_ascii_case("content-type") && !headers.contains(name) {
                headers.append(name, media_type(value));
            } else {
                headers.append(name, value);
            }
        }

        Ok(Self {
            status,
            headers,
            cookies,
            body: raw.body,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers.get_all(name)
    }

    /// Media type without parameters, e.g. `application/json`.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Decode the body as JSON. An empty body decodes to `{}`.
    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.body).map_err(|e| Error::Parse(e.to_string()))
    }
}

fn parse_status(line: &str) -> Result<u16> {
    line.split(' ')
        .nth(1)
        .and_then(|code| code.trim().parse().ok())
        .ok_or_else(|| Error::Transport(format!("malformed status line: {line:?}")))
}

/// `text/html; charset=iso-8859-1` -> `text/html`.
fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}

/// Extract the first `name=value` pair of a `Set-Cookie` value.
///
/// Literal `&` and `+` are protected before `;` is turned into the pair
/// separator, so only attribute boundaries split the value. Name and value
/// are then percent-decoded.
fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let protected = value
        .replace('&', "%26")
        .replace('+', "%2B")
        .replace(';', "&");
    let first = protected.split('&').next()?;
    let (name, value) = first.split_once('=').unwrap_or((first, ""));
    let name = decode(name.trim());
    if name.is_empty() {
        return None;
    }
    Some((name, decode(value)))
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
