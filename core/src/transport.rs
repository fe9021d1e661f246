//! The I/O boundary.
//!
//! # Design
//! The rest of the crate never touches the network: it builds an
//! `HttpRequest`, asks a `Transport` for the raw status line, header lines
//! and body, and parses those itself. `UreqTransport` is the blocking
//! default. Tests substitute a transport that replays canned responses.

use std::time::Duration;

use tracing::{debug, trace};
use ureq::Agent;

use crate::config::{Config, SslOptions};
use crate::error::{Error, Result};
use crate::http::HttpRequest;
use crate::response::{RawResponse, Response};

/// Executes one HTTP round trip.
///
/// Implementations return every HTTP status as data. Only faults that
/// prevent a complete response (DNS, connect, TLS, IO, timeouts) are errors,
/// reported as `Error::Transport`.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse>;
}

/// Send `request` and parse the raw response.
pub fn send(transport: &dyn Transport, request: &HttpRequest) -> Result<Response> {
    debug!(method = %request.method, url = %request.url, "sending request");
    let response = transport.send(request)?.parse()?;
    debug!(status = response.status(), "received response");
    Ok(response)
}

/// Blocking transport backed by `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(ssl: &SslOptions, timeout: Option<Duration>) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!ssl.verify_peer)
            .build();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(tls)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ssl_options(), config.timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&SslOptions::default(), None)
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            // ureq frames the body itself.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => self
                .agent
                .run(builder.body(body.clone()).map_err(transport_error)?),
            None => self.agent.run(builder.body(()).map_err(transport_error)?),
        };
        let mut response = result.map_err(transport_error)?;

        let status = response.status();
        let mut lines = vec![format!(
            "{:?} {} {}",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )];
        for (name, value) in response.headers() {
            lines.push(format!(
                "{}: {}",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        trace!(?lines, "raw response head");

        // Bodies are buffered whole; ureq caps them at 10 MiB by default.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(transport_error)?;
        Ok(RawResponse::new(lines, body))
    }
}

fn transport_error(e: impl std::fmt::Display) -> Error {
    Error::Transport(e.to_string())
}
