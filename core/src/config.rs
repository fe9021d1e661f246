//! Connection settings for a Service Layer instance.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! host = "sl.example.com"
//! port = 50000      # default
//! version = 2       # default
//! https = true      # default false
//! timeout_secs = 30 # default: no timeout; fractions such as 1.5 allowed
//!
//! [ssl]
//! verify_peer = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 50000;
pub const DEFAULT_VERSION: u32 = 2;

/// TLS options passed through to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslOptions {
    /// Verify the server certificate chain and host name.
    pub verify_peer: bool,
}

impl Default for SslOptions {
    fn default() -> Self {
        Self { verify_peer: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub https: bool,
    #[serde(default, rename = "ssl")]
    pub ssl_options: SslOptions,
    /// Global per-request timeout. Written as `timeout_secs` in TOML.
    #[serde(default, rename = "timeout_secs", with = "timeout_secs")]
    pub timeout: Option<Duration>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

impl Config {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            port: DEFAULT_PORT,
            version: DEFAULT_VERSION,
            https: false,
            ssl_options: SslOptions::default(),
            timeout: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn with_ssl_options(mut self, ssl_options: SslOptions) -> Self {
        self.ssl_options = ssl_options;
        self
    }

    /// Global per-request timeout. `Duration::ZERO` means no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.host = config.host.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.host.contains("://") {
            return Err(Error::Config(format!(
                "host must not include a scheme, got {:?}; use `https` instead",
                self.host
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config("timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Full URL of a service, e.g. `https://host:50000/b1s/v2/Orders`.
    pub fn service_url(&self, service: &str) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}/b1s/v{}/{service}",
            self.host, self.port, self.version
        )
    }

    pub fn ssl_options(&self) -> &SslOptions {
        &self.ssl_options
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// `Option<Duration>` as (possibly fractional) seconds.
mod timeout_secs {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(timeout) => serializer.serialize_some(&timeout.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
