//! Domain types shared by the client, services and queries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::quote;
use crate::response::Cookies;

/// Session cookies returned by `Login` and replayed on every later request.
pub type Session = Cookies;

/// Key of a single entity, rendered into the `(<key>)` URL segment.
///
/// String keys are quoted with embedded quotes doubled, the same way filter
/// values are; numeric keys are emitted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl EntityId {
    /// `(<key>)`, ready to append to a service URL.
    ///
    /// String keys are percent-encoded around the quoting, so `C 01`
    /// becomes `('C%2001')` while `O'Brien` stays `('O''Brien')`.
    pub fn key_segment(&self) -> String {
        match self {
            EntityId::Int(n) => format!("({n})"),
            EntityId::Str(s) => {
                let parts: Vec<_> = s.split('\'').map(urlencoding::encode).collect();
                format!("('{}')", parts.join("''"))
            }
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{n}"),
            EntityId::Str(s) => f.write_str(&quote(s)),
        }
    }
}

impl From<i64> for EntityId {
    fn from(v: i64) -> Self {
        EntityId::Int(v)
    }
}

impl From<i32> for EntityId {
    fn from(v: i32) -> Self {
        EntityId::Int(v.into())
    }
}

impl From<u32> for EntityId {
    fn from(v: u32) -> Self {
        EntityId::Int(v.into())
    }
}

impl From<&str> for EntityId {
    fn from(v: &str) -> Self {
        EntityId::Str(v.to_string())
    }
}

impl From<String> for EntityId {
    fn from(v: String) -> Self {
        EntityId::Str(v)
    }
}

/// Request payload for the `Login` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "CompanyDB")]
    pub company_db: String,
}
