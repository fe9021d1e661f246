//! Synchronous client for an OData-flavoured Service Layer.
//!
//! # Overview
//! Log in once with `Client::create_session`, then work with entity sets
//! through `Service` (create, update, delete, bound actions) and `Query`
//! (select, paging, ordering, expansion and composable filters).
//!
//! ```no_run
//! use b1sl_core::{Client, Config, Direction, Filter};
//!
//! # fn main() -> b1sl_core::Result<()> {
//! let client = Client::create_session(Config::new("sl.local"), "manager", "secret", "SBODEMO")?;
//! let open_orders = client
//!     .service("Orders")
//!     .query_builder()
//!     .select("DocEntry,CardCode,DocTotal")
//!     .and_where(Filter::equal("DocumentStatus", "bost_Open"))
//!     .order_by("DocEntry", Direction::Desc)
//!     .limit(20, 0)
//!     .find_all()?;
//! # let _ = open_orders;
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Requests are assembled as plain `HttpRequest` data and executed by a
//!   `Transport`; the transport returns the raw status line and header
//!   lines, which this crate parses itself into a `Response`.
//! - Filters are immutable values; the query builder pairs each with the
//!   `and`/`or` that joins it to the previous one.
//! - One request per call, no retries, no caching. Every failure is
//!   returned to the caller as an `Error`.

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod query;
pub mod response;
pub mod service;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{Config, SslOptions};
pub use error::{Error, Result, ServiceError};
pub use filter::{escape, Filter, FilterValue};
pub use http::{HttpMethod, HttpRequest};
pub use query::{BooleanOperator, Direction, Query};
pub use response::{Cookies, Headers, RawResponse, Response};
pub use service::{Service, UpdateOptions, UpdateOutcome};
pub use transport::{send, Transport, UreqTransport};
pub use types::{EntityId, LoginRequest, Session};
