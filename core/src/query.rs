//! OData query builder.
//!
//! # Overview
//! A `Query` accumulates query options (`$select`, `$top`, `$skip`,
//! `$orderby`, `$inlinecount`, `$expand`) and an ordered list of filters,
//! then runs exactly one terminal action: `count`, `find`, `find_all` or
//! `find_all_with`. Terminal actions take the builder by value, so a query
//! cannot be reused once it has run.
//!
//! # Serialization
//! Options are emitted in first-set order as `$name=<encoded>&`; setting an
//! option twice keeps its position and replaces its value. Filters follow as
//! a single `$filter=` parameter: each filter after the first is preceded by
//! its encoded ` and ` / ` or `, and the whole expression is one continuous
//! percent-encoded run.

use indexmap::IndexMap;
use serde_json::Value;

use crate::client::Client;
use crate::error::{Error, Result, ServiceError};
use crate::filter::Filter;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::EntityId;

/// How a filter joins the filters attached before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

impl BooleanOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A decoded 200 response.
enum Payload {
    Text(String),
    Json(Value),
}

/// Query builder bound to one service of a logged-in client.
pub struct Query<'a> {
    client: &'a Client,
    target: String,
    headers: Vec<(String, String)>,
    params: IndexMap<&'static str, String>,
    filters: Vec<(BooleanOperator, Filter)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(client: &'a Client, target: String, headers: Vec<(String, String)>) -> Self {
        Self {
            client,
            target,
            headers,
            params: IndexMap::new(),
            filters: Vec::new(),
        }
    }

    /// `$select`, a comma-separated field list.
    pub fn select(mut self, fields: &str) -> Self {
        self.params.insert("select", fields.to_string());
        self
    }

    /// `$select=*`.
    pub fn select_all(self) -> Self {
        self.select("*")
    }

    /// `$top` and `$skip` together.
    pub fn limit(mut self, top: u32, skip: u32) -> Self {
        self.params.insert("top", top.to_string());
        self.params.insert("skip", skip.to_string());
        self
    }

    /// Replace `$skip` only.
    pub fn skip(mut self, skip: u32) -> Self {
        self.params.insert("skip", skip.to_string());
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.params
            .insert("orderby", format!("{field} {}", direction.as_str()));
        self
    }

    /// Ask for the total match count alongside the page (`allpages`).
    pub fn inline_count(mut self) -> Self {
        self.params.insert("inlinecount", "allpages".to_string());
        self
    }

    pub fn expand(mut self, name: &str) -> Self {
        self.params.insert("expand", name.to_string());
        self
    }

    /// Attach a filter joined with `and`.
    pub fn and_where(mut self, filter: Filter) -> Self {
        self.filters.push((BooleanOperator::And, filter));
        self
    }

    /// Attach a filter joined with `or`.
    pub fn or_where(mut self, filter: Filter) -> Self {
        self.filters.push((BooleanOperator::Or, filter));
        self
    }

    /// The encoded query string, always starting with `?`.
    pub fn query_string(&self) -> String {
        let mut query = String::from("?");
        for (name, value) in &self.params {
            query.push('$');
            query.push_str(name);
            query.push('=');
            query.push_str(&urlencoding::encode(value));
            query.push('&');
        }

        if !self.filters.is_empty() {
            query.push_str("$filter=");
            for (idx, (op, filter)) in self.filters.iter().enumerate() {
                if idx > 0 {
                    query.push_str(&urlencoding::encode(&format!(" {} ", op.as_str())));
                }
                query.push_str(&urlencoding::encode(&filter.execute()));
            }
        }
        query
    }

    /// The GET request a terminal action with `suffix` would send.
    pub fn build_request(&self, suffix: &str) -> Result<HttpRequest> {
        let target = format!("{}{suffix}{}", self.target, self.query_string());
        self.client
            .build_request(HttpMethod::Get, &target, &self.headers, None)
    }

    /// Number of matching entities (`/$count`).
    pub fn count(self) -> Result<u64> {
        match self.fetch("/$count")? {
            Payload::Text(body) => body
                .trim()
                .parse()
                .map_err(|_| Error::Parse(format!("invalid count: {body:?}"))),
            Payload::Json(value) => value
                .as_u64()
                .ok_or_else(|| Error::Parse(format!("invalid count: {value}"))),
        }
    }

    /// A single entity by key.
    pub fn find(self, id: impl Into<EntityId>) -> Result<Value> {
        let suffix = id.into().key_segment();
        self.fetch(&suffix).map(Payload::into_value)
    }

    /// All matching entities, as the decoded `{"value": [...]}` envelope.
    pub fn find_all(self) -> Result<Value> {
        self.find_all_with(|_, _| {})
    }

    /// Like `find_all`, calling `callback(item, index)` for each element of
    /// the envelope's `value` array first. The returned envelope is the same.
    pub fn find_all_with<F>(self, mut callback: F) -> Result<Value>
    where
        F: FnMut(&Value, usize),
    {
        let result = self.fetch("")?.into_value();
        if let Some(items) = result.get("value").and_then(Value::as_array) {
            for (index, item) in items.iter().enumerate() {
                callback(item, index);
            }
        }
        Ok(result)
    }

    fn fetch(&self, suffix: &str) -> Result<Payload> {
        let request = self.build_request(suffix)?;
        let response = self.client.dispatch(&request)?;
        if response.status() != 200 {
            return Err(ServiceError::from_response(&response).into());
        }

        let content_type = response.content_type().map(str::to_string);
        match content_type.as_deref() {
            Some("text/plain") => Ok(Payload::Text(response.into_body())),
            Some("application/json") => response.json().map(Payload::Json),
            _ => Err(Error::UnexpectedContentType(content_type)),
        }
    }
}

impl Payload {
    fn into_value(self) -> Value {
        match self {
            Payload::Text(body) => Value::String(body),
            Payload::Json(value) => value,
        }
    }
}
