//! CRUD operations on one entity set.
//!
//! Each call is a single request through the client's transport. Success is
//! 201 for create, 204 for delete, and 204 or 200 for update and actions. A
//! 200 or 201 body is decoded as JSON. Any other status is returned as
//! `Error::Service`.

use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::{Error, Result, ServiceError};
use crate::http::HttpMethod;
use crate::query::Query;
use crate::response::Response;
use crate::types::EntityId;

/// Options for `Service::update_with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// `PATCH` merges fields; `PUT` replaces the entity.
    pub method: HttpMethod,
    /// Ask the server to answer 200 with the updated entity instead of 204.
    pub return_response: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Patch,
            return_response: false,
        }
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// 204, no body.
    NoContent,
    /// 200 with the entity as stored after the update.
    Entity(Value),
}

pub struct Service<'a> {
    client: &'a Client,
    name: String,
    headers: Vec<(String, String)>,
}

impl<'a> Service<'a> {
    pub(crate) fn new(client: &'a Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
            headers: Vec::new(),
        }
    }

    /// Extra header sent with every request of this service, queries included.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an entity and return it as stored by the server.
    pub fn create<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value> {
        let body = to_body(data)?;
        let response = self.request(HttpMethod::Post, "", &self.headers, Some(&body))?;
        match response.status() {
            201 => response.json(),
            _ => Err(ServiceError::from_response(&response).into()),
        }
    }

    /// PATCH the entity with `id`.
    pub fn update<T: Serialize + ?Sized>(&self, id: impl Into<EntityId>, data: &T) -> Result<bool> {
        self.update_with(id, data, &UpdateOptions::default())
            .map(|_| true)
    }

    pub fn update_with<T: Serialize + ?Sized>(
        &self,
        id: impl Into<EntityId>,
        data: &T,
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let body = to_body(data)?;
        let mut headers = self.headers.clone();
        if options.return_response {
            headers.push(("Prefer".to_string(), "return=representation".to_string()));
        }
        let suffix = id.into().key_segment();
        let response = self.request(options.method, &suffix, &headers, Some(&body))?;
        match response.status() {
            204 => Ok(UpdateOutcome::NoContent),
            200 => response.json().map(UpdateOutcome::Entity),
            _ => Err(ServiceError::from_response(&response).into()),
        }
    }

    pub fn delete(&self, id: impl Into<EntityId>) -> Result<bool> {
        let suffix = id.into().key_segment();
        let response = self.request(HttpMethod::Delete, &suffix, &self.headers, None)?;
        match response.status() {
            204 => Ok(true),
            _ => Err(ServiceError::from_response(&response).into()),
        }
    }

    /// Invoke a bound action, e.g. `action(12, "Close")` posts to
    /// `Orders(12)/Close`.
    ///
    /// A 200 body must decode as JSON (an empty body counts as `{}`);
    /// otherwise the call fails with `Error::Parse`.
    pub fn action(&self, id: impl Into<EntityId>, action: &str) -> Result<bool> {
        let suffix = format!("{}/{action}", id.into().key_segment());
        let response = self.request(HttpMethod::Post, &suffix, &self.headers, None)?;
        match response.status() {
            204 => Ok(true),
            200 => response.json().map(|_| true),
            _ => Err(ServiceError::from_response(&response).into()),
        }
    }

    pub fn query_builder(&self) -> Query<'a> {
        Query::new(self.client, self.name.clone(), self.headers.clone())
    }

    fn request(
        &self,
        method: HttpMethod,
        suffix: &str,
        headers: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let target = format!("{}{suffix}", self.name);
        let request = self.client.build_request(method, &target, headers, body)?;
        self.client.dispatch(&request)
    }
}

fn to_body<T: Serialize + ?Sized>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| Error::Serialization(e.to_string()))
}
