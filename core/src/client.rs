//! Session-holding entry point.
//!
//! # Design
//! `Client` owns the configuration, the session cookies returned by `Login`
//! and the transport. It never changes the session after construction:
//! every request replays the same cookies. `Service` and `Query` borrow the
//! client, so one login can serve any number of services.

use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result, ServiceError};
use crate::http::{HttpMethod, HttpRequest};
use crate::query::Query;
use crate::response::Response;
use crate::service::Service;
use crate::transport::{self, Transport, UreqTransport};
use crate::types::{LoginRequest, Session};

/// A logged-in connection to one Service Layer instance.
pub struct Client {
    config: Config,
    session: Session,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Wrap an existing session, e.g. one restored from storage.
    pub fn new(config: Config, session: Session) -> Self {
        let transport = UreqTransport::from_config(&config);
        Self::with_transport(config, session, transport)
    }

    pub fn with_transport(
        config: Config,
        session: Session,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            config,
            session,
            transport: Box::new(transport),
        }
    }

    /// Log in and return a client holding the new session cookies.
    pub fn create_session(
        config: Config,
        user_name: &str,
        password: &str,
        company_db: &str,
    ) -> Result<Self> {
        let transport = UreqTransport::from_config(&config);
        Self::create_session_with(config, transport, user_name, password, company_db)
    }

    /// `create_session` over a caller-supplied transport.
    pub fn create_session_with(
        config: Config,
        transport: impl Transport + 'static,
        user_name: &str,
        password: &str,
        company_db: &str,
    ) -> Result<Self> {
        let login = LoginRequest {
            user_name: user_name.to_string(),
            password: password.to_string(),
            company_db: company_db.to_string(),
        };
        let body = serde_json::to_value(&login).map_err(|e| Error::Serialization(e.to_string()))?;
        let request = HttpRequest::assemble(
            HttpMethod::Post,
            config.service_url("Login"),
            &[],
            &Session::new(),
            Some(&body),
        )?;

        let response = transport::send(&transport, &request)?;
        if response.status() != 200 {
            return Err(ServiceError::from_response(&response).into());
        }
        debug!(company_db, cookies = response.cookies().len(), "session created");
        Ok(Self::with_transport(config, response.cookies().clone(), transport))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cookies sent with every request.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn service(&self, name: &str) -> Service<'_> {
        Service::new(self, name)
    }

    /// A query over `$crossjoin(<entity sets>)`, e.g. `"Orders, Items"`.
    pub fn query(&self, join: &str) -> Query<'_> {
        let join: String = join.chars().filter(|c| *c != ' ').collect();
        Query::new(self, format!("$crossjoin({join})"), Vec::new())
    }

    /// The service's OData metadata document as raw XML.
    pub fn metadata(&self) -> Result<String> {
        let request = self.build_request(HttpMethod::Get, "$metadata", &[], None)?;
        let response = self.dispatch(&request)?;
        if response.status() != 200 {
            return Err(ServiceError::from_response(&response).into());
        }
        Ok(response.into_body())
    }

    /// Assemble a request for `target`, relative to the versioned root.
    pub fn build_request(
        &self,
        method: HttpMethod,
        target: &str,
        extra_headers: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<HttpRequest> {
        HttpRequest::assemble(
            method,
            self.config.service_url(target),
            extra_headers,
            &self.session,
            body,
        )
    }

    pub(crate) fn dispatch(&self, request: &HttpRequest) -> Result<Response> {
        transport::send(self.transport.as_ref(), request)
    }
}
