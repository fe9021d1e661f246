//! Canned-response transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::http::HttpRequest;
use crate::response::RawResponse;
use crate::transport::Transport;

/// Replays queued responses in order and records every request sent.
/// Clones share the same queue and log.
#[derive(Clone, Default)]
pub(crate) struct ReplayTransport {
    responses: Rc<RefCell<VecDeque<RawResponse>>>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl ReplayTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, lines: &[&str], body: &str) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.responses
            .borrow_mut()
            .push_back(RawResponse::new(lines, body));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for ReplayTransport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Transport("no response queued".to_string()))
    }
}
