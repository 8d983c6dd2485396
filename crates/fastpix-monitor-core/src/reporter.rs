//! Request outcome reporting
//!
//! Every intercepted request is evaluated on each ready-state change. Only
//! the terminal state (`DONE`) produces an outcome:
//! - 2xx with a non-empty body -> `requestCompleted`
//! - 2xx with an empty body    -> nothing
//! - anything else             -> `requestFailed`

use crate::collector::Collector;
use crate::content::{classify, RequestType};
use crate::error::Error;
use crate::headers::{filter_headers, FilteredHeaders};
use crate::host::{ready_state, ResponseBody, XhrRequest};
use crate::lifecycle::SessionRoute;
use crate::types::{events, to_attributes, Attributes};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::trace;

/// Attributes of a successful request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRequest {
    pub request_start: f64,
    pub request_response_start: f64,
    pub request_response_end: f64,
    pub request_bytes_loaded: usize,
    pub request_hostname: String,
    pub request_url: String,
    pub request_response_headers: FilteredHeaders,
    pub request_type: RequestType,
}

/// Attributes of a request that finished with a non-2xx status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub request_hostname: String,
    pub request_url: String,
    pub request_type: RequestType,
}

/// Terminal result of a tracked request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Completed(CompletedRequest),
    Failed(FailedRequest),
}

impl RequestOutcome {
    pub fn event_name(&self) -> &'static str {
        match self {
            RequestOutcome::Completed(_) => events::REQUEST_COMPLETED,
            RequestOutcome::Failed(_) => events::REQUEST_FAILED,
        }
    }

    /// Empty successful responses are not reported
    pub fn should_dispatch(&self) -> bool {
        match self {
            RequestOutcome::Completed(completed) => completed.request_bytes_loaded > 0,
            RequestOutcome::Failed(_) => true,
        }
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            RequestOutcome::Completed(completed) => to_attributes(completed),
            RequestOutcome::Failed(failed) => to_attributes(failed),
        }
    }
}

/// Size of the response body: byte length for `arraybuffer` responses,
/// string length (UTF-16 units) for text responses
pub fn bytes_loaded(request: &dyn XhrRequest) -> Result<usize, Error> {
    let body = request.response();
    let binary = request.response_type() == "arraybuffer";

    match (binary, body) {
        (_, ResponseBody::Empty) => Ok(0),
        (true, ResponseBody::ArrayBuffer(bytes)) => Ok(bytes.len()),
        (false, ResponseBody::Text(text)) => Ok(text.encode_utf16().count()),
        (true, other) => Err(Error::ResponseMismatch {
            expected: "arraybuffer",
            found: other.kind(),
        }),
        (false, other) => Err(Error::ResponseMismatch {
            expected: "text",
            found: other.kind(),
        }),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Evaluate a request at its current ready state
///
/// Returns `Ok(None)` until the request reaches `DONE`.
pub fn evaluate(
    request: &dyn XhrRequest,
    request_start: f64,
    collector: &dyn Collector,
) -> anyhow::Result<Option<RequestOutcome>> {
    let state = request.ready_state();
    if state < ready_state::HEADERS_RECEIVED {
        return Ok(None);
    }

    let response_start = request.request_time().unwrap_or_else(|| collector.now());
    if state != ready_state::DONE {
        return Ok(None);
    }

    let url = request.response_url();
    let hostname = collector.fetch_host(&url);
    let bytes = bytes_loaded(request)?;
    let response_end = collector.now();
    let headers = filter_headers(&request.all_response_headers());
    let request_type = classify(&headers);

    let outcome = if is_success(request.status()) {
        RequestOutcome::Completed(CompletedRequest {
            request_start,
            request_response_start: response_start,
            request_response_end: response_end,
            request_bytes_loaded: bytes,
            request_hostname: hostname,
            request_url: url,
            request_response_headers: headers,
            request_type,
        })
    } else {
        RequestOutcome::Failed(FailedRequest {
            request_hostname: hostname,
            request_url: url,
            request_type,
        })
    };

    Ok(Some(outcome))
}

/// Dispatches request outcomes into whichever session the route points at
#[derive(Clone)]
pub struct RequestReporter {
    collector: Rc<dyn Collector>,
    route: SessionRoute,
}

impl RequestReporter {
    pub fn new(collector: Rc<dyn Collector>, route: SessionRoute) -> Self {
        Self { collector, route }
    }

    /// Handle one ready-state change of a tracked request
    pub fn observe(&self, request: &dyn XhrRequest, request_start: f64) -> anyhow::Result<()> {
        let Some(outcome) = evaluate(request, request_start, self.collector.as_ref())? else {
            return Ok(());
        };

        if outcome.should_dispatch() {
            self.route.dispatch(outcome.event_name(), outcome.attributes());
        } else {
            trace!(url = %request.response_url(), "Empty response not reported");
        }
        Ok(())
    }

    pub fn collector(&self) -> &dyn Collector {
        self.collector.as_ref()
    }

    pub fn route(&self) -> &SessionRoute {
        &self.route
    }
}
