//! Operation handle: what the initial response of a mutating call tells us
//! about how to follow it to completion.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::state::OperationState;
use crate::arm::http::{http_error, ArmRequest, RawResponse};
use crate::error::{Error, Result};

pub const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
pub const LOCATION: &str = "Location";
pub const RETRY_AFTER: &str = "Retry-After";

/// Millisecond variants some services send instead of `Retry-After`
const RETRY_AFTER_MS_HEADERS: &[&str] = &["retry-after-ms", "x-ms-retry-after-ms"];

/// Where the poll loop gets its state from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingStrategy {
    /// `Azure-AsyncOperation` status resource with a `status` field
    AsyncOperation,
    /// `Location` URL; 202 while running, 200/201/204 when done
    Location,
    /// The resource itself, via `properties.provisioningState`
    ProvisioningState,
    /// Completed synchronously, nothing to poll
    Completed,
}

/// State of one long-running operation
#[derive(Debug, Clone)]
pub struct OperationHandle {
    pub operation: String,
    /// Verb that started the operation
    pub method: Method,
    /// URL the operation was started against
    pub resource_url: String,
    pub polling_url: String,
    pub strategy: PollingStrategy,
    state: OperationState,
    /// Body of the most recent response, verbatim
    pub last_response_body: Vec<u8>,
    /// Most recent server-suggested delay
    pub retry_after: Option<Duration>,
    /// Verb used for polling requests
    pub poll_method: Method,
    /// Where a POST's result lives once the status resource says Succeeded
    pub final_state_url: Option<String>,
}

impl OperationHandle {
    /// Inspect the initial response of a mutating call
    pub fn start(
        operation: &str,
        method: Method,
        resource_url: &str,
        response: &RawResponse,
    ) -> Result<Self> {
        if !response.status.is_success() {
            let request = ArmRequest::new(operation, method, resource_url);
            return Err(http_error(&request, response));
        }

        let async_url = polling_header(response, AZURE_ASYNC_OPERATION, operation);
        let location = polling_header(response, LOCATION, operation);

        let (strategy, polling_url) = match (async_url, location.clone()) {
            (Some(url), _) => (PollingStrategy::AsyncOperation, url),
            (None, Some(url)) => (PollingStrategy::Location, url),
            (None, None) if response.status == StatusCode::ACCEPTED => {
                return Err(Error::MalformedAsyncResponse {
                    operation: operation.to_string(),
                    url: resource_url.to_string(),
                    status: response.status,
                });
            }
            (None, None) if provisioning_in_flight(&method, response) => {
                (PollingStrategy::ProvisioningState, resource_url.to_string())
            }
            (None, None) => (PollingStrategy::Completed, resource_url.to_string()),
        };

        let state = match strategy {
            PollingStrategy::Completed => OperationState::Succeeded,
            _ => OperationState::InProgress,
        };

        let final_state_url = match strategy {
            PollingStrategy::AsyncOperation => location.filter(|l| *l != polling_url),
            _ => None,
        };

        Ok(Self {
            operation: operation.to_string(),
            method,
            resource_url: resource_url.to_string(),
            polling_url,
            strategy,
            state,
            last_response_body: response.body.clone(),
            retry_after: parse_retry_after(response),
            poll_method: Method::GET,
            final_state_url,
        })
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply the outcome of a poll.
    ///
    /// Transitions out of a terminal state are logged and dropped; returns
    /// whether the update was applied.
    pub fn record(
        &mut self,
        next: OperationState,
        body: Vec<u8>,
        retry_after: Option<Duration>,
    ) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "{}: ignoring state transition {} -> {} for {}",
                self.operation,
                self.state,
                next,
                self.polling_url
            );
            return false;
        }

        if self.state != next {
            tracing::debug!("{}: {} -> {}", self.operation, self.state, next);
        }
        self.state = next;
        self.last_response_body = body;
        self.retry_after = retry_after;
        true
    }

    /// URL to GET once the operation succeeded without a usable body
    pub fn final_get_url(&self) -> Option<&str> {
        match self.method {
            Method::DELETE => None,
            Method::POST => self.final_state_url.as_deref(),
            _ => Some(&self.resource_url),
        }
    }

    /// Whether the last body can be handed back as the operation's result
    pub fn has_usable_body(&self) -> bool {
        if self.last_response_body.iter().all(u8::is_ascii_whitespace) {
            return false;
        }

        // A status resource is not the resource a PUT/PATCH created, nor the
        // result a POST pointed at with a separate Location
        let expects_resource = matches!(self.method, Method::PUT | Method::PATCH)
            || (self.method == Method::POST && self.final_state_url.is_some());
        if self.strategy == PollingStrategy::AsyncOperation && expects_resource {
            let value: Option<Value> = serde_json::from_slice(&self.last_response_body).ok();
            return !value
                .as_ref()
                .is_some_and(crate::models::OperationStatus::is_envelope);
        }

        true
    }
}

/// Absolute http(s) URL from a polling header; anything else is ignored
fn polling_header(response: &RawResponse, name: &str, operation: &str) -> Option<String> {
    let value = response.header(name)?;
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(value.to_string()),
        _ => {
            tracing::warn!("{}: ignoring unusable {} header: {}", operation, name, value);
            None
        }
    }
}

/// 200/201 to a PUT/PATCH whose body says the resource is still provisioning
fn provisioning_in_flight(method: &Method, response: &RawResponse) -> bool {
    if !matches!(*method, Method::PUT | Method::PATCH) {
        return false;
    }
    response
        .json_value()
        .as_ref()
        .and_then(provisioning_state)
        .is_some_and(|state| !state.is_terminal())
}

/// `properties.provisioningState` of a resource body
pub fn provisioning_state(body: &Value) -> Option<OperationState> {
    body.pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .map(OperationState::parse)
}

/// Server-suggested delay before the next poll.
///
/// `Retry-After` may be delta-seconds or an HTTP-date; a date in the past
/// means no delay. The millisecond headers take precedence when present.
pub fn parse_retry_after(response: &RawResponse) -> Option<Duration> {
    for name in RETRY_AFTER_MS_HEADERS {
        if let Some(ms) = response.header(name).and_then(|v| v.parse::<u64>().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }

    let value = response.header(RETRY_AFTER)?;
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    const URL: &str = "https://management.azure.com/subscriptions/s/resourceGroups/rg?api-version=2022-09-01";

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> RawResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        RawResponse::new(
            StatusCode::from_u16(status).unwrap(),
            map,
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_accepted_with_async_header_is_in_progress() {
        let resp = response(
            202,
            &[
                (AZURE_ASYNC_OPERATION, "https://management.azure.com/operations/1"),
                (LOCATION, "https://management.azure.com/results/1"),
            ],
            "",
        );
        let handle = OperationHandle::start("op", Method::DELETE, URL, &resp).unwrap();
        assert_eq!(handle.state(), OperationState::InProgress);
        assert_eq!(handle.strategy, PollingStrategy::AsyncOperation);
        assert_eq!(handle.polling_url, "https://management.azure.com/operations/1");
        assert_eq!(
            handle.final_state_url.as_deref(),
            Some("https://management.azure.com/results/1")
        );
    }

    #[test]
    fn test_accepted_falls_back_to_location() {
        let resp = response(202, &[(LOCATION, "https://management.azure.com/results/1")], "");
        let handle = OperationHandle::start("op", Method::POST, URL, &resp).unwrap();
        assert_eq!(handle.strategy, PollingStrategy::Location);
        assert_eq!(handle.polling_url, "https://management.azure.com/results/1");
    }

    #[test]
    fn test_accepted_without_usable_url_is_malformed() {
        for headers in [vec![], vec![(LOCATION, "/relative/path")], vec![(AZURE_ASYNC_OPERATION, "ftp://x/y")]] {
            let resp = response(202, &headers, "");
            let err = OperationHandle::start("op", Method::PUT, URL, &resp).unwrap_err();
            assert!(matches!(err, Error::MalformedAsyncResponse { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_ok_without_async_headers_is_complete() {
        let resp = response(201, &[], r#"{"name":"rg","properties":{"provisioningState":"Succeeded"}}"#);
        let handle = OperationHandle::start("op", Method::PUT, URL, &resp).unwrap();
        assert_eq!(handle.state(), OperationState::Succeeded);
        assert_eq!(handle.strategy, PollingStrategy::Completed);
        assert!(handle.has_usable_body());
    }

    #[test]
    fn test_ok_with_bad_header_is_synchronous() {
        let resp = response(200, &[(LOCATION, "not a url")], "{}");
        let handle = OperationHandle::start("op", Method::PATCH, URL, &resp).unwrap();
        assert_eq!(handle.state(), OperationState::Succeeded);
    }

    #[test]
    fn test_creating_resource_uses_provisioning_state() {
        let resp = response(201, &[], r#"{"properties":{"provisioningState":"Creating"}}"#);
        let handle = OperationHandle::start("op", Method::PUT, URL, &resp).unwrap();
        assert_eq!(handle.strategy, PollingStrategy::ProvisioningState);
        assert_eq!(handle.polling_url, URL);
        assert!(!handle.is_done());
    }

    #[test]
    fn test_error_status_is_http_error() {
        let resp = response(409, &[], r#"{"error":{"code":"Conflict","message":"busy"}}"#);
        let err = OperationHandle::start("op", Method::PUT, URL, &resp).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_record_is_monotonic() {
        let resp = response(202, &[(LOCATION, "https://management.azure.com/results/1")], "");
        let mut handle = OperationHandle::start("op", Method::DELETE, URL, &resp).unwrap();
        assert!(handle.record(OperationState::Failed, b"x".to_vec(), None));
        assert!(!handle.record(OperationState::Succeeded, b"y".to_vec(), None));
        assert_eq!(handle.state(), OperationState::Failed);
        assert_eq!(handle.last_response_body, b"x");
    }

    #[test]
    fn test_status_envelope_is_not_a_usable_put_body() {
        let resp = response(201, &[(AZURE_ASYNC_OPERATION, "https://management.azure.com/operations/1")], "");
        let mut handle = OperationHandle::start("op", Method::PUT, URL, &resp).unwrap();
        handle.record(
            OperationState::Succeeded,
            br#"{"id":"1","status":"Succeeded","startTime":"2024-01-01T00:00:00Z"}"#.to_vec(),
            None,
        );
        assert!(!handle.has_usable_body());
        assert_eq!(handle.final_get_url(), Some(URL));
    }

    #[test]
    fn test_delete_never_needs_a_final_get() {
        let resp = response(202, &[(LOCATION, "https://management.azure.com/results/1")], "");
        let handle = OperationHandle::start("op", Method::DELETE, URL, &resp).unwrap();
        assert!(handle.final_get_url().is_none());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            parse_retry_after(&response(202, &[(RETRY_AFTER, "7")], "")),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            parse_retry_after(&response(202, &[(RETRY_AFTER, "7"), ("retry-after-ms", "250")], "")),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            parse_retry_after(&response(202, &[(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT")], "")),
            Some(Duration::ZERO)
        );
        assert!(parse_retry_after(&response(202, &[(RETRY_AFTER, "soon")], "")).is_none());
        assert!(parse_retry_after(&response(202, &[], "")).is_none());
    }

    #[test]
    fn test_retry_after_http_date_in_future() {
        let at = (Utc::now() + chrono::Duration::seconds(120)).to_rfc2822();
        let delay = parse_retry_after(&response(202, &[(RETRY_AFTER, &at)], "")).unwrap();
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));
    }
}
