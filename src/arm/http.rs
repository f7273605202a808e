//! HTTP utilities for ARM REST API calls

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::ErrorDetail;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the per-request correlation id
pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// One request against ARM
#[derive(Debug, Clone)]
pub struct ArmRequest {
    /// Operation name used in logs and errors, e.g. `ResourceGroupsClient.Get`
    pub operation: String,
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl ArmRequest {
    pub fn new(operation: &str, method: Method, url: &str) -> Self {
        Self {
            operation: operation.to_string(),
            method,
            url: url.to_string(),
            body: None,
        }
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status, headers and body of a response, read in full
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body as JSON, `None` when empty or not JSON
    pub fn json_value(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self, request: &ArmRequest) -> Result<T> {
        // Empty bodies decode as JSON null so unit-like targets still work
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|source| Error::Decode {
            operation: request.operation.clone(),
            url: request.url.clone(),
            source,
        })
    }

    /// Turn a non-success status into `Error::Http`
    pub fn error_for_status(self, request: &ArmRequest) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(http_error(request, &self))
    }
}

/// Build an `Error::Http` from a failed response
pub fn http_error(request: &ArmRequest, response: &RawResponse) -> Error {
    Error::Http {
        operation: request.operation.clone(),
        method: request.method.to_string(),
        url: request.url.clone(),
        status: response.status,
        error: ErrorDetail::from_body(&response.body),
        body: response.body_text(),
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("azrm/{}", crate::VERSION))
            .build()?;

        Ok(Self { client })
    }

    /// Send a request and read the full response.
    ///
    /// Non-success statuses are returned as-is; callers decide whether a 202
    /// or a 404 is an error for their operation.
    pub async fn send(&self, request: &ArmRequest, token: &str) -> Result<RawResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            operation = %request.operation,
            request_id = %request_id,
            "{} {}",
            request.method,
            request.url
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(token)
            .header(CLIENT_REQUEST_ID, request_id.as_str());

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                "API error: {} {} - {} - {}",
                request.method,
                request.url,
                status,
                sanitize_for_log(&String::from_utf8_lossy(&body))
            );
        } else {
            tracing::debug!("{} {} -> {}", request.method, request.url, status);
        }

        Ok(RawResponse::new(status, headers, body))
    }
}

/// Format an ARM error for display
///
/// Server-reported codes and messages are shown verbatim; otherwise a hint is
/// derived from the status code.
pub fn format_arm_error(error: &Error) -> String {
    if let Some(detail) = error.service_error() {
        return match error {
            Error::OperationFailed { state, .. } => format!("Operation {}: {}", state, detail),
            _ => detail.to_string(),
        };
    }

    match error.status() {
        Some(StatusCode::UNAUTHORIZED) => {
            "Authentication failed. Run 'az login' or set a valid access token.".to_string()
        }
        Some(StatusCode::FORBIDDEN) => {
            "Permission denied. Check your Azure role assignments.".to_string()
        }
        Some(StatusCode::NOT_FOUND) => "Resource not found.".to_string(),
        Some(StatusCode::CONFLICT) => {
            "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        Some(StatusCode::TOO_MANY_REQUESTS) => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        Some(status) if status.is_server_error() => {
            "Azure Resource Manager is temporarily unavailable. Please try again.".to_string()
        }
        _ => error.to_string(),
    }
}
