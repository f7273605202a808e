//! ARM Client
//!
//! Main client for Azure Resource Manager, combining authentication and HTTP
//! functionality. Every URL it builds carries an `api-version`.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::auth::TokenCredential;
use super::environment::Environment;
use super::http::{ArmHttpClient, ArmRequest, RawResponse};
use crate::error::{Error, Result};
use crate::lro::{LongRunningOperation, OperationHandle};
use crate::paging::Pager;

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    credential: Arc<dyn TokenCredential>,
    pub http: ArmHttpClient,
    pub environment: Environment,
    endpoint: String,
    pub subscription_id: String,
}

impl ArmClient {
    /// Create a new client for `subscription_id` in `environment`
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        subscription_id: &str,
        environment: Environment,
    ) -> Result<Self> {
        Ok(Self {
            credential,
            http: ArmHttpClient::new()?,
            environment,
            endpoint: environment.resource_manager_endpoint().to_string(),
            subscription_id: subscription_id.to_string(),
        })
    }

    /// Point the client at a different resource manager endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        let token = self
            .credential
            .get_token(self.environment.token_scope())
            .await?;
        Ok(token.token)
    }

    /// Send a request without interpreting the status code
    pub async fn send(&self, request: &ArmRequest) -> Result<RawResponse> {
        let token = self.get_token().await?;
        self.http.send(request, &token).await
    }

    /// Send a request, failing on non-success statuses
    pub async fn execute(&self, request: &ArmRequest) -> Result<RawResponse> {
        self.send(request).await?.error_for_status(request)
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a URL for a resource path (e.g. a resource ID)
    pub fn resource_url(&self, path: &str, api_version: &str) -> String {
        add_query_params(
            &format!("{}{}", self.endpoint, path),
            &[("api-version", api_version)],
        )
    }

    /// Build a URL below the client's subscription
    pub fn subscription_url(&self, path: &str, api_version: &str) -> String {
        self.resource_url(
            &format!(
                "/subscriptions/{}/{}",
                self.subscription_id,
                path.trim_start_matches('/')
            ),
            api_version,
        )
    }

    // =========================================================================
    // Typed verbs
    // =========================================================================

    /// GET and decode
    pub async fn get<T: DeserializeOwned>(&self, operation: &str, url: &str) -> Result<T> {
        let request = ArmRequest::new(operation, Method::GET, url);
        self.execute(&request).await?.json(&request)
    }

    /// PUT a body and decode the response
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = ArmRequest::new(operation, Method::PUT, url).with_json(to_json(operation, url, body)?);
        self.execute(&request).await?.json(&request)
    }

    /// PATCH a body and decode the response
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request =
            ArmRequest::new(operation, Method::PATCH, url).with_json(to_json(operation, url, body)?);
        self.execute(&request).await?.json(&request)
    }

    /// POST an action body and decode the response
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request =
            ArmRequest::new(operation, Method::POST, url).with_json(to_json(operation, url, body)?);
        self.execute(&request).await?.json(&request)
    }

    /// DELETE without waiting; an asynchronous delete should use [`Self::begin`]
    pub async fn delete(&self, operation: &str, url: &str) -> Result<StatusCode> {
        let request = ArmRequest::new(operation, Method::DELETE, url);
        Ok(self.execute(&request).await?.status)
    }

    /// HEAD, returning whether the resource exists (204/200 vs 404)
    pub async fn head(&self, operation: &str, url: &str) -> Result<bool> {
        let request = ArmRequest::new(operation, Method::HEAD, url);
        let response = self.send(&request).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(super::http::http_error(&request, &response)),
        }
    }

    // =========================================================================
    // Long-running operations and paging
    // =========================================================================

    /// Send a mutating request and wrap the outcome in a long-running operation
    ///
    /// The returned operation may already be complete (200/201/204 without
    /// async headers); `poll_until_done` then returns immediately.
    pub async fn begin(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<LongRunningOperation> {
        let mut request = ArmRequest::new(operation, method.clone(), url);
        request.body = body;

        let response = self.execute(&request).await?;
        let handle = OperationHandle::start(operation, method, url, &response)?;

        tracing::info!(
            "{}: started ({:?}, state {})",
            operation,
            handle.strategy,
            handle.state()
        );

        Ok(LongRunningOperation::new(self.clone(), handle))
    }

    /// Pager for a list operation returning items of type `T`
    pub fn pager<T: DeserializeOwned>(&self, operation: &str) -> Pager<T> {
        Pager::new(self.clone(), operation)
    }
}

fn to_json<B: Serialize>(operation: &str, url: &str, body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|source| Error::Decode {
        operation: operation.to_string(),
        url: url.to_string(),
        source,
    })
}

/// Append query parameters to a URL, encoding the values
pub fn add_query_params(url: &str, params: &[(&str, &str)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::auth::StaticTokenCredential;

    fn client() -> ArmClient {
        ArmClient::new(
            Arc::new(StaticTokenCredential::new("t")),
            "12345678-1234-9876-4563-123456789012",
            Environment::Public,
        )
        .unwrap()
    }

    #[test]
    fn test_resource_url_adds_api_version() {
        let url = client().resource_url("/subscriptions/x/resourceGroups/rg", "2022-09-01");
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/x/resourceGroups/rg?api-version=2022-09-01"
        );
    }

    #[test]
    fn test_subscription_url_and_endpoint_override() {
        let client = client().with_endpoint("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(
            client.subscription_url("/resourcegroups", "2022-09-01"),
            "http://localhost:8080/subscriptions/12345678-1234-9876-4563-123456789012/resourcegroups?api-version=2022-09-01"
        );
    }

    #[test]
    fn test_add_query_params_encodes_values() {
        assert_eq!(
            add_query_params("https://x/y?api-version=1", &[("$filter", "tagName eq 'env'")]),
            "https://x/y?api-version=1&$filter=tagName%20eq%20%27env%27"
        );
        assert_eq!(add_query_params("https://x/y", &[]), "https://x/y");
    }
}
