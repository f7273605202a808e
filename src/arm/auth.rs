//! Azure Authentication
//!
//! Supplies bearer tokens for resource manager calls. Tokens come either from
//! a fixed value (CI, tests) or from the Azure CLI's logged-in account.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// A bearer token and when it stops being valid
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

/// Source of bearer tokens
pub trait TokenCredential: Send + Sync {
    /// Get a token for `scope`, e.g. `https://management.azure.com/.default`
    fn get_token<'a>(&'a self, scope: &'a str) -> BoxFuture<'a, Result<AccessToken>>;
}

/// Credential that always returns the same token
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl TokenCredential for StaticTokenCredential {
    fn get_token<'a>(&'a self, _scope: &'a str) -> BoxFuture<'a, Result<AccessToken>> {
        Box::pin(async move {
            Ok(AccessToken {
                token: self.token.clone(),
                expires_on: None,
            })
        })
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    scope: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    /// Check if this cached token is still valid for `scope`
    fn is_valid_for(&self, scope: &str) -> bool {
        self.scope == scope && Instant::now() < self.expires_at
    }
}

/// Output of `az account get-access-token --output json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    /// POSIX timestamp, newer CLI versions only
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Credential backed by the Azure CLI, with token caching
#[derive(Clone, Default)]
pub struct AzureCliCredential {
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self, scope: &str) -> Result<AccessToken> {
        let program = if cfg!(windows) { "az.cmd" } else { "az" };

        let output = tokio::process::Command::new(program)
            .args(["account", "get-access-token", "--output", "json", "--scope", scope])
            .output()
            .await
            .map_err(|e| {
                Error::Credential(format!(
                    "failed to run the Azure CLI ({}). Install it and run 'az login'",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Credential(format!(
                "'az account get-access-token' failed: {}",
                stderr.trim()
            )));
        }

        let response: CliTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Credential(format!("unexpected Azure CLI output: {}", e)))?;

        Ok(AccessToken {
            expires_on: parse_cli_expiry(response.expires_on_epoch, response.expires_on.as_deref()),
            token: response.access_token,
        })
    }

    /// Force the next call to fetch a fresh token
    pub async fn clear_cache(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }
}

impl TokenCredential for AzureCliCredential {
    /// Security: Checks token expiry before returning cached token
    fn get_token<'a>(&'a self, scope: &'a str) -> BoxFuture<'a, Result<AccessToken>> {
        Box::pin(async move {
            // Check cache first - but only return if token is still valid
            {
                let cache = self.token_cache.read().await;
                if let Some(cached) = cache.as_ref() {
                    if cached.is_valid_for(scope) {
                        return Ok(AccessToken {
                            token: cached.token.clone(),
                            expires_on: None,
                        });
                    }
                    tracing::debug!("Cached token expired or scope changed, fetching new token");
                }
            }

            let token = self.fetch(scope).await?;
            let ttl = token
                .expires_on
                .and_then(|at| (at - Utc::now()).to_std().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL);

            {
                let mut cache = self.token_cache.write().await;
                *cache = Some(CachedToken {
                    token: token.token.clone(),
                    scope: scope.to_string(),
                    expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER),
                });
            }

            tracing::debug!(
                "New token cached, expires in ~{} minutes",
                ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
            );

            Ok(token)
        })
    }
}

/// Expiry from Azure CLI output: the epoch field when present, otherwise the
/// local-time `expiresOn` string
fn parse_cli_expiry(epoch: Option<i64>, local: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(ts) = epoch {
        return DateTime::from_timestamp(ts, 0);
    }

    let naive = NaiveDateTime::parse_from_str(local?, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Get the Azure CLI configuration directory
pub fn get_azure_config_dir() -> Option<PathBuf> {
    // Check AZURE_CONFIG_DIR environment variable first
    if let Ok(path) = std::env::var("AZURE_CONFIG_DIR") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|p| p.join(".azure"))
}

/// Validate a subscription ID (a UUID)
pub fn validate_subscription_id(subscription: &str) -> bool {
    uuid::Uuid::parse_str(subscription).is_ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureProfile {
    #[serde(default)]
    subscriptions: Vec<ProfileSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSubscription {
    id: String,
    #[serde(default)]
    is_default: bool,
}

/// Default subscription recorded in an `azureProfile.json` document
pub fn default_subscription_from_profile(content: &str) -> Option<String> {
    // The CLI writes this file with a UTF-8 BOM
    let content = content.trim_start_matches('\u{feff}');
    let profile: AzureProfile = serde_json::from_str(content).ok()?;

    profile
        .subscriptions
        .into_iter()
        .find(|s| s.is_default)
        .map(|s| s.id)
        .filter(|id| validate_subscription_id(id))
}

/// Read the default subscription
/// Security: Validates subscription ID format before returning
pub fn get_default_subscription() -> Option<String> {
    // Check environment variable first
    if let Ok(subscription) = std::env::var("AZURE_SUBSCRIPTION_ID") {
        if validate_subscription_id(&subscription) {
            return Some(subscription);
        }
        tracing::warn!("Invalid subscription ID format in AZURE_SUBSCRIPTION_ID");
    }

    // Try to read from the CLI profile
    let profile_path = get_azure_config_dir()?.join("azureProfile.json");
    let content = std::fs::read_to_string(&profile_path).ok()?;
    default_subscription_from_profile(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subscription_id() {
        assert!(validate_subscription_id("12345678-1234-9876-4563-123456789012"));
        assert!(!validate_subscription_id("my-subscription"));
        assert!(!validate_subscription_id(""));
    }

    #[test]
    fn test_default_subscription_from_profile() {
        let content = "\u{feff}{\"subscriptions\": [\
            {\"id\": \"11111111-1111-1111-1111-111111111111\", \"isDefault\": false},\
            {\"id\": \"22222222-2222-2222-2222-222222222222\", \"isDefault\": true}\
        ]}";
        assert_eq!(
            default_subscription_from_profile(content).as_deref(),
            Some("22222222-2222-2222-2222-222222222222")
        );
        assert!(default_subscription_from_profile("{}").is_none());
        assert!(default_subscription_from_profile(
            r#"{"subscriptions": [{"id": "bogus", "isDefault": true}]}"#
        )
        .is_none());
    }

    #[test]
    fn test_parse_cli_expiry_prefers_epoch() {
        let at = parse_cli_expiry(Some(1_700_000_000), Some("garbage")).unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert!(parse_cli_expiry(None, Some("2024-01-15 10:30:00.000000")).is_some());
        assert!(parse_cli_expiry(None, None).is_none());
    }

    #[test]
    fn test_static_credential_returns_token() {
        let credential = StaticTokenCredential::new("abc");
        let token = tokio_test::block_on(credential.get_token("scope")).unwrap();
        assert_eq!(token.token, "abc");
    }
}
