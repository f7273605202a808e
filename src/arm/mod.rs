//! Azure Resource Manager plumbing
//!
//! This module provides the core functionality for talking to the ARM control
//! plane: credentials, the HTTP sender, and the operation client the service
//! clients are built on.
//!
//! # Module Structure
//!
//! - [`auth`] - bearer token credentials and default subscription discovery
//! - [`client`] - main ARM client for making API requests
//! - [`environment`] - public and sovereign cloud endpoints
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use azrm::arm::{auth::AzureCliCredential, client::ArmClient, environment::Environment};
//!
//! async fn example() -> azrm::Result<()> {
//!     let client = ArmClient::new(Arc::new(AzureCliCredential::new()), "<subscription>", Environment::Public)?;
//!     let groups: serde_json::Value = client
//!         .get("Example.List", &client.subscription_url("resourcegroups", "2022-09-01"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod environment;
pub mod http;
