//! azrm - Azure Resource Manager client core
//!
//! Typed resource IDs, an operation client over the ARM REST API, and the
//! long-running-operation poller and paged iterator every call builds on.
//!
//! # Module Structure
//!
//! - [`arm`] - credentials, HTTP sender and the operation client
//! - [`lro`] - long-running operation handles and the poll loop
//! - [`paging`] - `value`/`nextLink` pages
//! - [`resourceids`] - resource ID parsing, formatting and the type registry
//! - [`services`] - resource group and generic resource clients
//! - [`models`] - request/response payloads
//! - [`config`] - persisted CLI configuration

pub mod arm;
pub mod config;
pub mod error;
pub mod lro;
pub mod models;
pub mod paging;
pub mod resourceids;
pub mod services;

pub use arm::client::ArmClient;
pub use error::{CancelReason, Error, Result};
pub use lro::{LongRunningOperation, OperationHandle, OperationState, PollOptions};
pub use paging::{Page, Pager};
pub use tokio_util::sync::CancellationToken;

/// Version injected at compile time via AZRM_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("AZRM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
