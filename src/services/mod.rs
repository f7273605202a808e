//! Operation clients, one method per REST operation
//!
//! Each client wraps an [`ArmClient`](crate::arm::client::ArmClient) and
//! reuses its poller and pager for long-running and list operations.

pub mod generic_resources;
pub mod resource_groups;

pub use generic_resources::GenericResourcesClient;
pub use resource_groups::{ListOptions, ResourceGroupsClient};
