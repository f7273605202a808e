//! Request/response models mirroring ARM REST payloads

mod error;
mod resources;

pub use error::{ErrorDetail, OperationStatus};
pub use resources::{GenericResource, ResourceGroup, ResourceGroupPatch, ResourceGroupProperties};
