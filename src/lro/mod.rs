//! Long-running operations
//!
//! Mutating ARM calls may finish asynchronously. The initial response is
//! turned into an [`OperationHandle`] (`202` plus `Azure-AsyncOperation` or
//! `Location`, or a resource still provisioning), and [`poll_until_done`]
//! follows it to `Succeeded`, `Failed` or `Canceled`.
//!
//! ```ignore
//! let cancel = CancellationToken::new();
//! let op = client.begin("ResourceGroupsClient.Delete", Method::DELETE, &url, None).await?;
//! op.wait::<serde_json::Value>(&cancel).await?;
//! ```

pub mod handle;
pub mod poller;
pub mod state;

pub use handle::{parse_retry_after, OperationHandle, PollingStrategy};
pub use poller::{
    poll_until_done, LongRunningOperation, PollOptions, PollStatus, Poller, ProgressCallback,
    ProgressEvent,
};
pub use state::OperationState;
