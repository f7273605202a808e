//! Poll loop for long-running operations
//!
//! `poll_until_done` drives any [`Poller`] to a terminal state, sleeping
//! between polls and racing every request and sleep against the caller's
//! cancellation token and the optional overall timeout.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::handle::{parse_retry_after, provisioning_state, OperationHandle, PollingStrategy, LOCATION};
use super::state::OperationState;
use crate::arm::client::ArmClient;
use crate::arm::http::{http_error, ArmRequest, RawResponse};
use crate::error::{CancelReason, Error, Result};
use crate::models::ErrorDetail;

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStatus {
    pub state: OperationState,
    pub retry_after: Option<Duration>,
}

/// Something that can be polled to completion
pub trait Poller: Send {
    /// Issue one polling request and report the resulting state
    fn poll(&mut self) -> BoxFuture<'_, Result<PollStatus>>;

    /// Final body once terminal; fails for Failed/Canceled and while in progress
    fn result(&mut self) -> BoxFuture<'_, Result<Vec<u8>>>;

    fn state(&self) -> OperationState;

    /// Server-suggested delay from the most recent response
    fn retry_after(&self) -> Option<Duration>;

    fn operation(&self) -> &str;

    fn polling_url(&self) -> &str;
}

/// Polling cadence
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between polls when the server gives no `Retry-After`
    pub default_interval: Duration,
    /// Upper bound for any delay, including server-suggested ones
    pub max_interval: Duration,
    /// Give up after this long
    pub timeout: Option<Duration>,
    /// Re-poll with the verb that started the operation instead of GET
    pub repoll_with_original_method: bool,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(60),
            timeout: None,
            repoll_with_original_method: false,
        }
    }
}

impl PollOptions {
    fn delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.default_interval)
            .min(self.max_interval)
    }
}

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { operation: String },
    Polling {
        operation: String,
        state: OperationState,
        elapsed: Duration,
    },
    Completed { operation: String },
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this for status lines; library callers usually don't need it.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

/// Drive `poller` until it reaches a terminal state and return the final body
pub async fn poll_until_done<P: Poller + ?Sized>(
    poller: &mut P,
    options: &PollOptions,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<u8>> {
    let start = Instant::now();
    let deadline = options.timeout.map(|t| start + t);
    let operation = poller.operation().to_string();

    emit(
        on_progress,
        ProgressEvent::Started {
            operation: operation.clone(),
        },
    );

    let mut delay = options.delay(poller.retry_after());
    while !poller.state().is_terminal() {
        // Sleep first: the initial response already said "in progress"
        guard(poller, cancel, deadline, options, tokio::time::sleep(delay)).await?;

        let status = {
            let fut = poller.poll();
            race(fut, cancel, deadline, options).await
        }
        .map_err(|e| with_context(e, &operation, poller.polling_url()))?;

        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: operation.clone(),
                state: status.state,
                elapsed: start.elapsed(),
            },
        );
        delay = options.delay(status.retry_after);
    }

    let result = {
        let fut = poller.result();
        race(fut, cancel, deadline, options).await
    }
    .map_err(|e| with_context(e, &operation, poller.polling_url()));

    match &result {
        Ok(_) => {
            tracing::info!("{}: completed", operation);
            emit(on_progress, ProgressEvent::Completed { operation });
        }
        Err(e) => {
            tracing::info!("{}: failed: {}", operation, e);
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation,
                    error: e.to_string(),
                },
            );
        }
    }
    result
}

/// Which side stopped a raced future
enum Stop {
    Token,
    Timeout,
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Race `fut` against cancellation and the deadline; cancellation wins ties
async fn race<F, T>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    options: &PollOptions,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let stopped = tokio::select! {
        biased;
        _ = cancel.cancelled() => Stop::Token,
        _ = deadline_reached(deadline) => Stop::Timeout,
        result = fut => return result,
    };

    Err(Error::Cancelled {
        operation: String::new(),
        url: String::new(),
        reason: match stopped {
            Stop::Token => CancelReason::Token,
            Stop::Timeout => CancelReason::Timeout(options.timeout.unwrap_or_default()),
        },
    })
}

async fn guard<P: Poller + ?Sized>(
    poller: &P,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    options: &PollOptions,
    sleep: tokio::time::Sleep,
) -> Result<()> {
    race(async { sleep.await; Ok(()) }, cancel, deadline, options)
        .await
        .map_err(|e| with_context(e, poller.operation(), poller.polling_url()))
}

/// Fill in operation and URL on errors raised without them
fn with_context(error: Error, operation: &str, url: &str) -> Error {
    match error {
        Error::Cancelled { reason, .. } => {
            tracing::info!("{}: polling {} stopped: {}", operation, url, reason);
            Error::Cancelled {
                operation: operation.to_string(),
                url: url.to_string(),
                reason,
            }
        }
        other => other,
    }
}

/// A started operation bound to the client that polls it
pub struct LongRunningOperation {
    client: ArmClient,
    handle: OperationHandle,
    options: PollOptions,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for LongRunningOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongRunningOperation")
            .field("handle", &self.handle)
            .field("options", &self.options)
            .field("on_progress", &self.on_progress.is_some())
            .finish_non_exhaustive()
    }
}

impl LongRunningOperation {
    pub fn new(client: ArmClient, handle: OperationHandle) -> Self {
        Self {
            client,
            handle,
            options: PollOptions::default(),
            on_progress: None,
        }
    }

    pub fn with_options(mut self, options: PollOptions) -> Self {
        self.handle.poll_method = if options.repoll_with_original_method {
            self.handle.method.clone()
        } else {
            Method::GET
        };
        self.options = options;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    /// Poll until terminal and return the final body (possibly empty)
    pub async fn poll_until_done(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let options = self.options.clone();
        let on_progress = self.on_progress.take();
        let result = poll_until_done(self, &options, cancel, on_progress.as_ref()).await;
        self.on_progress = on_progress;
        result
    }

    /// Poll until terminal and decode the final body; `None` when empty
    pub async fn wait<T: DeserializeOwned>(mut self, cancel: &CancellationToken) -> Result<Option<T>> {
        let body = self.poll_until_done(cancel).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| Error::Decode {
                operation: self.handle.operation.clone(),
                url: self.handle.resource_url.clone(),
                source,
            })
    }

    fn state_of(&self, response: &RawResponse) -> Option<OperationState> {
        let deleted = self.handle.method == Method::DELETE
            && response.status == StatusCode::NOT_FOUND
            && self.handle.strategy != PollingStrategy::AsyncOperation;
        if deleted {
            return Some(OperationState::Succeeded);
        }
        if !response.status.is_success() {
            return None;
        }

        let from_body = response.json_value().and_then(|body| match self.handle.strategy {
            PollingStrategy::AsyncOperation => body
                .get("status")
                .and_then(|s| s.as_str())
                .map(OperationState::parse),
            PollingStrategy::ProvisioningState => provisioning_state(&body),
            // Only a terminal status is trusted here; a final resource body may
            // carry an unrelated `status` field
            PollingStrategy::Location => {
                let status = body
                    .get("status")
                    .and_then(|s| s.as_str())
                    .map(OperationState::parse);
                let provisioning = matches!(self.handle.method, Method::PUT | Method::PATCH)
                    .then(|| provisioning_state(&body))
                    .flatten();
                status.into_iter().chain(provisioning).find(OperationState::is_terminal)
            }
            PollingStrategy::Completed => None,
        });

        Some(from_body.unwrap_or(if response.status == StatusCode::ACCEPTED {
            OperationState::InProgress
        } else {
            OperationState::Succeeded
        }))
    }

    async fn poll_once(&mut self) -> Result<PollStatus> {
        let request = ArmRequest::new(
            &self.handle.operation,
            self.handle.poll_method.clone(),
            &self.handle.polling_url,
        );
        let response = self.client.send(&request).await?;

        let state = self
            .state_of(&response)
            .ok_or_else(|| http_error(&request, &response))?;

        // A Location poll may hand out a fresh URL for the next round
        if self.handle.strategy == PollingStrategy::Location && response.status == StatusCode::ACCEPTED {
            if let Some(next) = response.header(LOCATION) {
                if url::Url::parse(next).is_ok() && next != self.handle.polling_url {
                    tracing::debug!("{}: polling URL moved to {}", self.handle.operation, next);
                    self.handle.polling_url = next.to_string();
                }
            }
        }

        let retry_after = parse_retry_after(&response);
        self.handle.record(state, response.body, retry_after);

        Ok(PollStatus {
            state: self.handle.state(),
            retry_after,
        })
    }

    async fn final_body(&mut self) -> Result<Vec<u8>> {
        match self.handle.state() {
            OperationState::Succeeded => {}
            OperationState::InProgress => {
                return Err(Error::OperationNotDone {
                    operation: self.handle.operation.clone(),
                    url: self.handle.polling_url.clone(),
                });
            }
            state => {
                let body = &self.handle.last_response_body;
                return Err(Error::OperationFailed {
                    operation: self.handle.operation.clone(),
                    url: self.handle.polling_url.clone(),
                    state,
                    error: ErrorDetail::from_body(body),
                    body: String::from_utf8_lossy(body).into_owned(),
                });
            }
        }

        if self.handle.has_usable_body() {
            return Ok(self.handle.last_response_body.clone());
        }

        let Some(url) = self.handle.final_get_url() else {
            // DELETE, or a POST with nowhere to fetch a result from
            return Ok(Vec::new());
        };

        tracing::debug!("{}: fetching final result from {}", self.handle.operation, url);
        let request = ArmRequest::new(&self.handle.operation, Method::GET, url);
        let response = self.client.execute(&request).await?;
        Ok(response.body)
    }
}

impl Poller for LongRunningOperation {
    fn poll(&mut self) -> BoxFuture<'_, Result<PollStatus>> {
        Box::pin(self.poll_once())
    }

    fn result(&mut self) -> BoxFuture<'_, Result<Vec<u8>>> {
        Box::pin(self.final_body())
    }

    fn state(&self) -> OperationState {
        self.handle.state()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.handle.retry_after
    }

    fn operation(&self) -> &str {
        &self.handle.operation
    }

    fn polling_url(&self) -> &str {
        &self.handle.polling_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Poller replaying a fixed sequence of states
    struct Scripted {
        states: VecDeque<OperationState>,
        current: OperationState,
        polls: usize,
        delay: Option<Duration>,
    }

    impl Scripted {
        fn new(states: &[OperationState]) -> Self {
            Self {
                states: states.iter().copied().collect(),
                current: OperationState::InProgress,
                polls: 0,
                delay: Some(Duration::ZERO),
            }
        }
    }

    impl Poller for Scripted {
        fn poll(&mut self) -> BoxFuture<'_, Result<PollStatus>> {
            Box::pin(async move {
                self.polls += 1;
                self.current = self.states.pop_front().unwrap_or(self.current);
                Ok(PollStatus {
                    state: self.current,
                    retry_after: self.delay,
                })
            })
        }

        fn result(&mut self) -> BoxFuture<'_, Result<Vec<u8>>> {
            Box::pin(async move {
                match self.current {
                    OperationState::Succeeded => Ok(b"done".to_vec()),
                    state => Err(Error::OperationFailed {
                        operation: "scripted".to_string(),
                        url: "u".to_string(),
                        state,
                        error: None,
                        body: String::new(),
                    }),
                }
            })
        }

        fn state(&self) -> OperationState {
            self.current
        }

        fn retry_after(&self) -> Option<Duration> {
            self.delay
        }

        fn operation(&self) -> &str {
            "scripted"
        }

        fn polling_url(&self) -> &str {
            "https://example.invalid/operations/1"
        }
    }

    #[tokio::test]
    async fn test_polls_until_succeeded() {
        use OperationState::*;
        let mut poller = Scripted::new(&[InProgress, InProgress, Succeeded]);
        let body = poll_until_done(&mut poller, &PollOptions::default(), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(body, b"done");
        assert_eq!(poller.polls, 3);
    }

    #[tokio::test]
    async fn test_failed_stops_polling() {
        use OperationState::*;
        let mut poller = Scripted::new(&[InProgress, Failed, Succeeded]);
        let err = poll_until_done(&mut poller, &PollOptions::default(), &CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OperationFailed { state: Failed, .. }));
        assert_eq!(poller.polls, 2);
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_any_poll() {
        let mut poller = Scripted::new(&[OperationState::Succeeded]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = poll_until_done(&mut poller, &PollOptions::default(), &cancel, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Cancelled {
                reason: CancelReason::Token,
                ..
            }
        ));
        assert_eq!(poller.polls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_cancelled() {
        let mut poller = Scripted::new(&[]);
        poller.delay = None;
        let options = PollOptions {
            default_interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let err = poll_until_done(&mut poller, &options, &CancellationToken::new(), None)
            .await
            .unwrap_err();
        match err {
            Error::Cancelled { operation, reason, .. } => {
                assert_eq!(operation, "scripted");
                assert_eq!(reason, CancelReason::Timeout(Duration::from_secs(5)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(poller.polls, 2);
    }

    #[tokio::test]
    async fn test_progress_events() {
        use OperationState::*;
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: ProgressCallback = Box::new(move |event| {
            let name = match event {
                ProgressEvent::Started { .. } => "started",
                ProgressEvent::Polling { .. } => "polling",
                ProgressEvent::Completed { .. } => "completed",
                ProgressEvent::Failed { .. } => "failed",
            };
            sink.lock().unwrap().push(name);
        });

        let mut poller = Scripted::new(&[InProgress, Succeeded]);
        poll_until_done(&mut poller, &PollOptions::default(), &CancellationToken::new(), Some(&callback))
            .await
            .unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["started", "polling", "polling", "completed"]
        );
    }

    #[test]
    fn test_delay_is_capped() {
        let options = PollOptions::default();
        assert_eq!(options.delay(None), Duration::from_secs(10));
        assert_eq!(options.delay(Some(Duration::from_secs(600))), Duration::from_secs(60));
        assert_eq!(options.delay(Some(Duration::ZERO)), Duration::ZERO);
    }
}
