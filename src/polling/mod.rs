//! Document processing status polling
//!
//! [`StatusPoller::watch`] queries `GET /documents/{id}/status` right away,
//! then again every `interval` while the server reports `processing`. The
//! poll ends on the first snapshot in any other state, on the first failed
//! query, when the caller cancels, or when `max_attempts` queries all came
//! back `processing` (reported as [`AppError::Timeout`]).
//!
//! [`StatusPoller::spawn`] runs the same loop on a task and publishes a
//! [`PollView`] through a `watch` channel. Dropping the [`PollHandle`] stops
//! the task.

use crate::api::ApiClient;
use crate::services;
use crate::types::{AppError, DocumentId, ProcessingState, ProcessingStatus, Result};
use crate::utils::config::PollingConfig;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shown when the server reports `failed`
pub const PROCESSING_FAILED: &str = "Document processing failed";
/// Shown when a status query itself fails
pub const STATUS_CHECK_FAILED: &str = "Failed to check document status";

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    /// `None` polls until a terminal state or cancellation
    pub max_attempts: Option<u32>,
    pub terminal: fn(&ProcessingState) -> bool,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollOptions {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.attempt_limit(),
            terminal: ProcessingState::is_terminal,
        }
    }
}

/// One observed status
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSnapshot {
    pub document_id: DocumentId,
    pub state: ProcessingState,
    pub progress: u8,
    pub message: Option<String>,
    pub error: Option<String>,
    /// 1-based query number that produced this snapshot
    pub attempt: u32,
}

impl ProcessingSnapshot {
    fn from_status(document_id: DocumentId, attempt: u32, status: ProcessingStatus) -> Self {
        let error = (status.status == ProcessingState::Failed).then(|| PROCESSING_FAILED.to_string());
        Self {
            document_id,
            state: status.status,
            progress: status.progress.min(100),
            message: status.message,
            error,
            attempt,
        }
    }
}

#[derive(Clone)]
pub struct StatusPoller {
    client: ApiClient,
    options: PollOptions,
}

impl StatusPoller {
    pub fn new(client: ApiClient, options: PollOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Stream of snapshots for one document
    pub fn watch(
        &self,
        document_id: DocumentId,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ProcessingSnapshot>> + Send + 'static {
        let client = self.client.clone();
        let options = self.options;

        async_stream::stream! {
            let mut attempt: u32 = 0;
            loop {
                if cancel.is_cancelled() {
                    debug!(document_id, "status poll cancelled");
                    break;
                }
                if let Some(max) = options.max_attempts {
                    if attempt >= max {
                        warn!(document_id, attempts = attempt, "status poll gave up");
                        yield Err(AppError::Timeout(format!(
                            "document {} did not finish processing after {} status checks",
                            document_id, attempt
                        )));
                        break;
                    }
                }

                attempt += 1;
                let queried = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = services::documents::status(&client, document_id) => result,
                };

                match queried {
                    Ok(response) => {
                        let snapshot = ProcessingSnapshot::from_status(document_id, attempt, response.into_data());
                        debug!(document_id, attempt, state = %snapshot.state, progress = snapshot.progress, "status polled");
                        let done = (options.terminal)(&snapshot.state);
                        yield Ok(snapshot);
                        if done {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(document_id, attempt, "status check failed: {}", err);
                        yield Err(err);
                        break;
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(options.interval) => {}
                }
            }
        }
    }

    /// Poll until the document reaches a terminal state and return that
    /// snapshot
    pub async fn wait_for_completion(
        &self,
        document_id: DocumentId,
        cancel: CancellationToken,
    ) -> Result<ProcessingSnapshot> {
        let stream = self.watch(document_id, cancel);
        futures::pin_mut!(stream);

        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item?);
        }

        match last {
            Some(snapshot) if (self.options.terminal)(&snapshot.state) => {
                info!(document_id, state = %snapshot.state, "processing finished");
                Ok(snapshot)
            }
            _ => Err(AppError::Cancelled),
        }
    }

    /// Run the poll on a background task
    pub fn spawn(&self, document_id: DocumentId) -> PollHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(PollView::default());
        let stream = self.watch(document_id, cancel.clone());

        let task = tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                tx.send_modify(|view| view.apply(item));
            }
            tx.send_modify(|view| view.finished = true);
        });

        PollHandle {
            receiver: rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Latest state published by a spawned poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollView {
    pub state: ProcessingState,
    pub progress: u8,
    pub message: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
    /// No more queries will be made
    pub finished: bool,
}

impl PollView {
    fn apply(&mut self, item: Result<ProcessingSnapshot>) {
        match item {
            Ok(snapshot) => {
                self.state = snapshot.state;
                self.progress = snapshot.progress;
                self.message = snapshot.message;
                self.error = snapshot.error;
                self.attempts = snapshot.attempt;
            }
            Err(AppError::Timeout(msg)) => self.error = Some(msg),
            Err(_) => self.error = Some(STATUS_CHECK_FAILED.to_string()),
        }
    }
}

/// Owner of a spawned poll; dropping it cancels the poll
#[derive(Debug)]
pub struct PollHandle {
    receiver: watch::Receiver<PollView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn current(&self) -> PollView {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollView> {
        self.receiver.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poll to end and return the final view
    pub async fn finished(mut self) -> PollView {
        let mut receiver = self.receiver.clone();
        // An error here means the task is gone; the last value still stands
        let _ = receiver.wait_for(|view| view.finished).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("status poll task ended abnormally: {}", e);
            }
        }
        let view = receiver.borrow().clone();
        view
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
