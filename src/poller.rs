// src/poller.rs
// Capped exponential backoff over the remote file's processing state

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::events::{RunEvent, StatusEvent};
use crate::transport::{FileState, FileTransport, RemoteFileHandle, TransportError};

/// Delay/attempt counter for one polling loop.
///
/// Starts at the configured initial delay with attempt 1; every advance
/// doubles the delay up to the cap and bumps the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub delay_ms: u64,
    pub attempt: u32,
}

impl BackoffState {
    pub fn new(initial_delay_ms: u64) -> Self {
        Self {
            delay_ms: initial_delay_ms,
            attempt: 1,
        }
    }

    pub fn advance(&mut self, max_delay_ms: u64) {
        self.delay_ms = self.delay_ms.saturating_mul(2).min(max_delay_ms);
        self.attempt = self.attempt.saturating_add(1);
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Remote processing failed (state {state}): {message}")]
    RemoteProcessingFailed { state: String, message: String },

    #[error("File still processing after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct BackoffPoller<'a> {
    transport: &'a dyn FileTransport,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_attempts: Option<u32>,
}

impl<'a> BackoffPoller<'a> {
    pub fn new(
        transport: &'a dyn FileTransport,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            transport,
            initial_delay_ms,
            max_delay_ms,
            max_attempts,
        }
    }

    /// Drive the handle to `Active`, emitting `FileProcessing` before each
    /// wait and `FileActive` on success.
    ///
    /// Any settled state other than `Processing`/`Active` is terminal. With
    /// no attempt ceiling configured the loop runs until the remote service
    /// resolves the file one way or the other.
    pub async fn wait_until_active(
        &self,
        api_key: &str,
        file_name: &str,
        mut handle: RemoteFileHandle,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<RemoteFileHandle, PollError> {
        let mut backoff = BackoffState::new(self.initial_delay_ms);

        loop {
            match handle.state {
                FileState::Active => {
                    tracing::info!("File {} is active", file_name);
                    let _ = events
                        .send(RunEvent::Status(StatusEvent::FileActive {
                            name: file_name.to_string(),
                        }))
                        .await;
                    return Ok(handle);
                }
                FileState::Processing => {
                    if let Some(max) = self.max_attempts {
                        if backoff.attempt > max {
                            return Err(PollError::AttemptsExhausted { attempts: max });
                        }
                    }

                    tracing::info!(
                        "File {} still processing; checking again in {}ms (attempt {})",
                        file_name,
                        backoff.delay_ms,
                        backoff.attempt
                    );
                    let _ = events
                        .send(RunEvent::Status(StatusEvent::FileProcessing {
                            name: file_name.to_string(),
                            attempt: backoff.attempt,
                            next_delay_ms: backoff.delay_ms,
                        }))
                        .await;

                    sleep(Duration::from_millis(backoff.delay_ms)).await;
                    backoff.advance(self.max_delay_ms);

                    handle = self.transport.get_file_status(api_key, file_name).await?;
                }
                state => {
                    let message = handle
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "no diagnostic from remote service".to_string());
                    tracing::error!("File {} settled in state {}: {}", file_name, state, message);
                    return Err(PollError::RemoteProcessingFailed {
                        state: state.to_string(),
                        message,
                    });
                }
            }
        }
    }
}
