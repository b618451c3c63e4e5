// src/orchestrator/mod.rs
// The run spine: prepare -> upload -> poll -> generate -> parse,
// streaming status events to the caller as it goes

mod prompt;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{self, EngineConfig};
use crate::events::{GenerationResult, RunEvent, StatusEvent, UploadProgress};
use crate::parser;
use crate::poller::{BackoffPoller, PollError};
use crate::source::{self, Source, SourceCandidate, ValidationError};
use crate::transport::{
    FileReference, FileTransport, GeminiTransport, TransportError,
};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const CHARS_PER_TOKEN: f64 = 4.0;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Missing API key (set {})", config::API_KEY_ENV_VAR)]
    MissingCredential,
}

/// One live orchestration run.
///
/// `events` yields `Status` records in causal order followed by exactly one
/// `Completed` or `Failed` record, after which the channel closes. A
/// cancelled run closes the channel without a terminal record. `progress`
/// carries upload byte counts as a side channel for progress bars.
pub struct RunHandle {
    pub run_id: Uuid,
    pub events: mpsc::Receiver<RunEvent>,
    pub progress: watch::Receiver<UploadProgress>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Abort the run: in-flight network calls and poll sleeps are dropped,
    /// the event stream closes, and no terminal record is emitted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

pub struct Orchestrator {
    transport: Arc<dyn FileTransport>,
    config: EngineConfig,
    api_key: String,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn FileTransport>, config: EngineConfig, api_key: String) -> Self {
        Self {
            transport,
            config,
            api_key,
        }
    }

    /// Build against the default Gemini transport, reading the API key from
    /// the environment. Fails before any network call when the key is absent.
    pub fn from_env(config: EngineConfig) -> Result<Self, EngineError> {
        let api_key = config::api_key_from_env().ok_or(EngineError::MissingCredential)?;
        Ok(Self::new(Arc::new(GeminiTransport::new()), config, api_key))
    }

    /// Spawn one run and hand back its event stream.
    ///
    /// Validation happens inside the run so every failure, including bad
    /// input, reaches the caller as a `Failed` record on the stream.
    pub fn start(&self, candidate: SourceCandidate) -> RunHandle {
        let run_id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (progress_tx, progress_rx) = watch::channel(UploadProgress::default());
        let cancel = CancellationToken::new();

        let transport = Arc::clone(&self.transport);
        let config = self.config.clone();
        let api_key = self.api_key.clone();
        let token = cancel.clone();

        tracing::info!("Run {} started via {}", run_id, self.transport.name());

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Run {} cancelled", run_id);
                }
                outcome = execute(transport.as_ref(), &config, &api_key, candidate, &events_tx, progress_tx) => {
                    match outcome {
                        Ok(result) => {
                            tracing::info!(
                                "Run {} completed: {} transcript chars, {} notes",
                                run_id,
                                result.transcript.len(),
                                result.notes.len()
                            );
                            let _ = events_tx.send(RunEvent::Completed(Box::new(result))).await;
                        }
                        Err(e) => {
                            tracing::error!("Run {} failed: {}", run_id, e);
                            let _ = events_tx.send(RunEvent::Failed(e.to_string())).await;
                        }
                    }
                }
            }
        });

        RunHandle {
            run_id,
            events: events_rx,
            progress: progress_rx,
            cancel,
        }
    }

    /// Drive one run to completion without subscribing to its events
    /// (progress still lands in the logs)
    pub async fn run(&self, candidate: SourceCandidate) -> Result<GenerationResult, EngineError> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        // No subscriber: drop the receiver up front so sends become no-ops
        // instead of backing up the bounded channel.
        drop(events_rx);
        let (progress_tx, _progress_rx) = watch::channel(UploadProgress::default());

        execute(
            self.transport.as_ref(),
            &self.config,
            &self.api_key,
            candidate,
            &events_tx,
            progress_tx,
        )
        .await
    }
}

async fn execute(
    transport: &dyn FileTransport,
    config: &EngineConfig,
    api_key: &str,
    candidate: SourceCandidate,
    events: &mpsc::Sender<RunEvent>,
    progress: watch::Sender<UploadProgress>,
) -> Result<GenerationResult, EngineError> {
    let source = source::prepare(candidate, config.max_payload_bytes)?;

    let (prompt_text, attachment) = match source {
        Source::Remote { locator } => {
            tracing::info!("Remote source, skipping upload: {}", locator);
            (prompt::remote_locator_prompt(&locator), None)
        }
        Source::LocalPayload {
            bytes,
            name,
            mime_type,
            size_bytes,
        } => {
            emit(
                events,
                StatusEvent::UploadStart {
                    name: name.clone(),
                    mime_type: mime_type.clone(),
                    size_bytes,
                },
            )
            .await;
            tracing::info!("Uploading {} ({} bytes, {})", name, size_bytes, mime_type);

            let session = transport
                .begin_upload(api_key, &name, &mime_type, size_bytes)
                .await?;
            let handle = transport.send_payload(&session, bytes, progress).await?;

            emit(
                events,
                StatusEvent::UploadComplete {
                    name: handle.name.clone().unwrap_or_default(),
                    state: handle.state,
                },
            )
            .await;

            let file_name = handle.name.clone().ok_or_else(|| {
                TransportError::MalformedResponse("upload response missing file name".to_string())
            })?;
            let uri = handle.uri.clone().ok_or_else(|| {
                TransportError::MalformedResponse("upload response missing file uri".to_string())
            })?;
            let remote_mime = handle.mime_type.clone().ok_or_else(|| {
                TransportError::MalformedResponse("upload response missing mime type".to_string())
            })?;

            let poller = BackoffPoller::new(
                transport,
                config.initial_poll_delay_ms,
                config.max_poll_delay_ms,
                config.max_poll_attempts,
            );
            poller
                .wait_until_active(api_key, &file_name, handle, events)
                .await?;

            (
                prompt::uploaded_file_prompt(),
                Some(FileReference {
                    uri,
                    mime_type: remote_mime,
                }),
            )
        }
    };

    emit(
        events,
        StatusEvent::GenerateStart {
            model: config.model_id.clone(),
        },
    )
    .await;
    tracing::info!("Generating with model {}", config.model_id);

    let raw = transport
        .generate(api_key, &config.model_id, &prompt_text, attachment.as_ref())
        .await?;

    emit(
        events,
        StatusEvent::GenerateReceived {
            model: config.model_id.clone(),
        },
    )
    .await;

    let parsed = parser::parse_response(&raw);
    let estimated_cost_usd = estimate_cost_usd(config, prompt_text.len(), raw.len());

    Ok(GenerationResult {
        transcript: parsed.transcript,
        notes: parsed.notes,
        model: config.model_id.clone(),
        estimated_cost_usd,
        raw_response_fallback: parsed.raw_fallback,
        completed_at: chrono::Utc::now(),
    })
}

async fn emit(events: &mpsc::Sender<RunEvent>, event: StatusEvent) {
    // Best-effort: a caller that stopped listening does not fail the run
    let _ = events.send(RunEvent::Status(event)).await;
}

// Rough 4-chars-per-token approximation over prompt + response text.
// Media tokens are not visible at this layer and are not counted.
fn estimate_cost_usd(config: &EngineConfig, prompt_chars: usize, response_chars: usize) -> f64 {
    let prompt_tokens = prompt_chars as f64 / CHARS_PER_TOKEN;
    let output_tokens = response_chars as f64 / CHARS_PER_TOKEN;
    (prompt_tokens / 1000.0) * config.prompt_cost_per_1k_tokens_usd
        + (output_tokens / 1000.0) * config.output_cost_per_1k_tokens_usd
}
