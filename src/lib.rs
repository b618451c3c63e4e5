// src/lib.rs
// clipnotes core: upload-poll-generate orchestration for remote video
// understanding. The HTTP/UI layer lives elsewhere; it calls start(), frames
// the RunEvent stream however it likes, and renders the progress events.

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod parser;
pub mod poller;
pub mod source;
pub mod transport;

pub use config::EngineConfig;
pub use events::{GenerationResult, RunEvent, StatusEvent, UploadProgress};
pub use orchestrator::{EngineError, Orchestrator, RunHandle};
pub use parser::{parse_response, ParsedResponse};
pub use poller::{BackoffPoller, BackoffState, PollError};
pub use source::{prepare, PayloadCandidate, Source, SourceCandidate, ValidationError};
pub use transport::{
    FileReference, FileState, FileTransport, GeminiTransport, RemoteFileHandle, TransportError,
};
