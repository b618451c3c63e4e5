// src/transport/mod.rs
// Transport seam: the four remote operations behind an adapter trait

mod gemini;
mod types;

pub use gemini::GeminiTransport;
pub use types::{FileState, RemoteFileHandle, TransportError};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::events::UploadProgress;

/// Remote file + generation operations.
///
/// Each operation is independently re-invocable by the caller; none retries
/// internally. Implementations must be shareable across concurrent runs.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Open a resumable upload session and return its locator
    async fn begin_upload(
        &self,
        api_key: &str,
        display_name: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<String, TransportError>;

    /// Stream the payload into the session, publishing byte progress as a
    /// side channel, and parse the completion response into a file handle
    async fn send_payload(
        &self,
        session_locator: &str,
        bytes: Bytes,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<RemoteFileHandle, TransportError>;

    /// Fetch the current state of a previously created remote file
    async fn get_file_status(
        &self,
        api_key: &str,
        file_name: &str,
    ) -> Result<RemoteFileHandle, TransportError>;

    /// Submit a generation request, optionally attaching an active remote
    /// file, and return the first text fragment of the response
    async fn generate(
        &self,
        api_key: &str,
        model_id: &str,
        prompt: &str,
        attachment: Option<&FileReference>,
    ) -> Result<String, TransportError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// A validated reference to an active remote file, ready to attach to a
/// generation request
#[derive(Debug, Clone)]
pub struct FileReference {
    pub uri: String,
    pub mime_type: String,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub fn handle_in_state(state: FileState) -> RemoteFileHandle {
        RemoteFileHandle {
            name: Some("files/abc".to_string()),
            uri: Some("https://example/v1beta/files/abc".to_string()),
            mime_type: Some("video/mp4".to_string()),
            state,
            error_message: None,
        }
    }

    /// Scripted in-memory transport for orchestrator and poller tests.
    ///
    /// `get_file_status` pops scripted handles in order and keeps answering
    /// `Processing` once the script runs out.
    pub struct MockTransport {
        pub session_locator: String,
        pub upload_handle: RemoteFileHandle,
        pub generate_text: String,
        statuses: Mutex<VecDeque<RemoteFileHandle>>,
        calls: Mutex<Vec<String>>,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self {
                session_locator: "https://example/upload/session/1".to_string(),
                upload_handle: handle_in_state(FileState::Processing),
                generate_text: r#"{"transcript":"hello","notes":["a"]}"#.to_string(),
                statuses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockTransport {
        pub fn with_statuses(self, statuses: Vec<RemoteFileHandle>) -> Self {
            *self.statuses.lock().unwrap() = statuses.into();
            self
        }

        pub fn with_upload_handle(mut self, handle: RemoteFileHandle) -> Self {
            self.upload_handle = handle;
            self
        }

        pub fn with_generate_text(mut self, text: &str) -> Self {
            self.generate_text = text.to_string();
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, op: &str) {
            self.calls.lock().unwrap().push(op.to_string());
        }
    }

    #[async_trait]
    impl FileTransport for MockTransport {
        async fn begin_upload(
            &self,
            _api_key: &str,
            _display_name: &str,
            _mime_type: &str,
            _size_bytes: u64,
        ) -> Result<String, TransportError> {
            self.record("begin_upload");
            Ok(self.session_locator.clone())
        }

        async fn send_payload(
            &self,
            _session_locator: &str,
            bytes: Bytes,
            progress: watch::Sender<UploadProgress>,
        ) -> Result<RemoteFileHandle, TransportError> {
            self.record("send_payload");
            let total_bytes = bytes.len() as u64;
            let _ = progress.send(UploadProgress {
                bytes_sent: total_bytes,
                total_bytes,
            });
            Ok(self.upload_handle.clone())
        }

        async fn get_file_status(
            &self,
            _api_key: &str,
            _file_name: &str,
        ) -> Result<RemoteFileHandle, TransportError> {
            self.record("get_file_status");
            let next = self.statuses.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| handle_in_state(FileState::Processing)))
        }

        async fn generate(
            &self,
            _api_key: &str,
            _model_id: &str,
            _prompt: &str,
            _attachment: Option<&FileReference>,
        ) -> Result<String, TransportError> {
            self.record("generate");
            Ok(self.generate_text.clone())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
