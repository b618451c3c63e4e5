// src/transport/gemini.rs
// Google Generative Language transport: resumable file upload + generateContent

use super::types::{FileState, RemoteFileHandle, TransportError};
use super::{FileReference, FileTransport};
use crate::events::UploadProgress;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

const BASE_URL: &str = "https://generativelanguage.googleapis.com";
const CONNECT_TIMEOUT_SECS: u64 = 15;
const CONTROL_TIMEOUT_SECS: u64 = 30;
const GENERATE_TIMEOUT_SECS: u64 = 600;
const UPLOAD_CHUNK_BYTES: usize = 1024 * 1024;
const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 8192;

// --- wire shapes ---

#[derive(Serialize)]
struct StartUploadRequest<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartUploadFile<'a> {
    display_name: &'a str,
}

#[derive(Deserialize)]
struct UploadCompleteResponse {
    file: FileWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileWire {
    name: Option<String>,
    uri: Option<String>,
    mime_type: Option<String>,
    state: Option<FileState>,
    error: Option<FileErrorWire>,
}

#[derive(Deserialize)]
struct FileErrorWire {
    message: Option<String>,
}

impl FileWire {
    fn into_handle(self) -> RemoteFileHandle {
        RemoteFileHandle {
            name: self.name,
            uri: self.uri,
            mime_type: self.mime_type,
            state: self.state.unwrap_or(FileState::Unspecified),
            error_message: self.error.and_then(|e| e.message),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    file_uri: &'a str,
    mime_type: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

fn first_text_fragment(response: &GenerateResponse) -> Option<String> {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| {
            part.text
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
        })
}

// --- transport ---

pub struct GeminiTransport {
    client: reqwest::Client,
}

impl GeminiTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!("Gemini transport initialized");

        Self { client }
    }

    async fn error_for_status(response: reqwest::Response) -> TransportError {
        let status = response.status();
        match status.as_u16() {
            401 | 403 => TransportError::AuthenticationError,
            429 => TransportError::RateLimited,
            code => {
                let body = response.text().await.unwrap_or_default();
                TransportError::ServiceError { status: code, body }
            }
        }
    }
}

impl Default for GeminiTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::TimeoutError
    } else {
        TransportError::NetworkError(error.to_string())
    }
}

fn chunk_payload(bytes: &Bytes) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(bytes.len() / UPLOAD_CHUNK_BYTES + 1);
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + UPLOAD_CHUNK_BYTES).min(bytes.len());
        chunks.push(bytes.slice(offset..end));
        offset = end;
    }
    chunks
}

#[async_trait]
impl FileTransport for GeminiTransport {
    async fn begin_upload(
        &self,
        api_key: &str,
        display_name: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<String, TransportError> {
        let url = format!("{}/upload/v1beta/files?key={}", BASE_URL, api_key);

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size_bytes)
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: StartUploadFile { display_name },
            })
            .timeout(Duration::from_secs(CONTROL_TIMEOUT_SECS))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(TransportError::MissingSessionLocator)
    }

    async fn send_payload(
        &self,
        session_locator: &str,
        bytes: Bytes,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<RemoteFileHandle, TransportError> {
        let total_bytes = bytes.len() as u64;
        let _ = progress.send(UploadProgress {
            bytes_sent: 0,
            total_bytes,
        });

        tracing::info!("Uploading payload: {} bytes", total_bytes);

        // Counting happens as the body stream yields chunks, so the watch
        // channel tracks what has actually been handed to the socket.
        let mut bytes_sent = 0u64;
        let body_stream = futures::stream::iter(chunk_payload(&bytes)).map(move |chunk| {
            bytes_sent += chunk.len() as u64;
            let _ = progress.send(UploadProgress {
                bytes_sent,
                total_bytes,
            });
            Ok::<Bytes, std::convert::Infallible>(chunk)
        });

        let response = self
            .client
            .post(session_locator)
            .header(CONTENT_LENGTH, total_bytes)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let completion: UploadCompleteResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        Ok(completion.file.into_handle())
    }

    async fn get_file_status(
        &self,
        api_key: &str,
        file_name: &str,
    ) -> Result<RemoteFileHandle, TransportError> {
        // file_name is the opaque remote identifier, e.g. "files/abc123"
        let url = format!("{}/v1beta/{}?key={}", BASE_URL, file_name, api_key);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(CONTROL_TIMEOUT_SECS))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let file: FileWire = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        Ok(file.into_handle())
    }

    async fn generate(
        &self,
        api_key: &str,
        model_id: &str,
        prompt: &str,
        attachment: Option<&FileReference>,
    ) -> Result<String, TransportError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            BASE_URL, model_id, api_key
        );

        let mut parts = Vec::with_capacity(2);
        if let Some(file) = attachment {
            parts.push(Part::FileData {
                file_data: FileData {
                    file_uri: &file.uri,
                    mime_type: &file.mime_type,
                },
            });
        }
        parts.push(Part::Text { text: prompt });

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        first_text_fragment(&generated).ok_or(TransportError::EmptyGeneration)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
