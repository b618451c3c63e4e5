// src/events.rs
// Caller-facing stream vocabulary: status events, upload progress, run records

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::FileState;

/// One progress notification, emitted in strict temporal order by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEvent {
    #[serde(rename_all = "camelCase")]
    UploadStart {
        name: String,
        mime_type: String,
        size_bytes: u64,
    },
    #[serde(rename_all = "camelCase")]
    UploadComplete { name: String, state: FileState },
    #[serde(rename_all = "camelCase")]
    FileProcessing {
        name: String,
        attempt: u32,
        next_delay_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    FileActive { name: String },
    GenerateStart { model: String },
    GenerateReceived { model: String },
}

/// Byte-level upload progress for live speed/ETA display.
///
/// Side channel only: monotonic counts, no ordering contract against
/// [`StatusEvent`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

/// Terminal output of one successful orchestration run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub transcript: String,
    pub notes: Vec<String>,
    pub model: String,
    pub estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response_fallback: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// One record on the run's event stream.
///
/// A run yields zero or more `Status` records followed by exactly one
/// `Completed` or `Failed` record; a cancelled run just closes the stream.
#[derive(Debug)]
pub enum RunEvent {
    Status(StatusEvent),
    Completed(Box<GenerationResult>),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_event_serializes_tagged_camel_case() {
        let event = StatusEvent::FileProcessing {
            name: "files/abc".to_string(),
            attempt: 1,
            next_delay_ms: 100,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "fileProcessing");
        assert_eq!(json["attempt"], 1);
        assert_eq!(json["nextDelayMs"], 100);
    }

    #[test]
    fn test_upload_complete_carries_wire_state() {
        let event = StatusEvent::UploadComplete {
            name: "files/abc".to_string(),
            state: FileState::Processing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "PROCESSING");
    }

    #[test]
    fn test_result_omits_absent_fallback() {
        let result = GenerationResult {
            transcript: "hi".to_string(),
            notes: vec![],
            model: "gemini-2.5-flash".to_string(),
            estimated_cost_usd: 0.01,
            raw_response_fallback: None,
            completed_at: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("rawResponseFallback").is_none());
        assert_eq!(json["estimatedCostUsd"], 0.01);
    }
}
