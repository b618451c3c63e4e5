// src/source.rs
// Input normalization: untrusted URL/payload candidates -> validated Source

use bytes::Bytes;
use thiserror::Error;
use url::Url;

/// A validated input for one orchestration run, constructed once via [`prepare`]
#[derive(Debug, Clone)]
pub enum Source {
    /// A remote video locator the model is asked to read directly
    Remote { locator: Url },
    /// A local binary payload that must be uploaded before generation
    LocalPayload {
        bytes: Bytes,
        name: String,
        mime_type: String,
        size_bytes: u64,
    },
}

/// Raw untrusted input as the caller layer hands it over
#[derive(Debug, Clone, Default)]
pub struct SourceCandidate {
    pub url: Option<String>,
    pub payload: Option<PayloadCandidate>,
}

#[derive(Debug, Clone)]
pub struct PayloadCandidate {
    pub bytes: Bytes,
    pub name: String,
    pub mime_type: String,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No video URL or uploaded file provided")]
    MissingInput,

    #[error("Invalid video URL: {0}")]
    InvalidLocator(String),

    #[error("Unsupported media type '{0}' (expected video/*)")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {size_bytes} bytes (max {max_bytes})")]
    PayloadTooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Validate a candidate into a `Source`. Pure: no I/O, no remote calls.
///
/// A non-empty binary payload wins over a URL string when both are present.
pub fn prepare(
    candidate: SourceCandidate,
    max_payload_bytes: u64,
) -> Result<Source, ValidationError> {
    if let Some(payload) = candidate.payload.filter(|p| !p.bytes.is_empty()) {
        return prepare_payload(payload, max_payload_bytes);
    }

    if let Some(raw) = candidate.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return prepare_locator(raw);
    }

    Err(ValidationError::MissingInput)
}

fn prepare_payload(
    payload: PayloadCandidate,
    max_payload_bytes: u64,
) -> Result<Source, ValidationError> {
    if !payload.mime_type.starts_with("video/") {
        return Err(ValidationError::UnsupportedMediaType(payload.mime_type));
    }

    let size_bytes = payload.bytes.len() as u64;
    check_payload_size(size_bytes, max_payload_bytes)?;

    Ok(Source::LocalPayload {
        bytes: payload.bytes,
        name: payload.name,
        mime_type: payload.mime_type,
        size_bytes,
    })
}

fn prepare_locator(raw: &str) -> Result<Source, ValidationError> {
    let locator =
        Url::parse(raw).map_err(|_| ValidationError::InvalidLocator(raw.to_string()))?;

    if !locator.scheme().starts_with("http") {
        return Err(ValidationError::InvalidLocator(raw.to_string()));
    }

    Ok(Source::Remote { locator })
}

// Limit is inclusive: a payload of exactly max_bytes passes.
fn check_payload_size(size_bytes: u64, max_bytes: u64) -> Result<(), ValidationError> {
    if size_bytes > max_bytes {
        return Err(ValidationError::PayloadTooLarge {
            size_bytes,
            max_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_PAYLOAD_BYTES;

    fn video_payload(bytes: &'static [u8]) -> PayloadCandidate {
        PayloadCandidate {
            bytes: Bytes::from_static(bytes),
            name: "clip.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
        }
    }

    #[test]
    fn test_payload_at_exact_limit_passes() {
        assert!(check_payload_size(MAX_PAYLOAD_BYTES, MAX_PAYLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_payload_one_byte_over_limit_fails() {
        let err = check_payload_size(MAX_PAYLOAD_BYTES + 1, MAX_PAYLOAD_BYTES).unwrap_err();
        assert!(matches!(err, ValidationError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_oversized_payload_rejected_end_to_end() {
        let candidate = SourceCandidate {
            url: None,
            payload: Some(video_payload(b"0123456789")),
        };
        let err = prepare(candidate, 9).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::PayloadTooLarge {
                size_bytes: 10,
                max_bytes: 9
            }
        ));
    }

    #[test]
    fn test_non_video_mime_rejected() {
        let candidate = SourceCandidate {
            url: None,
            payload: Some(PayloadCandidate {
                bytes: Bytes::from_static(b"abc"),
                name: "notes.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
            }),
        };
        let err = prepare(candidate, MAX_PAYLOAD_BYTES).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedMediaType(mime) if mime == "application/pdf"));
    }

    #[test]
    fn test_payload_wins_over_url() {
        let candidate = SourceCandidate {
            url: Some("https://example.com/clip.mp4".to_string()),
            payload: Some(video_payload(b"frames")),
        };
        let source = prepare(candidate, MAX_PAYLOAD_BYTES).unwrap();
        assert!(matches!(source, Source::LocalPayload { size_bytes: 6, .. }));
    }

    #[test]
    fn test_empty_payload_falls_back_to_url() {
        let candidate = SourceCandidate {
            url: Some("http://example.com/v".to_string()),
            payload: Some(video_payload(b"")),
        };
        let source = prepare(candidate, MAX_PAYLOAD_BYTES).unwrap();
        assert!(matches!(source, Source::Remote { .. }));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        for raw in ["ftp://x", "file:///tmp/clip.mp4", "not a url", "//missing-scheme"] {
            let candidate = SourceCandidate {
                url: Some(raw.to_string()),
                payload: None,
            };
            let err = prepare(candidate, MAX_PAYLOAD_BYTES).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidLocator(_)),
                "expected InvalidLocator for {raw:?}"
            );
        }
    }

    #[test]
    fn test_https_url_accepted() {
        let candidate = SourceCandidate {
            url: Some("https://example.com/watch?v=abc".to_string()),
            payload: None,
        };
        let source = prepare(candidate, MAX_PAYLOAD_BYTES).unwrap();
        match source {
            Source::Remote { locator } => assert_eq!(locator.scheme(), "https"),
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_candidate_is_missing_input() {
        let err = prepare(SourceCandidate::default(), MAX_PAYLOAD_BYTES).unwrap_err();
        assert!(matches!(err, ValidationError::MissingInput));
    }
}
