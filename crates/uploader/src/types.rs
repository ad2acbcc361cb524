//! Data types for the presign → upload flow.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-issued, time-limited upload authorization.
///
/// Produced by [`presign`](crate::Uploader::presign) and consumed by exactly
/// one [`upload`](crate::Uploader::upload) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignDescriptor {
    /// Base URL of the storage endpoint.
    pub url: String,
    pub uuid: String,
    /// Some servers send this as a unix timestamp number.
    #[serde(deserialize_with = "string_or_number")]
    pub expiration: String,
    pub hmac: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

/// A named blob of bytes to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Size of the file body in bytes.
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A file paired with the caller-chosen identifier used for cancellation.
///
/// `uid` must be unique among uploads that are in flight at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUploadTask {
    pub uid: String,
    pub file: UploadFile,
}

impl FileUploadTask {
    pub fn new(uid: impl Into<String>, file: UploadFile) -> Self {
        Self {
            uid: uid.into(),
            file,
        }
    }
}

/// Upload progress tick, shaped like a browser `ProgressEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Bytes handed to the transport so far.
    pub loaded: u64,
    pub total: u64,
    /// `loaded / total` scaled to 0–100. A zero-length body reports 100.
    pub percent: f64,
}

impl ProgressEvent {
    pub fn new(loaded: u64, total: u64) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            loaded as f64 / total as f64 * 100.0
        };
        Self {
            loaded,
            total,
            percent,
        }
    }
}

/// Caller-facing progress handler, invoked with each tick and the file being sent.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent, &UploadFile) + Send + Sync>;

/// Transport-facing progress sink.
pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A completed HTTP response, reduced to what the pipeline inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub text: String,
}

impl RawResponse {
    pub fn new(status: u16, status_text: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            text: text.into(),
        }
    }
}

/// A response travelling through validation and decoding, with the upload
/// base URL carried alongside when the upload stage produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    pub response: RawResponse,
    pub upload_url: Option<String>,
}

impl ResponseContext {
    pub fn new(response: RawResponse) -> Self {
        Self {
            response,
            upload_url: None,
        }
    }

    pub fn with_upload_url(response: RawResponse, upload_url: impl Into<String>) -> Self {
        Self {
            response,
            upload_url: Some(upload_url.into()),
        }
    }
}

/// A decoded body, still paired with the context's upload URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub body: T,
    pub upload_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_from_json() {
        let json = r#"{"url":"http://h","uuid":"U","expiration":"E","hmac":"H"}"#;
        let d: PresignDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.url, "http://h");
        assert_eq!(d.expiration, "E");
    }

    #[test]
    fn descriptor_numeric_expiration() {
        let json = r#"{"url":"http://h","uuid":"U","expiration":1458086083,"hmac":"H"}"#;
        let d: PresignDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.expiration, "1458086083");
    }

    #[test]
    fn descriptor_missing_field_rejected() {
        let json = r#"{"url":"http://h","uuid":"U"}"#;
        assert!(serde_json::from_str::<PresignDescriptor>(json).is_err());
    }

    #[test]
    fn progress_percent() {
        assert_eq!(ProgressEvent::new(50, 200).percent, 25.0);
        assert_eq!(ProgressEvent::new(0, 0).percent, 100.0);
    }

    #[test]
    fn upload_file_len() {
        let f = UploadFile::new("a.txt", b"abc".to_vec());
        assert_eq!(f.len(), 3);
        assert!(!f.is_empty());
    }
}
