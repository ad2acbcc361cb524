//! Uploader configuration.

use serde::{Deserialize, Serialize};

/// Default header carrying the caller's token on presign requests.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-Token";

/// Default body chunk size (64 KiB). One progress event is emitted per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Tunables for [`Uploader`](crate::Uploader) and [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Header name for the presign token.
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,

    /// Merge the descriptor's base URL into upload results as `uploadURL`.
    #[serde(default = "default_true")]
    pub attach_upload_url: bool,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-request timeout applied by the HTTP transport. None waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_csrf_header() -> String {
    DEFAULT_CSRF_HEADER.into()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            csrf_header: default_csrf_header(),
            attach_upload_url: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout_secs: None,
        }
    }
}

impl UploaderConfig {
    /// Chunk size clamped to at least one byte.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: UploaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, UploaderConfig::default());
        assert_eq!(config.csrf_header, "X-CSRF-Token");
        assert!(config.attach_upload_url);
    }

    #[test]
    fn timeout_omitted_when_unset() {
        let json = serde_json::to_string(&UploaderConfig::default()).unwrap();
        assert!(!json.contains("request_timeout_secs"));
    }

    #[test]
    fn zero_chunk_size_clamped() {
        let config = UploaderConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_chunk_size(), 1);
    }
}
