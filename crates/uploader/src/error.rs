//! Error types for the presign → upload pipeline.
//!
//! Every failure reaching the caller is an [`UploadError`], tagged with the
//! [`Stage`] that produced it.

use std::error::Error as _;
use std::fmt;

use serde::Serialize;

use crate::types::RawResponse;

/// Errors raised by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request aborted")]
    Aborted,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    Other(String),
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PresignRequest,
    UploadRequest,
    ResponseStatus,
    ResponseDecode,
}

impl Stage {
    /// Stable identifier reported to callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PresignRequest => "presignRequest",
            Stage::UploadRequest => "uploadRequest",
            Stage::ResponseStatus => "responseStatus",
            Stage::ResponseDecode => "responseDecode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two stages that issue a network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Presign,
    Upload,
}

/// Errors surfaced by [`Uploader`](crate::Uploader).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("presign request failed: {0}")]
    PresignRequest(#[source] TransportError),

    #[error("upload request failed: {0}")]
    UploadRequest(#[source] TransportError),

    #[error("unexpected status {status}: {status_text}")]
    ResponseStatus {
        status: u16,
        status_text: String,
        response: RawResponse,
    },

    #[error("invalid JSON body: {source}")]
    ResponseDecode {
        #[source]
        source: serde_json::Error,
        response: RawResponse,
    },
}

impl UploadError {
    /// Wraps a transport failure with the stage that issued the request.
    pub fn wrap(stage: RequestStage, cause: TransportError) -> Self {
        match stage {
            RequestStage::Presign => UploadError::PresignRequest(cause),
            RequestStage::Upload => UploadError::UploadRequest(cause),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            UploadError::PresignRequest(_) => Stage::PresignRequest,
            UploadError::UploadRequest(_) => Stage::UploadRequest,
            UploadError::ResponseStatus { .. } => Stage::ResponseStatus,
            UploadError::ResponseDecode { .. } => Stage::ResponseDecode,
        }
    }

    /// True when the upload ended because its in-flight handle was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::UploadRequest(TransportError::Aborted))
    }

    /// The response that failed validation or decoding, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            UploadError::ResponseStatus { response, .. }
            | UploadError::ResponseDecode { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Flattens the error into a `{name, message, error}` record.
    pub fn report(&self) -> ErrorReport {
        let error = match self.source() {
            Some(source) => source.to_string(),
            None => self.to_string(),
        };
        ErrorReport {
            name: self.stage().as_str(),
            message: self.to_string(),
            error,
        }
    }
}

/// Serializable error record for UIs and log sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub name: &'static str,
    pub message: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_tags_stage() {
        let err = UploadError::wrap(RequestStage::Presign, TransportError::Other("boom".into()));
        assert_eq!(err.stage(), Stage::PresignRequest);
        assert_eq!(err.report().name, "presignRequest");

        let err = UploadError::wrap(RequestStage::Upload, TransportError::Aborted);
        assert_eq!(err.stage(), Stage::UploadRequest);
        assert!(err.is_cancelled());
    }

    #[test]
    fn report_carries_cause() {
        let err = UploadError::wrap(
            RequestStage::Upload,
            TransportError::Other("connection reset".into()),
        );
        let report = err.report();
        assert_eq!(report.name, "uploadRequest");
        assert_eq!(report.error, "connection reset");
        assert!(report.message.contains("connection reset"));
    }

    #[test]
    fn status_error_keeps_response() {
        let response = RawResponse::new(500, "Internal Server Error", "oops");
        let err = UploadError::ResponseStatus {
            status: 500,
            status_text: "Internal Server Error".into(),
            response: response.clone(),
        };
        assert_eq!(err.stage().as_str(), "responseStatus");
        assert_eq!(err.response(), Some(&response));
        assert!(!err.is_cancelled());
        assert_eq!(err.report().error, err.to_string());
    }

    #[test]
    fn report_serializes() {
        let err = UploadError::wrap(RequestStage::Presign, TransportError::Aborted);
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["name"], "presignRequest");
        assert_eq!(json["error"], "request aborted");
    }
}
