//! Transport abstraction and the `reqwest`-backed implementation.
//!
//! The pipeline only needs two calls from the network layer: a presign POST
//! and an upload PUT. Keeping them behind [`Transport`] lets tests swap in
//! fakes without touching validation, decoding or the registry.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{
    ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::UploaderConfig;
use crate::error::TransportError;
use crate::types::{ProgressEvent, ProgressFn, RawResponse, UploadFile};

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;

/// Network capability required by the uploader.
pub trait Transport: Send + Sync {
    /// POSTs to the presign endpoint, sending `token` when it is non-empty.
    fn presign_request<'a>(&'a self, url: &'a str, token: Option<&'a str>)
    -> TransportFuture<'a>;

    /// PUTs `file` to `target_url`, reporting progress and aborting with
    /// [`TransportError::Aborted`] once `cancel` fires.
    fn upload_request<'a>(
        &'a self,
        target_url: &'a str,
        file: &'a UploadFile,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> TransportFuture<'a>;
}

/// HTTP transport built on `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    csrf_header: HeaderName,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: &UploaderConfig) -> Result<Self, TransportError> {
        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(config.csrf_header.clone()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            csrf_header,
            chunk_size: config.effective_chunk_size(),
        })
    }
}

impl Transport for HttpTransport {
    fn presign_request<'a>(
        &'a self,
        url: &'a str,
        token: Option<&'a str>,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut req = self.http.post(url).headers(json_headers());
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                let value = HeaderValue::from_str(token)
                    .map_err(|_| TransportError::InvalidHeader(self.csrf_header.to_string()))?;
                req = req.header(self.csrf_header.clone(), value);
            }

            debug!(url = %url, "sending presign request");
            let resp = req.send().await?;
            read_response(resp).await
        })
    }

    fn upload_request<'a>(
        &'a self,
        target_url: &'a str,
        file: &'a UploadFile,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let body = chunked_body(file.content.clone(), self.chunk_size, on_progress);
            let req = self
                .http
                .put(target_url)
                .headers(json_headers())
                .header(CONTENT_LENGTH, file.len())
                .body(body);

            debug!(file = %file.name, bytes = file.len(), "sending upload request");
            let exchange = async {
                let resp = req.send().await?;
                read_response(resp).await
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Aborted),
                result = exchange => result,
            }
        })
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

async fn read_response(resp: reqwest::Response) -> Result<RawResponse, TransportError> {
    let status = resp.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let text = resp.text().await?;
    Ok(RawResponse {
        status: status.as_u16(),
        status_text,
        text,
    })
}

/// Streams `content` in `chunk_size` slices, reporting progress as each
/// slice is pulled by the HTTP client.
fn chunked_body(content: Bytes, chunk_size: usize, on_progress: ProgressFn) -> reqwest::Body {
    let total = content.len();
    let chunks = (0..total).step_by(chunk_size).map(move |start| {
        let end = (start + chunk_size).min(total);
        on_progress(ProgressEvent::new(end as u64, total as u64));
        Ok::<Bytes, std::io::Error>(content.slice(start..end))
    });
    reqwest::Body::wrap_stream(futures_util::stream::iter(chunks))
}
