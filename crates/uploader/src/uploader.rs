//! Public entry points: [`Uploader::presign`] and [`Uploader::upload`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::config::UploaderConfig;
use crate::error::{TransportError, UploadError};
use crate::presign::PresignClient;
use crate::registry::{RequestRegistry, spawn_cancel_listener};
use crate::transport::{HttpTransport, Transport};
use crate::types::{FileUploadTask, PresignDescriptor, ProgressCallback, ProgressEvent, UploadFile};
use crate::upload::UploadExecutor;

/// Composes the presign and upload stages over an injected transport and
/// a shared in-flight registry.
pub struct Uploader {
    transport: Arc<dyn Transport>,
    registry: RequestRegistry,
    config: UploaderConfig,
}

impl Uploader {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: RequestRegistry,
        config: UploaderConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            config,
        }
    }

    /// Creates an uploader backed by [`HttpTransport`] and a fresh registry.
    pub fn http(config: UploaderConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), RequestRegistry::new(), config))
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Requests an upload descriptor from `presign_url`.
    ///
    /// `T` is usually [`PresignDescriptor`].
    pub async fn presign<T: DeserializeOwned>(
        &self,
        presign_url: &str,
        token: Option<&str>,
    ) -> Result<T, UploadError> {
        PresignClient::new(self.transport.as_ref())
            .request(presign_url, token)
            .await
    }

    /// Uploads `task.file` to the endpoint named by `descriptor`.
    ///
    /// The upload is cancellable via [`cancel`](Self::cancel) with `task.uid`
    /// until it settles.
    pub async fn upload(
        &self,
        descriptor: PresignDescriptor,
        task: FileUploadTask,
        on_progress: Option<ProgressCallback>,
    ) -> Result<serde_json::Value, UploadError> {
        let on_progress = on_progress.unwrap_or_else(noop_progress);
        UploadExecutor::new(
            self.transport.as_ref(),
            &self.registry,
            self.config.attach_upload_url,
        )
        .execute(descriptor, task, on_progress)
        .await
    }

    /// Cancels the in-flight upload registered under `uid`, if any.
    pub fn cancel(&self, uid: &str) -> bool {
        self.registry.cancel(uid)
    }

    /// Returns a sender whose `uid` messages cancel matching uploads.
    ///
    /// Must be called inside a tokio runtime. The listener stops once every
    /// sender is dropped.
    pub fn cancel_channel(&self, buffer: usize) -> mpsc::Sender<String> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        spawn_cancel_listener(self.registry.clone(), rx);
        tx
    }
}

fn noop_progress() -> ProgressCallback {
    Arc::new(|_: &ProgressEvent, _: &UploadFile| {})
}
