//! Upload stage: stream a file to the presigned storage endpoint.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{RequestStage, TransportError, UploadError};
use crate::registry::{InFlightHandle, RequestRegistry};
use crate::response::{decode, merge_upload_url, validate};
use crate::transport::Transport;
use crate::types::{
    FileUploadTask, PresignDescriptor, ProgressCallback, ProgressEvent, ProgressFn,
    ResponseContext,
};

/// Builds the storage target URL.
///
/// Parameter order and names are fixed by the storage endpoint; values are
/// concatenated as-is.
pub fn build_upload_url(
    url: &str,
    uuid: &str,
    expiration: &str,
    hmac: &str,
    filename: &str,
) -> String {
    format!("{url}?uuid={uuid}&expiration={expiration}&hmac={hmac}&file={filename}")
}

/// Removes the registry entry when the transfer settles or is dropped.
struct Registration<'a> {
    registry: &'a RequestRegistry,
    uid: &'a str,
    handle: InFlightHandle,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.registry.remove_if_current(self.uid, &self.handle) {
            debug!(uid = %self.uid, "in-flight upload deregistered");
        }
    }
}

/// Runs one tracked upload.
pub struct UploadExecutor<'a> {
    transport: &'a dyn Transport,
    registry: &'a RequestRegistry,
    attach_upload_url: bool,
}

impl<'a> UploadExecutor<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        registry: &'a RequestRegistry,
        attach_upload_url: bool,
    ) -> Self {
        Self {
            transport,
            registry,
            attach_upload_url,
        }
    }

    /// Registers the transfer under `task.uid`, sends the file, deregisters,
    /// then validates and decodes the response.
    pub async fn execute(
        &self,
        descriptor: PresignDescriptor,
        task: FileUploadTask,
        on_progress: ProgressCallback,
    ) -> Result<serde_json::Value, UploadError> {
        let FileUploadTask { uid, file } = task;
        let target = build_upload_url(
            &descriptor.url,
            &descriptor.uuid,
            &descriptor.expiration,
            &descriptor.hmac,
            &file.name,
        );

        let handle = InFlightHandle::new();
        let cancel = handle.token();
        self.registry.register(uid.as_str(), handle.clone());
        let registration = Registration {
            registry: self.registry,
            uid: &uid,
            handle,
        };

        let progress: ProgressFn = {
            let file = file.clone();
            Arc::new(move |event: ProgressEvent| on_progress(&event, &file))
        };

        let result = self
            .transport
            .upload_request(&target, &file, cancel, progress)
            .await;
        drop(registration);

        let response = result.map_err(|e| {
            match &e {
                TransportError::Aborted => info!(uid = %uid, "upload cancelled"),
                _ => warn!(uid = %uid, error = %e, "upload request failed"),
            }
            UploadError::wrap(RequestStage::Upload, e)
        })?;

        debug!(uid = %uid, status = response.status, "upload response received");
        let ctx = validate(ResponseContext::with_upload_url(response, descriptor.url))?;
        let decoded = decode::<serde_json::Value>(ctx)?;

        info!(uid = %uid, file = %file.name, "upload complete");
        if self.attach_upload_url {
            Ok(merge_upload_url(decoded))
        } else {
            Ok(decoded.body)
        }
    }
}
