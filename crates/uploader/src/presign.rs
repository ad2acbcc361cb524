//! Presign stage: request an upload descriptor from the server.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{RequestStage, UploadError};
use crate::response::{decode, validate};
use crate::transport::Transport;
use crate::types::ResponseContext;

/// Issues one descriptor request and reduces the response.
pub struct PresignClient<'a> {
    transport: &'a dyn Transport,
}

impl<'a> PresignClient<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Transport → validate → decode. Single attempt, no retry.
    pub async fn request<T: DeserializeOwned>(
        &self,
        presign_url: &str,
        token: Option<&str>,
    ) -> Result<T, UploadError> {
        let response = self
            .transport
            .presign_request(presign_url, token)
            .await
            .map_err(|e| {
                warn!(url = %presign_url, error = %e, "presign request failed");
                UploadError::wrap(RequestStage::Presign, e)
            })?;

        debug!(url = %presign_url, status = response.status, "presign response received");
        let ctx = validate(ResponseContext::new(response))?;
        Ok(decode::<T>(ctx)?.body)
    }
}
