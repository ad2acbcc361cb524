//! Scriptable in-memory transport shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::registry::RequestRegistry;
use crate::transport::{Transport, TransportFuture};
use crate::types::{ProgressEvent, ProgressFn, RawResponse, UploadFile};

/// Scripted outcome of one upload call.
pub(crate) enum Reply {
    Respond(RawResponse),
    Fail(TransportError),
    /// Blocks until the handle is cancelled, then reports an abort.
    WaitForCancel,
    /// Blocks until the gate opens (or the handle is cancelled).
    Gated(Arc<Notify>, RawResponse),
}

pub(crate) fn ok(text: &str) -> RawResponse {
    RawResponse::new(200, "OK", text)
}

pub(crate) fn status(code: u16, text: &str) -> RawResponse {
    RawResponse::new(code, "Error", text)
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    presign_replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    /// Upload replies keyed by file name.
    upload_replies: Mutex<HashMap<String, Reply>>,
    pub presign_calls: Mutex<Vec<(String, Option<String>)>>,
    pub upload_urls: Mutex<Vec<String>>,
    /// Registry uids observed when each upload call started.
    pub registry_seen: Mutex<Vec<Vec<String>>>,
    registry: Option<RequestRegistry>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observing(registry: RequestRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::default()
        }
    }

    pub fn push_presign(&self, reply: Result<RawResponse, TransportError>) {
        self.presign_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_upload(&self, file_name: &str, reply: Reply) {
        self.upload_replies
            .lock()
            .unwrap()
            .insert(file_name.to_string(), reply);
    }
}

impl Transport for FakeTransport {
    fn presign_request<'a>(
        &'a self,
        url: &'a str,
        token: Option<&'a str>,
    ) -> TransportFuture<'a> {
        self.presign_calls
            .lock()
            .unwrap()
            .push((url.to_string(), token.map(str::to_string)));
        let reply = self.presign_replies.lock().unwrap().pop_front();

        Box::pin(async move {
            reply.unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
        })
    }

    fn upload_request<'a>(
        &'a self,
        target_url: &'a str,
        file: &'a UploadFile,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> TransportFuture<'a> {
        self.upload_urls.lock().unwrap().push(target_url.to_string());
        if let Some(registry) = &self.registry {
            self.registry_seen.lock().unwrap().push(registry.uids());
        }
        let reply = self.upload_replies.lock().unwrap().remove(&file.name);

        Box::pin(async move {
            let total = file.len();
            on_progress(ProgressEvent::new(total / 2, total));
            on_progress(ProgressEvent::new(total, total));

            match reply {
                Some(Reply::Respond(resp)) => Ok(resp),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::WaitForCancel) => {
                    cancel.cancelled().await;
                    Err(TransportError::Aborted)
                }
                Some(Reply::Gated(gate, resp)) => {
                    tokio::select! {
                        _ = cancel.cancelled() => Err(TransportError::Aborted),
                        _ = gate.notified() => Ok(resp),
                    }
                }
                None => Err(TransportError::Other("no scripted reply".into())),
            }
        })
    }
}
