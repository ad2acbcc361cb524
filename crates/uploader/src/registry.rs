//! Registry of in-flight uploads keyed by caller-supplied `uid`.
//!
//! An entry exists exactly while its upload is in flight. Cancellation and
//! natural completion race to remove the same entry; whichever runs first
//! wins and the other finds nothing to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Cancellable reference to one in-flight transfer.
#[derive(Debug, Clone)]
pub struct InFlightHandle {
    id: u64,
    token: CancellationToken,
}

impl InFlightHandle {
    pub fn new() -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    /// Aborts the transfer this handle belongs to.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token the transport watches for cancellation.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Default for InFlightHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InFlightHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InFlightHandle {}

/// Shared map from `uid` to [`InFlightHandle`].
///
/// Cloning yields another reference to the same map.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    inner: Arc<Mutex<HashMap<String, InFlightHandle>>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, InFlightHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `handle` under `uid`, returning any handle it replaced.
    pub fn register(
        &self,
        uid: impl Into<String>,
        handle: InFlightHandle,
    ) -> Option<InFlightHandle> {
        let uid = uid.into();
        debug!(uid = %uid, "registering in-flight upload");
        self.lock().insert(uid, handle)
    }

    /// Snapshot of the current entries.
    pub fn get(&self) -> HashMap<String, InFlightHandle> {
        self.lock().clone()
    }

    /// Merges `entries` into the registry and returns the resulting snapshot.
    pub fn set<I, K>(&self, entries: I) -> HashMap<String, InFlightHandle>
    where
        I: IntoIterator<Item = (K, InFlightHandle)>,
        K: Into<String>,
    {
        let mut map = self.lock();
        map.extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        map.clone()
    }

    /// Cancels and removes the entry for `uid`.
    ///
    /// Returns `false` when no entry exists, which is expected when the
    /// upload already finished.
    pub fn cancel(&self, uid: &str) -> bool {
        self.cancel_with(uid, InFlightHandle::cancel)
    }

    /// Removes the entry for `uid`, invoking `f` on it instead of cancelling.
    pub fn cancel_with<F>(&self, uid: &str, f: F) -> bool
    where
        F: FnOnce(&InFlightHandle),
    {
        // Remove under the lock, run the callback outside it.
        let Some(handle) = self.lock().remove(uid) else {
            debug!(uid = %uid, "cancel requested for unknown upload");
            return false;
        };
        f(&handle);
        debug!(uid = %uid, "cancelled in-flight upload");
        true
    }

    /// Removes the entry for `uid` unconditionally.
    pub fn remove(&self, uid: &str) -> Option<InFlightHandle> {
        self.lock().remove(uid)
    }

    /// Removes the entry for `uid` only if it is still `handle`.
    ///
    /// Used on completion so a finished upload never evicts a newer
    /// registration under the same `uid`.
    pub fn remove_if_current(&self, uid: &str, handle: &InFlightHandle) -> bool {
        let mut map = self.lock();
        if map.get(uid) == Some(handle) {
            map.remove(uid);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.lock().contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted list of registered `uid`s.
    pub fn uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.lock().keys().cloned().collect();
        uids.sort();
        uids
    }
}

/// Consumes cancellation requests (`uid`s) until the channel closes.
pub fn spawn_cancel_listener(
    registry: RequestRegistry,
    mut rx: mpsc::Receiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(uid) = rx.recv().await {
            registry.cancel(&uid);
        }
        debug!("cancel listener stopped");
    })
}
