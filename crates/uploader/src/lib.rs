//! Presign → upload client with cancellable in-flight uploads.
//!
//! A caller first asks a server for a short-lived upload descriptor, then
//! streams a file straight to the storage endpoint named in it. Every upload
//! is tracked in a [`RequestRegistry`] under a caller-chosen `uid` so that an
//! external signal (a UI button, Ctrl-C) can abort it.
//!
//! # Pipeline
//!
//! 1. **Presign** — POST to the descriptor endpoint, validate, decode
//! 2. **Register** — store a cancellable handle under the task's `uid`
//! 3. **Upload** — PUT the file body, reporting progress
//! 4. **Deregister** — drop the registry entry, whatever the outcome
//! 5. **Reduce** — validate the status and decode the JSON result
//!
//! The network layer sits behind the [`Transport`] trait; [`HttpTransport`]
//! is the `reqwest` implementation.

pub mod config;
pub mod error;
pub mod presign;
pub mod registry;
pub mod response;
pub mod transport;
pub mod types;
pub mod upload;
pub mod uploader;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use config::UploaderConfig;
pub use error::{ErrorReport, RequestStage, Stage, TransportError, UploadError};
pub use registry::{InFlightHandle, RequestRegistry, spawn_cancel_listener};
pub use transport::{HttpTransport, Transport, TransportFuture};
pub use types::{
    FileUploadTask, PresignDescriptor, ProgressCallback, ProgressEvent, RawResponse,
    UploadFile,
};
pub use upload::build_upload_url;
pub use uploader::Uploader;
