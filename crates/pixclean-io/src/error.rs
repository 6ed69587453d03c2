//! Error types for session operations and the worker thread.

use std::path::PathBuf;

use pixclean_pipeline::PipelineError;

/// Errors returned by [`ImageSession`](crate::ImageSession) operations.
///
/// Every variant is recoverable. A failed operation leaves the session
/// state as it was and publishes no event.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs an image but none has been loaded yet.
    #[error("no image loaded")]
    NoImageLoaded,

    /// Reading or decoding an image file failed.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O or codec message.
        reason: String,
    },

    /// Encoding or writing an image file failed, including the case of
    /// an empty buffer with nothing to save.
    #[error("failed to encode {}: {reason}", path.display())]
    Encode {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O or codec message.
        reason: String,
    },

    /// Parameter validation or filtering rejected the request.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Errors from [`ProcessingWorker`](crate::ProcessingWorker) lifecycle
/// and request routing.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// [`start`](crate::ProcessingWorker::start) was called twice.
    #[error("worker is already running")]
    AlreadyRunning,

    /// A request was submitted, or a stop requested, while stopped.
    #[error("worker is not running")]
    NotRunning,

    /// The OS refused to create the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread went away before replying.
    #[error("worker thread exited before replying")]
    Disconnected,

    /// The worker ran the request and the session rejected it.
    #[error(transparent)]
    Request(#[from] SessionError),
}
