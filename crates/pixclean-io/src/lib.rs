//! pixclean-io: Filesystem, session state, events and worker thread.
//!
//! Wraps the pure core in `pixclean-pipeline` with everything that has
//! side effects:
//!
//! - [`codec`]: read and write image files
//! - [`ImageState`]: the original and working images
//! - [`EventBus`]: one-to-many notification of completed operations
//! - [`ImageSession`]: the operation surface, serialized by a lock
//! - [`ProcessingWorker`]: a background thread executing session
//!   requests in order

pub mod codec;
pub mod error;
pub mod events;
pub mod session;
pub mod state;
pub mod worker;

pub use error::{SessionError, WorkerError};
pub use events::{EventBus, EventKind, ImageEvent};
pub use session::ImageSession;
pub use state::ImageState;
pub use worker::{ProcessingWorker, Reply, ReplyReceiver, Request, WorkerState};
