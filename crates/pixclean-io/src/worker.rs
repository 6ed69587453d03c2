//! Background thread that runs session requests off the caller's thread.
//!
//! [`ProcessingWorker`] owns a dedicated thread and a request mailbox.
//! While running, the thread blocks on the mailbox and executes each
//! [`Request`] against the shared [`ImageSession`] in arrival order,
//! sending exactly one reply per request. Results are also published on
//! the session's event bus, exactly as when the session is called
//! directly.
//!
//! The lifecycle is `Stopped -> Running -> Stopped`. [`stop`] closes the
//! mailbox, lets the request in flight finish and joins the thread.
//! Requests still queued behind it are discarded without running; their
//! reply receivers see a disconnect. It may be called from any thread,
//! and dropping the worker stops it.
//!
//! The session stays usable without a running worker: the worker only
//! adds an execution context, it does not gate access.
//!
//! [`stop`]: ProcessingWorker::stop

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use pixclean_pipeline::{
    Dimensions, EditParameters, FilterBackend, FilterKind, FilterParameters, ImageprocBackend,
    RgbImage,
};
use tracing::{debug, info, warn};

use crate::error::{SessionError, WorkerError};
use crate::session::ImageSession;

/// Name given to the worker thread.
pub const THREAD_NAME: &str = "pixclean-worker";

/// A unit of work for the worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// [`ImageSession::load`].
    Load(PathBuf),
    /// [`ImageSession::apply_edit`].
    Edit(EditParameters),
    /// [`ImageSession::apply_denoise`].
    Denoise {
        /// Filter to run.
        kind: FilterKind,
        /// Parameters for `kind`.
        parameters: FilterParameters,
    },
    /// [`ImageSession::save_current`].
    Save(PathBuf),
}

/// Successful outcome of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The image was loaded; its size.
    Loaded(Dimensions),
    /// An edit or denoise result in RGB order.
    Image(RgbImage),
    /// The working image was written to this path.
    Saved(PathBuf),
}

/// Receiver for the reply to one submitted request.
pub type ReplyReceiver = Receiver<Result<Reply, SessionError>>;

/// Lifecycle state of a [`ProcessingWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No thread is running; requests are refused.
    Stopped,
    /// The thread is waiting for or executing requests.
    Running,
}

struct Job {
    request: Request,
    reply: Sender<Result<Reply, SessionError>>,
}

struct Running {
    jobs: Sender<Job>,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns a background thread that executes [`Request`]s in order.
pub struct ProcessingWorker<B = ImageprocBackend> {
    session: Arc<ImageSession<B>>,
    running: Mutex<Option<Running>>,
}

impl<B> ProcessingWorker<B>
where
    B: FilterBackend + Send + Sync + 'static,
{
    /// A stopped worker that will drive `session`.
    pub const fn new(session: Arc<ImageSession<B>>) -> Self {
        Self {
            session,
            running: Mutex::new(None),
        }
    }

    /// The session requests are executed against.
    pub const fn session(&self) -> &Arc<ImageSession<B>> {
        &self.session
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        if self.lock_running().is_some() {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::AlreadyRunning`] if the worker was already
    /// started. Returns [`WorkerError::Spawn`] if the thread could not be
    /// created.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }

        let (jobs, mailbox) = mpsc::channel::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let session = Arc::clone(&self.session);
        let flag = Arc::clone(&cancelled);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || worker_loop(&session, &mailbox, &flag))
            .map_err(WorkerError::Spawn)?;

        info!(thread = THREAD_NAME, "worker started");
        *running = Some(Running {
            jobs,
            cancelled,
            handle,
        });
        Ok(())
    }

    /// Close the mailbox, discard queued requests, wait for the one in
    /// flight and join the thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::NotRunning`] if the worker is stopped.
    /// Returns [`WorkerError::Disconnected`] if the thread panicked.
    pub fn stop(&self) -> Result<(), WorkerError> {
        shutdown(&self.running)
    }

    /// Queue `request` and return the receiver its reply will arrive on.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::NotRunning`] if the worker is stopped.
    /// Returns [`WorkerError::Disconnected`] if the thread has exited.
    pub fn submit(&self, request: Request) -> Result<ReplyReceiver, WorkerError> {
        let running = self.lock_running();
        let running = running.as_ref().ok_or(WorkerError::NotRunning)?;

        let (reply, receiver) = mpsc::channel();
        running
            .jobs
            .send(Job { request, reply })
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(receiver)
    }

    /// Submit `request` and block until its reply arrives.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`submit`](Self::submit), plus
    /// [`WorkerError::Request`] if the session rejected the request.
    pub fn call(&self, request: Request) -> Result<Reply, WorkerError> {
        let receiver = self.submit(request)?;
        let outcome = receiver.recv().map_err(|_| WorkerError::Disconnected)?;
        Ok(outcome?)
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> Drop for ProcessingWorker<B> {
    fn drop(&mut self) {
        if let Err(e) = shutdown(&self.running)
            && !matches!(e, WorkerError::NotRunning)
        {
            warn!(error = %e, "worker did not shut down cleanly");
        }
    }
}

/// Take the running state out of the lock before joining, so other
/// threads calling `state` or `submit` are not blocked on the join.
/// Cancellation is flagged under the lock: once `state` reports
/// `Stopped`, no further queued request will start.
fn shutdown(running: &Mutex<Option<Running>>) -> Result<(), WorkerError> {
    let taken = {
        let mut guard = running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = guard.as_ref() {
            running.cancelled.store(true, Ordering::SeqCst);
        }
        guard.take()
    };
    let Running { jobs, handle, .. } = taken.ok_or(WorkerError::NotRunning)?;

    drop(jobs);
    handle.join().map_err(|_| WorkerError::Disconnected)?;
    info!(thread = THREAD_NAME, "worker stopped");
    Ok(())
}

fn worker_loop<B: FilterBackend>(
    session: &ImageSession<B>,
    mailbox: &Receiver<Job>,
    cancelled: &AtomicBool,
) {
    while let Ok(Job { request, reply }) = mailbox.recv() {
        if cancelled.load(Ordering::SeqCst) {
            debug!(?request, "worker stopping; request discarded");
            continue;
        }
        debug!(?request, "worker handling request");
        let outcome = handle_request(session, request);
        if reply.send(outcome).is_err() {
            debug!("requester dropped its reply receiver");
        }
    }
}

fn handle_request<B: FilterBackend>(
    session: &ImageSession<B>,
    request: Request,
) -> Result<Reply, SessionError> {
    match request {
        Request::Load(path) => session.load(path).map(Reply::Loaded),
        Request::Edit(params) => session.apply_edit(&params).map(Reply::Image),
        Request::Denoise { kind, parameters } => {
            session.apply_denoise(kind, parameters).map(Reply::Image)
        }
        Request::Save(path) => {
            session.save_current(&path)?;
            Ok(Reply::Saved(path))
        }
    }
}
