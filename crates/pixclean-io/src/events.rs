//! Result notifications for loaded, edited and denoised images.
//!
//! [`EventBus`] is a one-to-many publisher over `std::sync::mpsc`
//! channels. Each [`subscribe`](EventBus::subscribe) call returns its own
//! receiver; every published [`ImageEvent`] is cloned to each live
//! subscriber. Subscribers whose receiver has been dropped are pruned
//! on the next publish. With no subscribers an event is simply dropped.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use pixclean_pipeline::RgbImage;

/// Which operation produced an [`ImageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An image was decoded and installed as the session's original.
    Loaded,
    /// An edit pass produced a new working image.
    Edited,
    /// A denoise pass produced a new image.
    Denoised,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::Edited => "edited",
            Self::Denoised => "denoised",
        })
    }
}

/// A completed operation and the image it produced, in RGB order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEvent {
    /// What happened.
    pub kind: EventKind,
    /// The resulting image.
    pub image: RgbImage,
}

/// Fan-out publisher of [`ImageEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ImageEvent>>>,
}

impl EventBus {
    /// An event bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events published from now on are
    /// delivered to the returned receiver in publication order.
    pub fn subscribe(&self) -> Receiver<ImageEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber and return how many
    /// received it.
    pub fn publish(&self, event: &ImageEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Number of subscribers registered and not yet found disconnected.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
