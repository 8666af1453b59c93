//! Pull-based event channel over one SSE subscription.
//!
//! The network side pushes events as they arrive; the consumer pulls them
//! with [`EventChannel::next`]. Events that arrive while nobody is waiting
//! are buffered in arrival order. At most one reader may be suspended at a
//! time.
//!
//! ```text
//!  subscription task ──deliver/fail/finish──▶ ChannelProducer
//!                                                  │
//!                                          Shared { queue, waiter, state }
//!                                                  │
//!  event loop ◀────────────next()────────────  EventChannel
//! ```

mod subscription;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::BaseUrl;
use crate::sse::Event;
use crate::traits::{HttpClient, HttpError};

/// Lifecycle of one physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created, no connection attempted (detached channels start here)
    Idle,
    /// Request sent, waiting for the response headers
    Connecting,
    /// Response accepted, body streaming
    Open,
    /// `close()` in progress
    Closing,
    /// Ended, failed or closed; never reopens
    Closed,
}

impl ChannelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelState::Closing | ChannelState::Closed)
    }
}

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// `next()` was called while another `next()` is still suspended
    #[error("Another reader is already waiting on this channel")]
    ReaderBusy,
    /// The subscription failed at the transport level
    #[error("Event stream failed: {0}")]
    Transport(#[from] HttpError),
}

#[derive(Debug)]
struct Shared {
    state: ChannelState,
    state_tx: watch::Sender<ChannelState>,
    queue: VecDeque<Event>,
    waiter: Option<oneshot::Sender<Option<Event>>>,
    error: Option<HttpError>,
}

impl Shared {
    fn set_state(&mut self, state: ChannelState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    /// Mark the channel closed and release a suspended reader with end-of-stream.
    fn terminate(&mut self) {
        self.set_state(ChannelState::Closed);
        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.send(None);
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer half of a channel. The subscription task owns one; tests can
/// drive a detached channel through it directly.
#[derive(Debug, Clone)]
pub struct ChannelProducer {
    shared: Arc<Mutex<Shared>>,
}

impl ChannelProducer {
    /// Record that the server accepted the subscription.
    pub fn mark_open(&self) {
        let mut shared = lock(&self.shared);
        if !shared.state.is_terminal() {
            shared.set_state(ChannelState::Open);
        }
    }

    /// Hand an event to the consumer, or buffer it if no reader is waiting.
    ///
    /// Returns `false` once the channel is closed; the event is dropped.
    pub fn deliver(&self, event: Event) -> bool {
        let mut shared = lock(&self.shared);
        if shared.state.is_terminal() {
            return false;
        }

        let event = match shared.waiter.take() {
            Some(waiter) => match waiter.send(Some(event)) {
                Ok(()) => return true,
                // Reader gave up on its `next()`; keep the event for the next one
                Err(returned) => returned,
            },
            None => Some(event),
        };
        if let Some(event) = event {
            shared.queue.push_back(event);
        }
        true
    }

    /// End the channel with a transport error.
    pub fn fail(&self, error: HttpError) {
        let mut shared = lock(&self.shared);
        if shared.state.is_terminal() {
            return;
        }
        shared.error = Some(error);
        shared.terminate();
    }

    /// End the channel cleanly (server closed the body).
    pub fn finish(&self) {
        let mut shared = lock(&self.shared);
        if !shared.state.is_terminal() {
            shared.terminate();
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared).state.is_terminal()
    }
}

/// Consumer half of a channel.
///
/// Dropping the channel stops its subscription task.
#[derive(Debug)]
pub struct EventChannel {
    shared: Arc<Mutex<Shared>>,
    state_rx: watch::Receiver<ChannelState>,
    task: Option<JoinHandle<()>>,
}

impl EventChannel {
    /// Create a detached channel in the `Idle` state together with its producer.
    pub fn pair() -> (ChannelProducer, EventChannel) {
        let (state_tx, state_rx) = watch::channel(ChannelState::Idle);
        let shared = Arc::new(Mutex::new(Shared {
            state: ChannelState::Idle,
            state_tx,
            queue: VecDeque::new(),
            waiter: None,
            error: None,
        }));

        let producer = ChannelProducer {
            shared: Arc::clone(&shared),
        };
        let channel = EventChannel {
            shared,
            state_rx,
            task: None,
        };
        (producer, channel)
    }

    /// Subscribe to `{base}/event`.
    ///
    /// Returns immediately in the `Connecting` state. Connection failures do
    /// not surface here; they end the channel and are reported by
    /// [`error`](Self::error). Must be called within a Tokio runtime.
    pub fn open(client: Arc<dyn HttpClient>, base: &BaseUrl) -> EventChannel {
        let (producer, mut channel) = Self::pair();
        lock(&channel.shared).set_state(ChannelState::Connecting);

        let url = base.event_url();
        debug!(url = %url, "Opening event channel");
        channel.task = Some(tokio::spawn(subscription::run(client, url, producer)));
        channel
    }

    /// Pull the next event.
    ///
    /// Returns a buffered event immediately if there is one. Otherwise
    /// suspends until an event arrives or the channel ends. `Ok(None)` means
    /// end of stream; every call after that also returns `Ok(None)`.
    ///
    /// Only one call may be suspended at a time; a concurrent second call
    /// fails with [`ChannelError::ReaderBusy`]. Dropping the returned future
    /// releases the reader slot without losing events.
    pub async fn next(&self) -> Result<Option<Event>, ChannelError> {
        let rx = {
            let mut shared = lock(&self.shared);
            if let Some(event) = shared.queue.pop_front() {
                return Ok(Some(event));
            }
            if shared.state.is_terminal() {
                return Ok(None);
            }
            if shared.waiter.as_ref().is_some_and(|w| !w.is_closed()) {
                return Err(ChannelError::ReaderBusy);
            }
            let (tx, rx) = oneshot::channel();
            shared.waiter = Some(tx);
            rx
        };

        Ok(rx.await.unwrap_or(None))
    }

    /// Close the channel. Idempotent.
    ///
    /// Stops the subscription, discards buffered events and resolves a
    /// suspended [`next`](Self::next) with end of stream.
    pub fn close(&self) {
        {
            let mut shared = lock(&self.shared);
            if !shared.state.is_terminal() {
                shared.set_state(ChannelState::Closing);
            }
            shared.queue.clear();
        }

        if let Some(task) = &self.task {
            task.abort();
        }

        let mut shared = lock(&self.shared);
        if shared.state != ChannelState::Closed {
            debug!("Event channel closed");
        }
        shared.terminate();
    }

    pub fn state(&self) -> ChannelState {
        lock(&self.shared).state
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// The transport error that ended the channel, if it failed.
    pub fn error(&self) -> Option<HttpError> {
        lock(&self.shared).error.clone()
    }

    /// Number of events waiting to be pulled.
    pub fn buffered(&self) -> usize {
        lock(&self.shared).queue.len()
    }

    /// Returns true while a `next()` call is suspended.
    pub fn has_pending_reader(&self) -> bool {
        lock(&self.shared)
            .waiter
            .as_ref()
            .is_some_and(|w| !w.is_closed())
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
