//! Reconnecting event loop.
//!
//! Keeps one [`EventChannel`] alive for as long as the loop is running,
//! dispatching every event to the configured handler. When a channel ends
//! the loop waits a fixed delay and opens a fresh one; there is no retry
//! limit. Only [`EventLoop::stop`] ends the loop.
//!
//! ```text
//!   Stopped ──start──▶ Connecting ──open──▶ Streaming
//!                          ▲                    │ end / error
//!                          └────── Backoff ◀────┘
//!   (any state) ──stop──▶ Stopped
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::channel::{ChannelState, EventChannel};
use crate::config::{BaseUrl, EventLoopConfig};
use crate::dispatch::{dispatch, EventHandler};
use crate::traits::{HttpClient, HttpError};

/// Why the loop is waiting before reconnecting
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffReason {
    /// The server closed the stream
    StreamEnded,
    /// The connection failed or dropped
    TransportError(HttpError),
}

/// Observable state of an [`EventLoop`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Stopped,
    Connecting,
    Streaming,
    Backoff {
        reason: BackoffReason,
        delay: Duration,
    },
}

impl LoopState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, LoopState::Streaming)
    }
}

/// How one channel's lifetime ended
enum Outcome {
    Stopped,
    Ended,
    Failed(HttpError),
}

/// A reconnecting consumer of one server's event stream.
///
/// The running flag lives on the value, so independent loops (one per
/// server, or one per test) coexist.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use opencode_events::{adapters::ReqwestHttpClient, config::{BaseUrl, EventLoopConfig}};
/// use opencode_events::{dispatch::NoopHandler, event_loop::EventLoop};
///
/// let events = EventLoop::new(
///     Arc::new(ReqwestHttpClient::new()),
///     Arc::new(NoopHandler),
///     EventLoopConfig::default(),
/// );
/// events.start(BaseUrl::parse("http://localhost:4096")?);
/// // ...
/// events.stop();
/// ```
pub struct EventLoop {
    client: Arc<dyn HttpClient>,
    handler: Arc<dyn EventHandler>,
    config: EventLoopConfig,
    running: Arc<AtomicBool>,
    /// Bumped on every start and stop; a run only publishes state while its
    /// generation is current
    generation: Arc<AtomicU64>,
    cancel: Mutex<Option<watch::Sender<bool>>>,
    state_tx: Arc<watch::Sender<LoopState>>,
}

impl EventLoop {
    pub fn new(
        client: Arc<dyn HttpClient>,
        handler: Arc<dyn EventHandler>,
        config: EventLoopConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Stopped);
        Self {
            client,
            handler,
            config,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            cancel: Mutex::new(None),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Start consuming events from `address`.
    ///
    /// Returns `false` and does nothing if the loop is already running.
    /// Must be called within a Tokio runtime.
    pub fn start(&self, address: BaseUrl) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Event loop already running, ignoring start");
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel_tx);

        let run = Run {
            client: Arc::clone(&self.client),
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
            address,
            running: Arc::clone(&self.running),
            cancel: cancel_rx,
            generation,
            current_generation: Arc::clone(&self.generation),
            state_tx: Arc::clone(&self.state_tx),
        };
        tokio::spawn(run.execute());
        true
    }

    /// Stop the loop. Idempotent and non-blocking.
    ///
    /// A suspended read or backoff is interrupted; no channel is opened and
    /// no event is dispatched after this returns, apart from a dispatch
    /// already executing on the loop task.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            let _ = cancel.send(true);
        }
        if was_running {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state_tx.send_replace(LoopState::Stopped);
            info!("Event loop stopping");
        }
    }

    /// Whether the loop is running (between `start` and `stop`).
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoopState {
        self.state_tx.borrow().clone()
    }

    /// Receiver that observes loop state transitions, e.g. to drive a
    /// connectivity indicator.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One start-to-stop run of the loop, executed on its own task
struct Run {
    client: Arc<dyn HttpClient>,
    handler: Arc<dyn EventHandler>,
    config: EventLoopConfig,
    address: BaseUrl,
    running: Arc<AtomicBool>,
    cancel: watch::Receiver<bool>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    state_tx: Arc<watch::Sender<LoopState>>,
}

impl Run {
    fn is_wanted(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !*self.cancel.borrow()
    }

    fn set_state(&self, state: LoopState) {
        let generation = self.generation;
        let current = &self.current_generation;
        self.state_tx.send_if_modified(|slot| {
            if current.load(Ordering::SeqCst) != generation || *slot == state {
                return false;
            }
            *slot = state;
            true
        });
    }

    async fn execute(mut self) {
        info!(address = %self.address, "Event loop started");
        let mut attempt: u64 = 0;

        while self.is_wanted() {
            attempt += 1;
            self.set_state(LoopState::Connecting);
            debug!(attempt, "Opening event channel");

            let channel = EventChannel::open(Arc::clone(&self.client), &self.address);
            let outcome = self.pump(&channel).await;
            channel.close();

            let (reason, delay) = match outcome {
                Outcome::Stopped => break,
                Outcome::Ended => {
                    info!(
                        attempt,
                        delay_ms = self.config.end_delay.as_millis() as u64,
                        "Event stream ended, reconnecting"
                    );
                    (BackoffReason::StreamEnded, self.config.end_delay)
                }
                Outcome::Failed(error) => {
                    warn!(
                        attempt,
                        error = %error,
                        delay_ms = self.config.error_delay.as_millis() as u64,
                        "Event stream failed, reconnecting"
                    );
                    (BackoffReason::TransportError(error), self.config.error_delay)
                }
            };

            if !self.is_wanted() {
                break;
            }
            self.set_state(LoopState::Backoff { reason, delay });
            if !self.backoff(delay).await {
                break;
            }
        }

        self.set_state(LoopState::Stopped);
        info!(address = %self.address, attempts = attempt, "Event loop stopped");
    }

    /// Pull and dispatch events until the channel ends or the run is cancelled.
    ///
    /// The pending read survives wakeups from the other branches: dropping it
    /// after the producer filled its slot would lose that event.
    async fn pump(&mut self, channel: &EventChannel) -> Outcome {
        let mut channel_state = channel.watch_state();
        let mut streaming = false;
        let read = channel.next();
        tokio::pin!(read);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => return Outcome::Stopped,
                _ = opened(&mut channel_state), if !streaming => {
                    streaming = true;
                    self.set_state(LoopState::Streaming);
                }
                next = &mut read => match next {
                    Ok(Some(event)) => {
                        if !self.is_wanted() {
                            return Outcome::Stopped;
                        }
                        if !streaming {
                            streaming = true;
                            self.set_state(LoopState::Streaming);
                        }
                        dispatch(&event, self.handler.as_ref());
                        read.set(channel.next());
                    }
                    Ok(None) => {
                        return match channel.error() {
                            Some(error) => Outcome::Failed(error),
                            None => Outcome::Ended,
                        };
                    }
                    Err(e) => {
                        // Only this task reads the channel, so a busy reader
                        // slot means the channel is unusable.
                        return Outcome::Failed(HttpError::Other(e.to_string()));
                    }
                },
            }
        }
    }

    /// Wait `delay`. Returns `false` if the run was cancelled meanwhile.
    async fn backoff(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => false,
            _ = tokio::time::sleep(delay) => self.is_wanted(),
        }
    }
}

/// Resolves once the run's cancellation flag is set (or its sender is gone).
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|cancelled| *cancelled).await;
}

/// Resolves once the channel reports its response accepted.
async fn opened(state: &mut watch::Receiver<ChannelState>) {
    let _ = state.wait_for(|s| *s == ChannelState::Open).await;
}
