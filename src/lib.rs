//! opencode-events - a resilient consumer of an opencode server's event stream
//!
//! [`event_loop::EventLoop`] keeps a server-sent events subscription alive,
//! reconnecting after a fixed delay whenever it ends, and routes every event
//! to an [`dispatch::EventHandler`].

pub mod adapters;
pub mod cache;
pub mod channel;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod event_loop;
pub mod sse;
pub mod traits;
