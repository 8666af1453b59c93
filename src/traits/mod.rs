//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - streaming HTTP GET for event subscriptions
//!
//! Event handling has its own seam, [`crate::dispatch::EventHandler`],
//! next to the dispatcher that drives it.

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError};
