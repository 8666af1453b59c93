//! CLI module for opencode-events.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version and usage display
//! - Server address resolution
//! - A logging event handler
//!
//! # Usage
//!
//! ```ignore
//! use opencode_events::cli::{parse_args, resolve_server_url, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Version => println!("{}", version_line()),
//!     CliCommand::Help => println!("{}", usage()),
//!     CliCommand::Run { url } => {
//!         let base = resolve_server_url(url, |name| std::env::var(name).ok())?;
//!         // ...
//!     }
//! }
//! ```

pub mod args;
pub mod logging;
pub mod version;

pub use args::{parse_args, CliCommand};
pub use logging::LoggingHandler;
pub use version::{usage, version_line, VERSION};

use crate::config::{BaseUrl, ConfigError, ENV_SERVER_URL};

/// Default server address when neither an argument nor `OPENCODE_URL` is given.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4096";

/// Pick the server address: the explicit argument, then `OPENCODE_URL`,
/// then [`DEFAULT_SERVER_URL`].
pub fn resolve_server_url<F>(arg: Option<String>, lookup: F) -> Result<BaseUrl, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = arg
        .or_else(|| lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    BaseUrl::parse(&raw)
}
