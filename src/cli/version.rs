//! Version and usage text.

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_line() -> String {
    format!("opencode-events {}", VERSION)
}

pub fn usage() -> String {
    format!(
        "{}
Follow the event stream of an opencode server.

USAGE:
    opencode-events [URL]

ARGS:
    <URL>    Server address, e.g. http://localhost:4096 (default: $OPENCODE_URL)

OPTIONS:
    -h, --help       Print this help
    -V, --version    Print version

ENVIRONMENT:
    OPENCODE_URL                     Server address when URL is omitted
    OPENCODE_EVENT_END_DELAY_MS      Reconnect delay after the stream ends (default 3000)
    OPENCODE_EVENT_ERROR_DELAY_MS    Reconnect delay after an error (default 5000)
    OPENCODE_EVENT_CONNECT_TIMEOUT_MS  Limit on establishing each connection (default none)
    RUST_LOG                         Log filter (default opencode_events=info)",
        version_line()
    )
}
