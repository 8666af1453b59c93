//! SSE (Server-Sent Events) stream decoding
//!
//! Decodes the opencode `/event` stream. The server sends one JSON event per
//! frame, without `event:` lines:
//! - `data: <json>` - data payload line (may repeat, joined with `\n`)
//! - Empty line - signals end of frame
//! - Lines starting with `:` - comments / keep-alives (ignored)
//!
//! # Module structure
//! - `events` - Typed event definitions (Event enum and payload structs)
//! - `parser` - Line classification, frame accumulation, JSON event parsing
//! - `decoder` - Byte chunk to event decoding across chunk boundaries

mod decoder;
mod events;
mod parser;

pub use decoder::{SseDecoder, MAX_LINE_BYTES};
pub use events::{
    Event, FileEdited, FileWatcherUpdated, IdeInstalled, InstallationUpdated,
    LspClientDiagnostics, MessagePartRemoved, MessagePartUpdated, MessageRemoved,
    MessageUpdated, PermissionReplied, PermissionUpdated, SessionError, SessionInfo, SessionRef,
    Todo, TodoUpdated, KNOWN_EVENT_KINDS,
};
pub use parser::{parse_event, parse_sse_line, SseFrame, SseLine, SseParseError, SseParser};
