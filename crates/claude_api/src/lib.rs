pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, ClaudeApiClient};
pub use config::ClaudeApiConfig;
pub use error::ClaudeApiError;
pub use events::{ClaudeStreamEvent, ContentDelta, StartedBlock, TurnStopReason};
pub use payload::{MessagesRequest, WireBlock, WireContent, WireMessage, WireTool};
pub use sse::SseStreamParser;
