//! Interactive assistant runtime: streaming turn loop, tool dispatch, and
//! versioned workspace mutation.
//!
//! ## Provider bootstrap
//!
//! `chat_agent` selects its provider from the environment:
//!
//! - `TANDEM_PROVIDER=mock` for deterministic local runs
//! - otherwise the Anthropic Messages transport, which requires
//!   `ANTHROPIC_API_KEY` (and honors `TANDEM_MODEL`)
//!
//! ## System prompt
//!
//! Each provider round-trip carries a system prompt assembled once per call
//! from the ambient [`config::AgentConfig`]: environment info, the tool
//! inventory generated from the dispatch registry, and the base prompt
//! text. Set `TANDEM_SYSTEM_PROMPT` to override the base prompt, or place a
//! `system_prompt.txt` in the working directory.
//!
//! Conversation memory contract: the session controller owns model-facing
//! history and replays it on every round-trip; a single logical turn spans
//! multiple round-trips when tool calls occur.

pub mod app;
pub mod commands;
pub mod config;
pub mod decoder;
pub mod providers;
pub mod tools;
pub mod versioning;
