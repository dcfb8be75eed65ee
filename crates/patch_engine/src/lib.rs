//! Fuzzy, context-anchored patch application with all-or-nothing hunk
//! semantics.
//!
//! A diff is split into hunks on `@@` headers (`---`/`+++` file headers are
//! discarded, and the header line numbers are never trusted). Each hunk is
//! located in the target text by a nearest-first window search bounded by a
//! configurable match distance, so a hunk still applies after unrelated
//! edits have shifted line numbers. If any hunk fails to locate, the whole
//! operation aborts and the target file is left byte-identical to its
//! pre-call state.

mod engine;
mod error;
mod hunk;
mod matcher;

pub use engine::{normalized_diff, PatchEngine, PatchOutcome};
pub use error::PatchEngineError;
pub use hunk::{parse_diff, Hunk, HunkOp};
pub use matcher::{AppliedHunk, FuzzyPatch, DEFAULT_MATCH_DISTANCE};
