use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchEngineError {
    #[error("diff text contained no hunks")]
    EmptyDiff,

    #[error("failed to apply hunk(s) {}; the file has not been modified", format_hunk_list(.failed))]
    HunksFailed { failed: Vec<usize> },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchEngineError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns the 1-based indices of failed hunks when this error reports
    /// an application failure.
    #[must_use]
    pub fn failed_hunks(&self) -> Option<&[usize]> {
        match self {
            Self::HunksFailed { failed } => Some(failed),
            _ => None,
        }
    }
}

fn format_hunk_list(values: &[usize]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
