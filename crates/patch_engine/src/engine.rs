use std::fs;
use std::path::Path;

use similar::TextDiff;
use tracing::warn;

use crate::error::PatchEngineError;
use crate::hunk::parse_diff;
use crate::matcher::{FuzzyPatch, DEFAULT_MATCH_DISTANCE};

/// Result of one successful patch application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub updated_content: String,
    pub normalized_diff: String,
}

/// Applies hunk-structured diffs with fuzzy context matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEngine {
    match_distance: usize,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            match_distance: DEFAULT_MATCH_DISTANCE,
        }
    }

    #[must_use]
    pub fn with_match_distance(match_distance: usize) -> Self {
        Self { match_distance }
    }

    #[must_use]
    pub fn match_distance(&self) -> usize {
        self.match_distance
    }

    /// Applies `diff_text` against `original`, returning the updated text
    /// and the normalized diff between the two.
    ///
    /// Hunks apply in order against the evolving text; a failed hunk leaves
    /// the text unchanged and evaluation continues so the error names every
    /// failed index. Any failure aborts the whole operation.
    pub fn apply_to_content(
        &self,
        original: &str,
        diff_text: &str,
    ) -> Result<PatchOutcome, PatchEngineError> {
        let updated_content = self.apply_hunks(original, diff_text)?;
        let normalized_diff = normalized_diff(original, &updated_content, "original", "updated");

        Ok(PatchOutcome {
            updated_content,
            normalized_diff,
        })
    }

    fn apply_hunks(&self, original: &str, diff_text: &str) -> Result<String, PatchEngineError> {
        let hunks = parse_diff(diff_text);
        if hunks.is_empty() {
            return Err(PatchEngineError::EmptyDiff);
        }

        let mut lines = split_lines(original);
        let mut failed = Vec::new();
        let mut hint = 0usize;

        for (index, hunk) in hunks.iter().enumerate() {
            let patch = FuzzyPatch::from_hunk(hunk, self.match_distance);
            match patch.apply(&mut lines, hint) {
                Some(applied) => hint = applied.resume_at(),
                None => {
                    warn!(hunk = index + 1, "failed to locate hunk context");
                    failed.push(index + 1);
                }
            }
        }

        if !failed.is_empty() {
            return Err(PatchEngineError::HunksFailed { failed });
        }

        Ok(join_lines(&lines, original))
    }

    /// Applies `diff_text` to the file at `path`, creating it empty when it
    /// does not exist. On any hunk failure the file's bytes are unchanged
    /// relative to its pre-call state; there is no partial write.
    pub fn apply_to_file(
        &self,
        path: &Path,
        diff_text: &str,
    ) -> Result<PatchOutcome, PatchEngineError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|source| {
                        PatchEngineError::io("creating parent directories", parent, source)
                    })?;
                }
            }
            fs::write(path, "")
                .map_err(|source| PatchEngineError::io("creating empty target", path, source))?;
        }

        let original = fs::read_to_string(path)
            .map_err(|source| PatchEngineError::io("reading target", path, source))?;

        let updated_content = self.apply_hunks(&original, diff_text)?;
        fs::write(path, &updated_content)
            .map_err(|source| PatchEngineError::io("writing target", path, source))?;

        let label = path.display().to_string();
        let normalized_diff = normalized_diff(&original, &updated_content, &label, &label);

        Ok(PatchOutcome {
            updated_content,
            normalized_diff,
        })
    }
}

/// Unified diff between two texts, used for snapshots and lint feedback.
#[must_use]
pub fn normalized_diff(original: &str, updated: &str, from_label: &str, to_label: &str) -> String {
    TextDiff::from_lines(original, updated)
        .unified_diff()
        .context_radius(3)
        .header(from_label, to_label)
        .to_string()
}

fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    if content.ends_with('\n') {
        lines.pop();
    }
    lines
}

fn join_lines(lines: &[String], original: &str) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let mut out = lines.join("\n");
    if original.is_empty() || original.ends_with('\n') {
        out.push('\n');
    }
    out
}
