use tracing::warn;

use crate::hunk::{Hunk, HunkOp};

/// Default positional drift allowed when locating a hunk's context.
/// Effectively unbounded for any realistic file.
pub const DEFAULT_MATCH_DISTANCE: usize = 1_000_000;

/// Minimum fraction of expected lines that must match a candidate window.
const MIN_MATCH_RATIO: f64 = 0.6;

/// One hunk compiled into a fuzzy-locatable transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyPatch {
    ops: Vec<(HunkOp, String)>,
    expected: Vec<String>,
    match_distance: usize,
}

/// Where a hunk landed and how the line count changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedHunk {
    pub start: usize,
    pub replaced: usize,
    pub inserted: usize,
}

impl AppliedHunk {
    /// First line index past this hunk's replacement, used as the next
    /// hunk's expected position.
    #[must_use]
    pub fn resume_at(&self) -> usize {
        self.start + self.inserted
    }
}

impl FuzzyPatch {
    #[must_use]
    pub fn from_hunk(hunk: &Hunk, match_distance: usize) -> Self {
        let expected = hunk
            .lines
            .iter()
            .filter(|(op, _)| matches!(op, HunkOp::Context | HunkOp::Remove))
            .map(|(_, text)| text.clone())
            .collect();

        Self {
            ops: hunk.lines.clone(),
            expected,
            match_distance,
        }
    }

    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.expected.len()
    }

    /// Applies this hunk against `lines`, searching for its expected block
    /// near `hint`. Returns `None` when no acceptable window exists within
    /// the match distance; `lines` is left untouched in that case.
    pub fn apply(&self, lines: &mut Vec<String>, hint: usize) -> Option<AppliedHunk> {
        let start = self.locate(lines, hint)?;
        let replaced = self.expected.len();

        let mut replacement = Vec::new();
        {
            let window = &lines[start..start + replaced];
            let mut cursor = 0usize;
            for (op, text) in &self.ops {
                match op {
                    HunkOp::Context => {
                        let actual = &window[cursor];
                        if actual != text {
                            warn!(expected = %text, actual = %actual, "context line drifted; keeping file text");
                        }
                        replacement.push(actual.clone());
                        cursor += 1;
                    }
                    HunkOp::Remove => {
                        let actual = &window[cursor];
                        if actual != text {
                            warn!(expected = %text, actual = %actual, "removing drifted line");
                        }
                        cursor += 1;
                    }
                    HunkOp::Add => replacement.push(text.clone()),
                }
            }
        }

        let inserted = replacement.len();
        lines.splice(start..start + replaced, replacement);

        Some(AppliedHunk {
            start,
            replaced,
            inserted,
        })
    }

    /// Nearest-first window search around `hint`, bounded by the match
    /// distance. Exact windows win immediately; otherwise the best-scoring
    /// acceptable window nearest to the hint is chosen.
    fn locate(&self, lines: &[String], hint: usize) -> Option<usize> {
        let needed = self.expected.len();
        if needed == 0 {
            return Some(hint.min(lines.len()));
        }
        if lines.len() < needed {
            return None;
        }

        let last_start = lines.len() - needed;
        let hint = hint.min(last_start);
        let mut best: Option<(usize, f64)> = None;

        for distance in 0..=last_start.max(hint) {
            if distance > self.match_distance {
                break;
            }

            let mut candidates = [None, None];
            if distance <= hint {
                candidates[0] = Some(hint - distance);
            }
            if distance > 0 && hint + distance <= last_start {
                candidates[1] = Some(hint + distance);
            }
            if candidates.iter().all(Option::is_none) && distance > hint {
                break;
            }

            for candidate in candidates.into_iter().flatten() {
                let (score, exact) = self.score_window(&lines[candidate..candidate + needed]);
                if exact {
                    return Some(candidate);
                }
                if score >= MIN_MATCH_RATIO
                    && best.map_or(true, |(_, best_score)| score > best_score)
                {
                    best = Some((candidate, score));
                }
            }
        }

        best.map(|(start, _)| start)
    }

    fn score_window(&self, window: &[String]) -> (f64, bool) {
        let mut matched = 0usize;
        let mut exact = true;
        for (expected, actual) in self.expected.iter().zip(window) {
            if expected == actual {
                matched += 1;
            } else if expected.trim() == actual.trim() {
                matched += 1;
                exact = false;
            } else {
                exact = false;
            }
        }

        (matched as f64 / self.expected.len() as f64, exact)
    }
}
