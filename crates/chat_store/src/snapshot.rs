use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChatStoreError;
use crate::paths::{snapshot_file_name, snapshot_timestamp};

/// Immutable audit record of one successful file edit, independent of
/// version-control history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotRecord {
    pub file_path: String,
    pub original_content: String,
    pub applied_diff: String,
    pub updated_content: String,
    pub post_diff: String,
    pub lint_output: String,
    pub timestamp: String,
}

impl SnapshotRecord {
    /// Builds an unstamped record; the store assigns the timestamp when the
    /// record is persisted.
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        original_content: impl Into<String>,
        applied_diff: impl Into<String>,
        updated_content: impl Into<String>,
        post_diff: impl Into<String>,
        lint_output: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            original_content: original_content.into(),
            applied_diff: applied_diff.into(),
            updated_content: updated_content.into(),
            post_diff: post_diff.into(),
            lint_output: lint_output.into(),
            timestamp: String::new(),
        }
    }
}

/// Write-once store of per-edit snapshot files.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ChatStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| ChatStoreError::io("creating snapshot directory", &root, source))?;

        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stamps and persists one snapshot. Records are write-once: an
    /// existing file is never overwritten, so same-second saves get a
    /// numeric suffix.
    pub fn save(&self, mut record: SnapshotRecord) -> Result<PathBuf, ChatStoreError> {
        let timestamp = snapshot_timestamp()?;
        record.timestamp = timestamp.clone();

        let body = serde_json::to_string_pretty(&record)
            .map_err(|source| ChatStoreError::json_serialize(&self.root, source))?;

        let mut candidate = self.root.join(snapshot_file_name(&timestamp));
        let mut suffix = 2usize;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(body.as_bytes()).map_err(|source| {
                        ChatStoreError::io("writing snapshot file", &candidate, source)
                    })?;
                    return Ok(candidate);
                }
                Err(source) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate = self
                        .root
                        .join(snapshot_file_name(&format!("{timestamp}_{suffix}")));
                    suffix += 1;
                }
                Err(source) => {
                    return Err(ChatStoreError::io(
                        "creating snapshot file",
                        &candidate,
                        source,
                    ));
                }
            }
        }
    }

    /// Lists snapshot files, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, ChatStoreError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| ChatStoreError::io("listing snapshot directory", &self.root, source))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("snapshot_") && name.ends_with(".json"))
            })
            .collect();
        paths.sort();

        Ok(paths)
    }

    pub fn load(&self, path: &Path) -> Result<SnapshotRecord, ChatStoreError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ChatStoreError::io("reading snapshot file", path, source))?;
        serde_json::from_str(&body).map_err(|source| ChatStoreError::json_parse(path, source))
    }
}
