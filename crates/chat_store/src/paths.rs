use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::ChatStoreError;

/// Directory under the working directory holding all persisted state.
pub const STORE_DIR_NAME: &str = ".tandem";

/// Subdirectory holding saved conversations.
pub const CHATS_DIR_NAME: &str = "chats";

pub fn store_root(cwd: &Path) -> PathBuf {
    cwd.join(STORE_DIR_NAME)
}

pub fn chats_dir(cwd: &Path) -> PathBuf {
    store_root(cwd).join(CHATS_DIR_NAME)
}

#[must_use]
pub fn chat_file_name(timestamp: &str) -> String {
    format!("chat_{timestamp}.json")
}

#[must_use]
pub fn snapshot_file_name(timestamp: &str) -> String {
    format!("snapshot_{timestamp}.json")
}

/// Compact timestamp used in chat filenames.
pub(crate) fn chat_timestamp() -> Result<String, ChatStoreError> {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc()
        .format(&format)
        .map_err(ChatStoreError::ClockFormat)
}

/// Second-resolution timestamp used in snapshot filenames and records.
/// Colons are avoided so the value is filesystem-safe.
pub(crate) fn snapshot_timestamp() -> Result<String, ChatStoreError> {
    let format = format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]");
    OffsetDateTime::now_utc()
        .format(&format)
        .map_err(ChatStoreError::ClockFormat)
}
