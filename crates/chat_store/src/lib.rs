mod conversation;
mod error;
mod paths;
mod schema;
mod snapshot;

pub use conversation::ConversationStore;
pub use error::ChatStoreError;
pub use paths::{chat_file_name, chats_dir, snapshot_file_name, store_root};
pub use schema::{ChatFile, WireContent, WireContentBlock, WireMessage, WireRole};
pub use snapshot::{SnapshotRecord, SnapshotStore};
