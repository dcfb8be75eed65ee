use std::fs;
use std::path::{Path, PathBuf};

use chat_provider::Message;

use crate::error::ChatStoreError;
use crate::paths::{chat_file_name, chat_timestamp};
use crate::schema::{ChatFile, WireMessage};

/// Persists conversations as `{system_prompt, history}` JSON files.
///
/// Once a chat has been loaded or saved, subsequent saves rewrite the same
/// file rather than creating a new one.
pub struct ConversationStore {
    chat_dir: PathBuf,
    loaded_path: Option<PathBuf>,
}

impl ConversationStore {
    pub fn new(chat_dir: impl Into<PathBuf>) -> Result<Self, ChatStoreError> {
        let chat_dir = chat_dir.into();
        fs::create_dir_all(&chat_dir)
            .map_err(|source| ChatStoreError::io("creating chat directory", &chat_dir, source))?;

        Ok(Self {
            chat_dir,
            loaded_path: None,
        })
    }

    #[must_use]
    pub fn chat_dir(&self) -> &Path {
        &self.chat_dir
    }

    #[must_use]
    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded_path.as_deref()
    }

    /// Saves the conversation, reusing the loaded path when one exists.
    pub fn save(
        &mut self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<PathBuf, ChatStoreError> {
        let path = match &self.loaded_path {
            Some(path) => path.clone(),
            None => self.chat_dir.join(chat_file_name(&chat_timestamp()?)),
        };

        let file = ChatFile {
            system_prompt: system_prompt.to_string(),
            history: history.iter().map(WireMessage::from).collect(),
        };
        let body = serde_json::to_string(&file)
            .map_err(|source| ChatStoreError::json_serialize(&path, source))?;

        fs::write(&path, body)
            .map_err(|source| ChatStoreError::io("writing chat file", &path, source))?;
        self.loaded_path = Some(path.clone());

        Ok(path)
    }

    /// Loads the most recently saved chat, when one exists.
    pub fn load_latest(&mut self) -> Result<Option<(String, Vec<Message>)>, ChatStoreError> {
        let names = self.list()?;
        let Some(name) = names.first() else {
            return Ok(None);
        };

        self.load_file(&self.chat_dir.join(name)).map(Some)
    }

    /// Loads a chat by its 1-based position in the listing.
    pub fn load_by_number(&mut self, number: usize) -> Result<(String, Vec<Message>), ChatStoreError> {
        let names = self.list()?;
        if names.is_empty() {
            return Err(ChatStoreError::NoChatsFound {
                root: self.chat_dir.clone(),
            });
        }
        if number == 0 || number > names.len() {
            return Err(ChatStoreError::InvalidChatNumber {
                number,
                available: names.len(),
            });
        }

        self.load_file(&self.chat_dir.join(&names[number - 1]))
    }

    /// Lists saved chat file names, newest first.
    pub fn list(&self) -> Result<Vec<String>, ChatStoreError> {
        let entries = fs::read_dir(&self.chat_dir)
            .map_err(|source| ChatStoreError::io("listing chat directory", &self.chat_dir, source))?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("chat_") && name.ends_with(".json"))
            .collect();
        names.sort_by(|a, b| b.cmp(a));

        Ok(names)
    }

    fn load_file(&mut self, path: &Path) -> Result<(String, Vec<Message>), ChatStoreError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ChatStoreError::io("reading chat file", path, source))?;
        let file: ChatFile = serde_json::from_str(&body)
            .map_err(|source| ChatStoreError::json_parse(path, source))?;

        self.loaded_path = Some(path.to_path_buf());
        let history = file.history.into_iter().map(Message::from).collect();

        Ok((file.system_prompt, history))
    }
}
