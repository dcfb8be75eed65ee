#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use chat_provider::{CancelSignal, ContentBlock, Message, MessageContent, StreamEvent};
use chat_store::{ConversationStore, SnapshotStore};
use tempfile::TempDir;

use chat_agent::app::SessionController;
use chat_agent::config::AgentConfig;
use chat_agent::providers::MockProvider;
use chat_agent::tools::Confirmer;
use chat_agent::versioning::GitVersionControl;

#[derive(Default)]
pub struct ConfirmerTrace {
    pub prompts: Vec<String>,
}

/// Confirmer double that records prompts and replays scripted answers
/// (defaulting to yes when the script runs out).
pub struct ScriptedConfirmer {
    answers: VecDeque<bool>,
    trace: Arc<Mutex<ConfirmerTrace>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: Vec<bool>) -> (Self, Arc<Mutex<ConfirmerTrace>>) {
        let trace = Arc::new(Mutex::new(ConfirmerTrace::default()));
        (
            Self {
                answers: answers.into(),
                trace: Arc::clone(&trace),
            },
            trace,
        )
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, description: &str) -> std::io::Result<bool> {
        lock_unpoisoned(&self.trace)
            .prompts
            .push(description.to_string());
        Ok(self.answers.pop_front().unwrap_or(true))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub controller: SessionController,
    pub confirmer_trace: Arc<Mutex<ConfirmerTrace>>,
    pub cancel: CancelSignal,
}

pub fn test_config(cwd: &Path) -> AgentConfig {
    AgentConfig {
        cwd: cwd.to_path_buf(),
        environment_info: "test-os".to_string(),
        shell: "/bin/bash".to_string(),
        base_prompt: "test prompt".to_string(),
        lint_command: None,
        match_distance: patch_engine::DEFAULT_MATCH_DISTANCE,
        command_timeout_secs: 30,
    }
}

/// Builds a controller over a temp workspace with a scripted provider and
/// confirmer.
pub fn harness(script: Vec<Vec<StreamEvent>>, answers: Vec<bool>) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let recorder = GitVersionControl::open_or_init(dir.path()).expect("init repo");
    let conversation = ConversationStore::new(config.chats_dir()).expect("conversation store");
    let snapshots = SnapshotStore::new(config.store_root()).expect("snapshot store");
    let (confirmer, confirmer_trace) = ScriptedConfirmer::new(answers);
    let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

    let controller = SessionController::new(
        config,
        Box::new(MockProvider::new(script)),
        Box::new(recorder),
        Box::new(confirmer),
        conversation,
        snapshots,
        Arc::clone(&cancel),
    );

    Harness {
        dir,
        controller,
        confirmer_trace,
        cancel,
    }
}

/// Counts commits reachable from HEAD in the workspace repository.
pub fn count_commits(path: &Path) -> usize {
    let repo = git2::Repository::open(path).expect("open repo");
    let mut walk = repo.revwalk().expect("revwalk");
    walk.push_head().expect("push head");
    walk.count()
}

/// Extracts the tool-result text from a history message.
pub fn tool_result_content(message: &Message) -> &str {
    let MessageContent::Blocks(blocks) = &message.content else {
        panic!("expected a block message, got {message:?}");
    };

    for block in blocks {
        if let ContentBlock::ToolResult { content, .. } = block {
            return content;
        }
    }

    panic!("no tool result block in {message:?}");
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
