use std::io::Write;
use std::sync::Arc;

use chat_provider::{CancelSignal, ChatProvider, Message, ProviderError, ToolUse, TurnRequest};
use chat_store::{ChatStoreError, ConversationStore, SnapshotStore};
use patch_engine::PatchEngine;
use thiserror::Error;
use tracing::info;

use crate::config::AgentConfig;
use crate::decoder::{DecodeEffect, StreamDecoder};
use crate::tools::{Confirmer, DispatchCtx, DispatchError, ToolRegistry};
use crate::versioning::{VersionRecorder, VersioningError};

/// Session controller position in the turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Streaming,
    Dispatching,
    Done,
}

/// How one logical turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { assistant_text: String },
    /// The in-flight round-trip was aborted by an interrupt; the partial
    /// assistant message was not finalized.
    Interrupted,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] ChatStoreError),

    #[error(transparent)]
    Versioning(#[from] VersioningError),
}

impl SessionError {
    /// Provider failures are terminal for the turn but not for the
    /// session; storage and VCS failures terminate the session loop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Provider(_))
    }
}

enum TurnSignal {
    End,
    Tool(ToolUse),
}

/// The turn loop: sends conversation state to the provider, drives the
/// stream decoder, dispatches tools at turn boundaries, and resumes the
/// provider call until an end-of-turn with no pending tool call.
///
/// Strictly single-threaded and cooperative: the only suspension points
/// are the provider's blocking read and the confirmation prompt inside
/// tool dispatch.
pub struct SessionController {
    config: AgentConfig,
    provider: Box<dyn ChatProvider>,
    registry: ToolRegistry,
    recorder: Box<dyn VersionRecorder>,
    confirmer: Box<dyn Confirmer>,
    conversation: ConversationStore,
    snapshots: SnapshotStore,
    engine: PatchEngine,
    cancel: CancelSignal,
    session_branch: Option<String>,
    history: Vec<Message>,
    base_prompt: String,
    pending_preamble: String,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        config: AgentConfig,
        provider: Box<dyn ChatProvider>,
        recorder: Box<dyn VersionRecorder>,
        confirmer: Box<dyn Confirmer>,
        conversation: ConversationStore,
        snapshots: SnapshotStore,
        cancel: CancelSignal,
    ) -> Self {
        let engine = PatchEngine::with_match_distance(config.match_distance);
        let base_prompt = config.base_prompt.clone();

        Self {
            config,
            provider,
            registry: ToolRegistry::builtin(),
            recorder,
            confirmer,
            conversation,
            snapshots,
            engine,
            cancel,
            session_branch: None,
            history: Vec::new(),
            base_prompt,
            pending_preamble: String::new(),
            state: SessionState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    #[must_use]
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    #[must_use]
    pub fn provider_profile(&self) -> chat_provider::ProviderProfile {
        self.provider.profile()
    }

    /// Creates and checks out the branch isolating this session's commits.
    pub fn start_session_branch(&mut self, name: &str) -> Result<(), VersioningError> {
        self.recorder.create_branch(name, None)?;
        self.session_branch = Some(name.to_string());
        info!(branch = name, "session branch created");
        Ok(())
    }

    /// Reloads the latest saved chat into this session, when one exists.
    pub fn load_latest(&mut self) -> Result<bool, SessionError> {
        match self.conversation.load_latest()? {
            Some((system_prompt, history)) => {
                self.base_prompt = system_prompt;
                self.history = history;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs one logical turn. A turn may span multiple provider
    /// round-trips, one per tool call; it ends when the provider reports a
    /// natural end of turn.
    pub fn run_turn(
        &mut self,
        user_input: &str,
        out: &mut dyn Write,
    ) -> Result<TurnOutcome, SessionError> {
        let user_text = self.compose_user_text(user_input);
        if !user_text.is_empty() {
            self.history.push(Message::user_text(user_text));
        }

        loop {
            self.state = SessionState::Streaming;

            let request = TurnRequest {
                system: self
                    .config
                    .system_prompt(&self.base_prompt, &self.registry.tools_description()),
                messages: self.history.clone(),
                tools: self.registry.definitions(),
            };

            let mut decoder = StreamDecoder::new();
            let mut signal: Option<TurnSignal> = None;
            let stream_result =
                self.provider
                    .stream_turn(request, Arc::clone(&self.cancel), &mut |event| {
                        for effect in decoder.on_event(event) {
                            match effect {
                                DecodeEffect::TextChunk(text) => {
                                    let _ = write!(out, "{text}");
                                    let _ = out.flush();
                                }
                                DecodeEffect::TurnFinished => signal = Some(TurnSignal::End),
                                DecodeEffect::ToolUseReady(tool_use) => {
                                    signal = Some(TurnSignal::Tool(tool_use));
                                }
                            }
                        }
                    });

            match stream_result {
                Ok(()) => {}
                Err(ProviderError::Cancelled) => {
                    self.state = SessionState::Idle;
                    return Ok(TurnOutcome::Interrupted);
                }
                Err(error) => {
                    self.state = SessionState::Idle;
                    return Err(error.into());
                }
            }

            match signal {
                None | Some(TurnSignal::End) => {
                    let assistant_text = decoder.take_assistant_text();
                    self.history
                        .push(Message::assistant_text(assistant_text.clone()));
                    self.conversation.save(&self.base_prompt, &self.history)?;
                    self.state = SessionState::Done;
                    let _ = writeln!(out);
                    return Ok(TurnOutcome::Completed { assistant_text });
                }
                Some(TurnSignal::Tool(tool_use)) => {
                    self.state = SessionState::Dispatching;
                    let partial_text = decoder.take_assistant_text();
                    let result_text = self.dispatch(&tool_use)?;
                    let _ = writeln!(out, "\nTool '{}' result: {}", tool_use.name, result_text);

                    self.history
                        .push(Message::assistant_tool_call(partial_text, tool_use.clone()));
                    self.history
                        .push(Message::tool_result(tool_use.id.clone(), result_text));
                    // Resume the provider call with the result injected,
                    // exactly as if a fresh turn had begun.
                }
            }
        }
    }

    /// Runs a `!`-prefixed user shortcut and folds the command plus its
    /// result into the next user message so the model sees what happened.
    pub fn run_user_command(&mut self, command: &str) -> Result<String, SessionError> {
        let mut ctx = DispatchCtx {
            config: &self.config,
            recorder: self.recorder.as_mut(),
            confirmer: self.confirmer.as_mut(),
            snapshots: &self.snapshots,
            engine: &self.engine,
            session_branch: self.session_branch.as_deref(),
        };
        let result = self.registry.execute_user_command(command, &mut ctx)?;

        self.pending_preamble
            .push_str(&format!("<command>{command}</command>\n{result}\n"));

        Ok(result)
    }

    fn dispatch(&mut self, tool_use: &ToolUse) -> Result<String, DispatchError> {
        let mut ctx = DispatchCtx {
            config: &self.config,
            recorder: self.recorder.as_mut(),
            confirmer: self.confirmer.as_mut(),
            snapshots: &self.snapshots,
            engine: &self.engine,
            session_branch: self.session_branch.as_deref(),
        };
        self.registry.dispatch(tool_use, &mut ctx)
    }

    fn compose_user_text(&mut self, user_input: &str) -> String {
        let preamble = std::mem::take(&mut self.pending_preamble);
        if preamble.is_empty() {
            user_input.to_string()
        } else if user_input.is_empty() {
            preamble
        } else {
            format!("{preamble}{user_input}")
        }
    }
}
