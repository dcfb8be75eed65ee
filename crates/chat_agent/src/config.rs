use std::fs;
use std::path::{Path, PathBuf};

use patch_engine::DEFAULT_MATCH_DISTANCE;

pub const SYSTEM_PROMPT_ENV_VAR: &str = "TANDEM_SYSTEM_PROMPT";
pub const SYSTEM_PROMPT_FILE_NAME: &str = "system_prompt.txt";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful pair-programming assistant. Use the available tools to \
     inspect and modify the workspace, explain what you are doing, and fail \
     explicitly when a request cannot be satisfied.";

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Ambient process state captured once at startup and threaded through the
/// session controller and tool dispatch. Nothing reads the process
/// environment after construction.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub cwd: PathBuf,
    pub environment_info: String,
    pub shell: String,
    pub base_prompt: String,
    /// Shell command for the lint/format pass; `None` disables it.
    pub lint_command: Option<String>,
    pub match_distance: usize,
    pub command_timeout_secs: u64,
}

impl AgentConfig {
    /// Captures the ambient environment for `cwd`.
    #[must_use]
    pub fn from_environment(cwd: PathBuf) -> Self {
        let base_prompt = load_base_prompt(&cwd);
        let lint_command = detect_lint_command(&cwd);

        Self {
            environment_info: detect_environment_info(),
            shell: detect_shell(),
            base_prompt,
            lint_command,
            match_distance: DEFAULT_MATCH_DISTANCE,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            cwd,
        }
    }

    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        chat_store::store_root(&self.cwd)
    }

    #[must_use]
    pub fn chats_dir(&self) -> PathBuf {
        chat_store::chats_dir(&self.cwd)
    }

    /// Assembles the per-call system prompt from the ambient environment,
    /// the tool inventory, and the session's base prompt.
    #[must_use]
    pub fn system_prompt(&self, base_prompt: &str, tools_description: &str) -> String {
        format!(
            "<environment_info>\n{}\nSHELL={}\nCWD={}\n</environment_info>\n\n\
             <available_tools>\n{}\n</available_tools>\n\n{}",
            self.environment_info,
            self.shell,
            self.cwd.display(),
            tools_description,
            base_prompt,
        )
    }
}

fn detect_environment_info() -> String {
    match fs::read_to_string("/etc/os-release") {
        Ok(contents) if !contents.trim().is_empty() => contents.trim().to_string(),
        _ => format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
    }
}

fn detect_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "/bin/bash".to_string())
}

fn load_base_prompt(cwd: &Path) -> String {
    if let Ok(value) = std::env::var(SYSTEM_PROMPT_ENV_VAR) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    if let Ok(contents) = fs::read_to_string(cwd.join(SYSTEM_PROMPT_FILE_NAME)) {
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn detect_lint_command(cwd: &Path) -> Option<String> {
    if cwd.join("Cargo.toml").exists() {
        return Some("cargo fmt".to_string());
    }
    if cwd.join("pyproject.toml").exists() || cwd.join("setup.py").exists() {
        return Some("ruff check --fix . && ruff format .".to_string());
    }
    None
}
