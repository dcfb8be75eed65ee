use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use chat_provider::{ToolDefinition, ToolUse};
use chat_store::{ChatStoreError, SnapshotRecord, SnapshotStore};
use patch_engine::PatchEngine;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use wait_timeout::ChildExt;

use crate::config::AgentConfig;
use crate::versioning::{VersionRecorder, VersioningError};

pub const EXECUTE_COMMAND_TOOL: &str = "execute_command";
pub const APPLY_DIFF_TOOL: &str = "apply_diff";

const MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Result text returned when the user declines a confirmation.
pub const SKIPPED_RESULT: &str = "<result userskipped=\"true\">\nUser skipped execution.\n</result>";

/// Hard failure during dispatch. Everything else is converted to result
/// text and fed back to the model.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Versioning(#[from] VersioningError),

    #[error(transparent)]
    Store(#[from] ChatStoreError),

    #[error("failed to read confirmation input: {0}")]
    Confirmation(#[source] io::Error),
}

/// Blocking yes/no gate. Blank or `y`/`yes` (case-insensitive) proceeds.
pub trait Confirmer {
    fn confirm(&mut self, description: &str) -> io::Result<bool>;
}

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, description: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "\nExecute:\n'{description}'? (y/n): ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

/// One tool invocation after the confirmation gate has been decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub input: Value,
    pub user_confirmed: bool,
}

/// Collaborators a handler needs while executing one invocation.
pub struct DispatchCtx<'a> {
    pub config: &'a AgentConfig,
    pub recorder: &'a mut dyn VersionRecorder,
    pub confirmer: &'a mut dyn Confirmer,
    pub snapshots: &'a SnapshotStore,
    pub engine: &'a PatchEngine,
    pub session_branch: Option<&'a str>,
}

pub trait ToolHandler {
    fn name(&self) -> &'static str;
    fn definition(&self) -> ToolDefinition;
    fn handle(
        &self,
        invocation: &ToolInvocation,
        ctx: &mut DispatchCtx<'_>,
    ) -> Result<String, DispatchError>;
}

/// Closed name-keyed mapping from tool name to handler. Extensible by
/// registration, never by runtime attribute lookup.
pub struct ToolRegistry {
    handlers: BTreeMap<&'static str, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Registry seeded with the two built-in tools.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            handlers: BTreeMap::new(),
        };
        registry.register(Box::new(ExecuteCommandTool));
        registry.register(Box::new(ApplyDiffTool));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Tool schemas advertised to the provider.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers
            .values()
            .map(|handler| handler.definition())
            .collect()
    }

    /// Human-readable inventory embedded in the system prompt.
    #[must_use]
    pub fn tools_description(&self) -> String {
        self.definitions()
            .iter()
            .map(|definition| {
                format!(
                    "- {}: {}\n  Input: {}",
                    definition.name,
                    definition.description.as_deref().unwrap_or(""),
                    serde_json::to_string_pretty(&definition.input_schema)
                        .unwrap_or_else(|_| "{}".to_string()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Dispatches one model-requested invocation. Unknown names become
    /// result text so the model can react.
    pub fn dispatch(
        &self,
        tool_use: &ToolUse,
        ctx: &mut DispatchCtx<'_>,
    ) -> Result<String, DispatchError> {
        match self.handlers.get(tool_use.name.as_str()) {
            Some(handler) => handler.handle(
                &ToolInvocation {
                    name: tool_use.name.clone(),
                    input: tool_use.input.clone(),
                    user_confirmed: false,
                },
                ctx,
            ),
            None => {
                warn!(tool = %tool_use.name, "model requested an unregistered tool");
                Ok(format!("Unknown tool: {}", tool_use.name))
            }
        }
    }

    /// Runs a user-initiated `!` shell shortcut: no model involvement, no
    /// confirmation prompt.
    pub fn execute_user_command(
        &self,
        command: &str,
        ctx: &mut DispatchCtx<'_>,
    ) -> Result<String, DispatchError> {
        let Some(handler) = self.handlers.get(EXECUTE_COMMAND_TOOL) else {
            return Ok(format!("Unknown tool: {EXECUTE_COMMAND_TOOL}"));
        };

        handler.handle(
            &ToolInvocation {
                name: EXECUTE_COMMAND_TOOL.to_string(),
                input: json!({ "command": command }),
                user_confirmed: true,
            },
            ctx,
        )
    }
}

struct ExecuteCommandTool;

impl ToolHandler for ExecuteCommandTool {
    fn name(&self) -> &'static str {
        EXECUTE_COMMAND_TOOL
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: EXECUTE_COMMAND_TOOL.to_string(),
            description: Some("Execute a shell command".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute",
                    },
                    "purpose": {
                        "type": "string",
                        "description": "The purpose of the command",
                    },
                },
                "required": ["command", "purpose"],
            }),
        }
    }

    fn handle(
        &self,
        invocation: &ToolInvocation,
        ctx: &mut DispatchCtx<'_>,
    ) -> Result<String, DispatchError> {
        let Some(command) = invocation.input.get("command").and_then(Value::as_str) else {
            return Ok(failure_result("missing required field 'command'"));
        };
        let purpose = invocation
            .input
            .get("purpose")
            .and_then(Value::as_str)
            .unwrap_or("");

        if !invocation.user_confirmed {
            let proceed = ctx
                .confirmer
                .confirm(command)
                .map_err(DispatchError::Confirmation)?;
            if !proceed {
                info!("user skipped execution");
                return Ok(SKIPPED_RESULT.to_string());
            }
        }

        let output = match run_shell(command, &ctx.config.cwd, ctx.config.command_timeout_secs) {
            Ok(output) => output,
            Err(error) => return Ok(failure_result(&format!("Error: {error}"))),
        };

        // Committed regardless of exit status: a failed attempt is still
        // captured state.
        let commit_message = if purpose.is_empty() {
            format!("Executed command: {command}")
        } else {
            purpose.to_string()
        };
        let commit_hash = ctx
            .recorder
            .create_new_version(&commit_message, ctx.session_branch)?;
        let lint_result = run_lint(ctx.config);

        Ok(format!(
            "<result userskipped=\"false\" returncode=\"{}\" commit_hash=\"{}\">\n<logs>\n{}\n{}\n</logs>\n{}</result>",
            output.returncode_label(),
            commit_hash,
            output.stdout,
            output.stderr,
            lint_result,
        ))
    }
}

struct ApplyDiffTool;

impl ToolHandler for ApplyDiffTool {
    fn name(&self) -> &'static str {
        APPLY_DIFF_TOOL
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: APPLY_DIFF_TOOL.to_string(),
            description: Some("Apply a diff to the codebase".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "diff": {
                        "type": "string",
                        "description": "The diff to apply to the codebase",
                    },
                    "target_path": {
                        "type": "string",
                        "description": "The target path for the file.",
                    },
                    "purpose": {
                        "type": "string",
                        "description": "The purpose of the diff application",
                    },
                },
                "required": ["diff", "target_path", "purpose"],
            }),
        }
    }

    fn handle(
        &self,
        invocation: &ToolInvocation,
        ctx: &mut DispatchCtx<'_>,
    ) -> Result<String, DispatchError> {
        let Some(diff) = invocation.input.get("diff").and_then(Value::as_str) else {
            return Ok(failure_result("missing required field 'diff'"));
        };
        let Some(target_path) = invocation.input.get("target_path").and_then(Value::as_str)
        else {
            return Ok(failure_result(
                "Target path is required for applying diff",
            ));
        };
        let purpose = invocation
            .input
            .get("purpose")
            .and_then(Value::as_str)
            .unwrap_or("");

        if !invocation.user_confirmed {
            let proceed = ctx
                .confirmer
                .confirm(diff)
                .map_err(DispatchError::Confirmation)?;
            if !proceed {
                info!("user skipped execution");
                return Ok(SKIPPED_RESULT.to_string());
            }
        }

        let target = resolve_target(&ctx.config.cwd, target_path);
        let original_content = std::fs::read_to_string(&target).unwrap_or_default();

        let outcome = match ctx.engine.apply_to_file(&target, diff) {
            Ok(outcome) => outcome,
            Err(error) => {
                // Failed patches commit nothing, lint nothing, snapshot
                // nothing; the file is untouched.
                return Ok(failure_result(&format!("Error applying diff: {error}")));
            }
        };

        let commit_message = if purpose.is_empty() {
            format!("Applied diff to {target_path}")
        } else {
            purpose.to_string()
        };
        let commit_hash = ctx
            .recorder
            .create_new_version(&commit_message, ctx.session_branch)?;
        let lint_result = run_lint(ctx.config);

        ctx.snapshots.save(SnapshotRecord::new(
            target.display().to_string(),
            original_content,
            diff,
            &outcome.updated_content,
            &outcome.normalized_diff,
            &lint_result,
        ))?;

        Ok(format!(
            "<result userskipped=\"false\" commit_hash=\"{}\"><updated_file>\n{}\n</updated_file>\n{}</result>",
            commit_hash, outcome.updated_content, lint_result,
        ))
    }
}

fn failure_result(message: &str) -> String {
    format!("<result userskipped=\"false\">\n{message}\n</result>")
}

fn resolve_target(cwd: &Path, target_path: &str) -> PathBuf {
    let path = Path::new(target_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Lint/format pass output, always wrapped in a `lint_result` section.
fn run_lint(config: &AgentConfig) -> String {
    let Some(command) = config.lint_command.as_deref() else {
        return "<lint_result>\n\n</lint_result>".to_string();
    };

    match run_shell(command, &config.cwd, config.command_timeout_secs) {
        Ok(output) => format!(
            "<lint_result>\n{}\n{}\n</lint_result>",
            output.stdout, output.stderr
        ),
        Err(error) => format!("<lint_result>\n{error}\n</lint_result>"),
    }
}

struct ShellOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
    timed_out: bool,
}

impl ShellOutput {
    fn returncode_label(&self) -> String {
        if self.timed_out {
            return "timeout".to_string();
        }
        match self.code {
            Some(code) => code.to_string(),
            None => "terminated_by_signal".to_string(),
        }
    }
}

fn run_shell(command: &str, cwd: &Path, timeout_secs: u64) -> Result<ShellOutput, String> {
    let mut child = Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| format!("failed to launch bash command: {error}"))?;

    let wait_result = child.wait_timeout(Duration::from_secs(timeout_secs));
    let (timed_out, status) = match wait_result {
        Ok(Some(status)) => (false, Some(status)),
        Ok(None) => {
            let _ = child.kill();
            let status = child.wait().ok();
            (true, status)
        }
        Err(error) => {
            let _ = child.kill();
            return Err(format!("failed waiting for bash command: {error}"));
        }
    };

    let stdout = read_pipe(child.stdout.take());
    let stderr = read_pipe(child.stderr.take());

    Ok(ShellOutput {
        stdout: truncate_to_byte_limit(stdout, MAX_OUTPUT_BYTES),
        stderr: truncate_to_byte_limit(stderr, MAX_OUTPUT_BYTES),
        code: status.and_then(|status| status.code()),
        timed_out,
    })
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };

    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::{is_affirmative, truncate_to_byte_limit, ToolRegistry};

    #[test]
    fn blank_and_yes_answers_are_affirmative() {
        assert!(is_affirmative(""));
        assert!(is_affirmative("\n"));
        assert!(is_affirmative("y"));
        assert!(is_affirmative("YES"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("maybe"));
    }

    #[test]
    fn builtin_registry_advertises_both_tools() {
        let registry = ToolRegistry::builtin();
        let definitions = registry.definitions();
        let names: Vec<&str> = definitions
            .iter()
            .map(|definition| definition.name.as_str())
            .collect();
        assert_eq!(names, vec!["apply_diff", "execute_command"]);

        let description = registry.tools_description();
        assert!(description.contains("- execute_command: Execute a shell command"));
        assert!(description.contains("\"required\""));
    }

    #[test]
    fn truncation_appends_a_marker_on_overflow() {
        let content = "x".repeat(32);
        assert_eq!(truncate_to_byte_limit(content.clone(), 64), content);

        let truncated = truncate_to_byte_limit(content, 16);
        assert!(truncated.starts_with(&"x".repeat(16)));
        assert!(truncated.ends_with("[truncated]"));
    }
}
