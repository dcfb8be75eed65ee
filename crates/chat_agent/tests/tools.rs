mod support;

use chat_provider::ToolUse;
use chat_store::SnapshotStore;
use patch_engine::PatchEngine;
use serde_json::json;
use tempfile::TempDir;

use chat_agent::config::AgentConfig;
use chat_agent::tools::{DispatchCtx, ToolRegistry};
use chat_agent::versioning::GitVersionControl;

use support::{count_commits, lock_unpoisoned, test_config, ScriptedConfirmer};

struct Fixture {
    dir: TempDir,
    config: AgentConfig,
    recorder: GitVersionControl,
    confirmer: ScriptedConfirmer,
    confirmer_trace: std::sync::Arc<std::sync::Mutex<support::ConfirmerTrace>>,
    snapshots: SnapshotStore,
    engine: PatchEngine,
}

impl Fixture {
    fn new(answers: Vec<bool>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let recorder = GitVersionControl::open_or_init(dir.path()).expect("init repo");
        let snapshots = SnapshotStore::new(config.store_root()).expect("snapshot store");
        let (confirmer, confirmer_trace) = ScriptedConfirmer::new(answers);

        Self {
            dir,
            config,
            recorder,
            confirmer,
            confirmer_trace,
            snapshots,
            engine: PatchEngine::new(),
        }
    }

    fn ctx(&mut self) -> DispatchCtx<'_> {
        DispatchCtx {
            config: &self.config,
            recorder: &mut self.recorder,
            confirmer: &mut self.confirmer,
            snapshots: &self.snapshots,
            engine: &self.engine,
            session_branch: None,
        }
    }
}

fn apply_diff_use(diff: &str, target_path: &str, purpose: &str) -> ToolUse {
    ToolUse {
        id: "toolu_1".to_string(),
        name: "apply_diff".to_string(),
        input: json!({
            "diff": diff,
            "target_path": target_path,
            "purpose": purpose,
        }),
    }
}

#[test]
fn a_clean_apply_diff_commits_and_snapshots_once() {
    let mut fixture = Fixture::new(Vec::new());
    let registry = ToolRegistry::builtin();
    let before = count_commits(fixture.dir.path());

    let tool_use = apply_diff_use("@@\n+hello\n", "notes.txt", "create notes");
    let result = registry
        .dispatch(&tool_use, &mut fixture.ctx())
        .expect("dispatch succeeds");

    assert!(result.contains("userskipped=\"false\""), "{result}");
    assert!(result.contains("commit_hash=\""), "{result}");
    assert!(result.contains("<updated_file>"), "{result}");
    assert!(result.contains("<lint_result>"), "{result}");

    assert_eq!(
        std::fs::read_to_string(fixture.dir.path().join("notes.txt")).expect("read target"),
        "hello\n"
    );
    assert_eq!(count_commits(fixture.dir.path()), before + 1);

    let snapshots = fixture.snapshots.list().expect("list snapshots");
    assert_eq!(snapshots.len(), 1);
    let record = fixture.snapshots.load(&snapshots[0]).expect("load snapshot");
    assert_eq!(record.applied_diff, "@@\n+hello\n");
    assert_eq!(record.updated_content, "hello\n");
    assert!(record.original_content.is_empty());
    assert!(!record.post_diff.is_empty());
}

#[test]
fn a_failed_apply_diff_mutates_nothing() {
    let mut fixture = Fixture::new(Vec::new());
    let registry = ToolRegistry::builtin();

    let target = fixture.dir.path().join("stable.txt");
    std::fs::write(&target, "alpha\nbeta\n").expect("seed file");
    let before = count_commits(fixture.dir.path());

    let diff = "@@\n missing one\n-missing two\n+replacement\n missing three\n";
    let tool_use = apply_diff_use(diff, "stable.txt", "doomed edit");
    let result = registry
        .dispatch(&tool_use, &mut fixture.ctx())
        .expect("dispatch returns result text");

    assert!(result.contains("Error applying diff"), "{result}");
    assert!(result.contains("hunk(s) 1"), "{result}");
    assert!(!result.contains("commit_hash"), "{result}");

    assert_eq!(
        std::fs::read_to_string(&target).expect("read target"),
        "alpha\nbeta\n"
    );
    assert_eq!(count_commits(fixture.dir.path()), before, "no commit");
    assert!(
        fixture.snapshots.list().expect("list").is_empty(),
        "no snapshot"
    );
}

#[test]
fn a_declined_diff_is_skipped_before_any_side_effect() {
    let mut fixture = Fixture::new(vec![false]);
    let registry = ToolRegistry::builtin();
    let before = count_commits(fixture.dir.path());

    let tool_use = apply_diff_use("@@\n+secret\n", "blocked.txt", "blocked");
    let result = registry
        .dispatch(&tool_use, &mut fixture.ctx())
        .expect("dispatch succeeds");

    assert!(result.contains("userskipped=\"true\""), "{result}");
    assert!(!fixture.dir.path().join("blocked.txt").exists());
    assert_eq!(count_commits(fixture.dir.path()), before);

    let prompts = lock_unpoisoned(&fixture.confirmer_trace).prompts.clone();
    assert_eq!(prompts, vec!["@@\n+secret\n".to_string()]);
}

#[test]
fn an_unknown_tool_becomes_result_text() {
    let mut fixture = Fixture::new(Vec::new());
    let registry = ToolRegistry::builtin();

    let tool_use = ToolUse {
        id: "toolu_9".to_string(),
        name: "browse_web".to_string(),
        input: json!({}),
    };
    let result = registry
        .dispatch(&tool_use, &mut fixture.ctx())
        .expect("unknown tools are not errors");
    assert_eq!(result, "Unknown tool: browse_web");
}

#[test]
fn a_malformed_invocation_reports_the_missing_field() {
    let mut fixture = Fixture::new(Vec::new());
    let registry = ToolRegistry::builtin();

    let tool_use = ToolUse {
        id: "toolu_2".to_string(),
        name: "execute_command".to_string(),
        input: json!({}),
    };
    let result = registry
        .dispatch(&tool_use, &mut fixture.ctx())
        .expect("missing fields are result text");

    assert!(result.contains("missing required field 'command'"), "{result}");
    assert!(
        lock_unpoisoned(&fixture.confirmer_trace).prompts.is_empty(),
        "nothing to confirm for a malformed invocation"
    );
}

#[test]
fn a_user_initiated_command_bypasses_the_gate() {
    let mut fixture = Fixture::new(Vec::new());
    let registry = ToolRegistry::builtin();

    let result = registry
        .execute_user_command("echo direct", &mut fixture.ctx())
        .expect("user command runs");

    assert!(result.contains("returncode=\"0\""), "{result}");
    assert!(result.contains("direct"), "{result}");
    assert!(
        lock_unpoisoned(&fixture.confirmer_trace).prompts.is_empty(),
        "user-initiated commands skip confirmation"
    );
}
