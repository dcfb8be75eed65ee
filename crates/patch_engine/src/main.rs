use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use patch_engine::{PatchEngine, PatchEngineError};

/// Applies a unified diff read from a file (or stdin) to one target path.
///
/// Usage: `apply_diff <target-path> [diff-file]`
fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("apply_diff: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        bail!("usage: apply_diff <target-path> [diff-file]");
    };
    let target = PathBuf::from(target);

    let diff_text = match args.next() {
        Some(diff_path) => std::fs::read_to_string(&diff_path)
            .with_context(|| format!("reading diff file {diff_path}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading diff from stdin")?;
            buffer
        }
    };

    let engine = PatchEngine::new();
    match engine.apply_to_file(&target, &diff_text) {
        Ok(outcome) => {
            println!("Applied diff to {}", target.display());
            print!("{}", outcome.normalized_diff);
            Ok(())
        }
        Err(error @ PatchEngineError::HunksFailed { .. }) => bail!("{error}"),
        Err(error) => Err(error.into()),
    }
}
