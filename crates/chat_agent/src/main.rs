use std::io::{self, BufRead, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chat_provider::CancelSignal;
use chat_store::{ConversationStore, SnapshotStore};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use chat_agent::app::{SessionController, TurnOutcome};
use chat_agent::commands::{parse_local_command, LocalCommand, HELP_TEXT};
use chat_agent::config::AgentConfig;
use chat_agent::providers::provider_from_env;
use chat_agent::tools::{is_affirmative, StdinConfirmer};
use chat_agent::versioning::GitVersionControl;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cwd = std::env::current_dir()?;
    let config = AgentConfig::from_environment(cwd);

    let provider = provider_from_env().map_err(io::Error::other)?;
    let recorder = GitVersionControl::open_or_init(&config.cwd).map_err(io::Error::other)?;
    let conversation = ConversationStore::new(config.chats_dir()).map_err(io::Error::other)?;
    let snapshots = SnapshotStore::new(config.store_root()).map_err(io::Error::other)?;

    let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&cancel))?;

    let mut controller = SessionController::new(
        config,
        provider,
        Box::new(recorder),
        Box::new(StdinConfirmer),
        conversation,
        snapshots,
        Arc::clone(&cancel),
    );

    let session_id = Uuid::new_v4().simple().to_string();
    let branch = format!("tandem-session-{}", &session_id[..8]);
    controller
        .start_session_branch(&branch)
        .map_err(io::Error::other)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    print!("Would you like to resume the previous chat? (y/n): ");
    stdout.flush()?;
    if let Some(answer) = lines.next().transpose()? {
        if is_affirmative(&answer) {
            match controller.load_latest() {
                Ok(true) => println!("Resumed the previous chat."),
                Ok(false) => println!("No previous chats found. Starting a new chat."),
                Err(error) => {
                    eprintln!("Failed to load the previous chat: {error}");
                    println!("Starting a new chat.");
                }
            }
        } else {
            println!("Starting a new chat.");
        }
    }

    let profile = controller.provider_profile();
    println!(
        "Entering interactive mode with {} ({}). Type 'exit' to end the session.",
        profile.model_id, profile.provider_id
    );

    loop {
        print!("\nUser: ");
        stdout.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        match parse_local_command(&input) {
            Some(LocalCommand::Exit) => {
                println!("Exiting interactive mode. Goodbye!");
                break;
            }
            Some(LocalCommand::Help) => {
                println!("{HELP_TEXT}");
            }
            Some(LocalCommand::Shell(command)) => match controller.run_user_command(&command) {
                Ok(result) => println!("{result}"),
                Err(error) => {
                    eprintln!("Command dispatch failed: {error}");
                    break;
                }
            },
            None => {
                print!("Assistant: ");
                stdout.flush()?;
                match controller.run_turn(&input, &mut stdout) {
                    Ok(TurnOutcome::Completed { .. }) => {}
                    Ok(TurnOutcome::Interrupted) => {
                        cancel.store(false, std::sync::atomic::Ordering::Release);
                        println!("\nInterrupted. The partial reply was discarded.");
                    }
                    Err(error) if error.is_fatal() => {
                        eprintln!("Session error: {error}");
                        break;
                    }
                    Err(error) => {
                        println!("\nAn error occurred: {error}");
                    }
                }
            }
        }
    }

    Ok(())
}
