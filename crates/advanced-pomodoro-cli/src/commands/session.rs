//! Interactive session.
//!
//! Reads one command per line from stdin and prints every session event to
//! stdout as a JSON line:
//!
//! ```text
//! start | pause | finish | stop | note [PATH] | status | quit
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use advanced_pomodoro_core::error::Result;
use advanced_pomodoro_core::{
    Command, Config, CoreError, Event, FrontmatterOverrides, MarkdownLog, SessionRuntime,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use super::config_path;

#[derive(Args)]
pub struct SessionArgs {
    /// Note (relative to the vault) to work on
    #[arg(long)]
    note: Option<String>,
    /// Notes folder; defaults to `vault_dir` from the config, then the current directory
    #[arg(long)]
    vault: Option<PathBuf>,
    /// Also print a line for every countdown tick
    #[arg(long)]
    ticks: bool,
}

pub fn run(args: SessionArgs, custom: Option<&Path>) -> Result<()> {
    let config = Config::load_from(&config_path(custom)?)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(args, config))
}

async fn run_session(args: SessionArgs, config: Config) -> Result<()> {
    let vault = match args.vault.or_else(|| config.vault_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    info!(vault = %vault.display(), "session starting");

    let (mut session, commands) = SessionRuntime::with_interval_ticker(
        config.session(),
        Duration::from_millis(config.timer.tick_period_ms),
        FrontmatterOverrides::new(&vault),
        MarkdownLog::new(&vault, config.logging.clone()),
    );
    let ticks = args.ticks;
    session.controller_mut().subscribe(move |event: &Event| {
        if ticks || !matches!(event, Event::TimerTicked { .. }) {
            print_event(event);
        }
    });

    if let Some(note) = args.note {
        commands
            .send(Command::SetContext(Some(note)))
            .map_err(|e| CoreError::Custom(format!("session closed: {e}")))?;
    }

    // The reader owns the only strong sender; the loop ends with it.
    let reader = tokio::spawn(read_commands(commands));
    session.run().await;
    reader
        .await
        .map_err(|e| CoreError::Custom(format!("stdin reader failed: {e}")))??;
    Ok(())
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
}

/// Forward stdin lines as commands until `quit` or end of input.
async fn read_commands(commands: UnboundedSender<Command>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let quit = command == Command::Shutdown;
        if commands.send(command).is_err() || quit {
            break;
        }
    }
    Ok(())
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word {
        "start" => Command::Start,
        "pause" | "resume" => Command::TogglePause,
        "finish" => Command::ForceFinish,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "note" if rest.is_empty() => Command::SetContext(None),
        "note" => Command::SetContext(Some(rest.to_string())),
        "quit" | "exit" => Command::Shutdown,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(parse_command("start"), Ok(Command::Start));
        assert_eq!(parse_command("  pause "), Ok(Command::TogglePause));
        assert_eq!(parse_command("resume"), Ok(Command::TogglePause));
        assert_eq!(parse_command("finish"), Ok(Command::ForceFinish));
        assert_eq!(parse_command("quit"), Ok(Command::Shutdown));
    }

    #[test]
    fn note_takes_the_rest_of_the_line() {
        assert_eq!(
            parse_command("note Projects/My Thesis.md"),
            Ok(Command::SetContext(Some("Projects/My Thesis.md".into())))
        );
        assert_eq!(parse_command("note"), Ok(Command::SetContext(None)));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_command("snooze 5").is_err());
    }
}
