//! condense - compact stored conversations through a context-management backend

mod compact;
mod config;
mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use condense_orchestrator::{BackendSummarizer, ContextManager, has_compaction_marker};
use condense_types::Message;
use tracing_subscriber::EnvFilter;

use crate::compact::CompactReport;
use crate::session::SessionStore;

/// condense - conversation compaction
#[derive(Parser, Debug)]
#[command(name = "condense")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend URL (overrides config and CONDENSE_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a session's history and replace it with the compacted form
    Compact {
        /// Session ID
        session_id: String,

        /// Compact as a user request; the continuation is shown but not submitted
        #[arg(long)]
        manual: bool,
    },
    /// Print a session's messages and ancestor history
    Show {
        /// Session ID
        session_id: String,

        /// Also print ancestor messages
        #[arg(long)]
        ancestors: bool,
    },
    /// List saved sessions
    Sessions,
    /// Create a session from a JSON array of messages
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Initialize config file
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("condense_cli=debug,condense_orchestrator=debug,condense_types=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = SessionStore::open_default();

    match args.command {
        Command::InitConfig => init_config(),
        Command::Sessions => list_sessions(&store),
        Command::Show {
            session_id,
            ancestors,
        } => show_session(&store, &session_id, ancestors),
        Command::Import { file } => import_session(&store, &file),
        Command::Compact { session_id, manual } => {
            let cfg = config::Config::load();
            let client = cfg.backend_client(args.backend_url).context(
                "No backend URL configured. Set CONDENSE_BACKEND_URL or run `condense init-config`",
            )?;

            let manager = ContextManager::new(
                Arc::new(BackendSummarizer::new(client)),
                cfg.compaction_config(),
            );
            compact(&store, &manager, &session_id, manual).await
        }
    }
}

fn init_config() -> anyhow::Result<()> {
    match config::Config::init() {
        Ok(path) => {
            println!("Config file created at: {}", path.display());
            println!("\nExample config:\n{}", config::example_config());
        }
        Err(e) => {
            eprintln!("Error creating config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn list_sessions(store: &SessionStore) -> anyhow::Result<()> {
    let sessions = store.list().context("Error listing sessions")?;
    if sessions.is_empty() {
        println!("No saved sessions found.");
        println!("Sessions are stored in: {}", store.dir().display());
        return Ok(());
    }

    println!("Saved sessions:\n");
    println!("{:<38} {:<20} {:<8} Ancestors", "ID", "Created", "Msgs");
    println!("{}", "-".repeat(78));
    for s in sessions {
        println!(
            "{:<38} {:<20} {:<8} {}",
            s.id,
            s.created_at_display(),
            s.message_count,
            s.ancestor_count
        );
    }
    println!("\nCompact with: condense compact <session-id>");
    Ok(())
}

fn import_session(store: &SessionStore, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let messages: Vec<Message> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of messages", file.display()))?;

    let count = messages.len();
    let id = store.create(messages, Some(file.display().to_string()))?;
    println!("Imported {} message(s) into session {}", count, id);
    Ok(())
}

fn show_session(store: &SessionStore, id: &str, with_ancestors: bool) -> anyhow::Result<()> {
    let session = store.load(id)?;

    if with_ancestors && !session.ancestors.is_empty() {
        println!("Ancestors ({}):", session.ancestors.len());
        for (i, message) in session.ancestors.iter().enumerate() {
            println!("{}", format_message(i, message));
        }
        println!();
    }

    println!("Messages ({}):", session.messages.len());
    for (i, message) in session.messages.iter().enumerate() {
        println!("{}", format_message(i, message));
    }
    Ok(())
}

/// One line per message: index, role, display/send flags, text preview
fn format_message(index: usize, message: &Message) -> String {
    let flags = format!(
        "{}{}",
        if message.display { 'D' } else { '-' },
        if message.send_to_llm { 'S' } else { '-' }
    );
    let text = message.text().replace('\n', " ");
    let preview: String = if text.chars().count() > 80 {
        format!("{}...", text.chars().take(77).collect::<String>())
    } else {
        text
    };
    let boundary = if has_compaction_marker(message) { "== " } else { "" };
    format!(
        "{:>4} {:<9} [{}] {}{}",
        index,
        message.role.as_str(),
        flags,
        boundary,
        preview
    )
}

async fn compact(
    store: &SessionStore,
    manager: &ContextManager,
    id: &str,
    manual: bool,
) -> anyhow::Result<()> {
    let mut session = store.load(id)?;
    let before = session.messages.len();

    let report = compact_and_save(store, manager, &mut session, manual).await?;
    match report {
        CompactReport::Compacted {
            continuation,
            submitted,
        } => {
            println!(
                "Compacted session {}: {} message(s) -> {}",
                session.id,
                before,
                session.messages.len()
            );
            println!("{}", continuation_line(continuation.as_ref(), submitted));
            Ok(())
        }
        CompactReport::Failed { error } => {
            anyhow::bail!("Compaction failed: {}", error)
        }
    }
}

/// Summary line for the continuation collected by `compact`
fn continuation_line(continuation: Option<&Message>, queued: bool) -> String {
    match continuation {
        Some(message) if queued => format!("Continuation ready: {}", message.text()),
        Some(message) => format!("Continuation (not queued): {}", message.text()),
        None => "No continuation returned.".to_string(),
    }
}

async fn compact_and_save(
    store: &SessionStore,
    manager: &ContextManager,
    session: &mut session::Session,
    manual: bool,
) -> anyhow::Result<CompactReport> {
    let report = compact::compact_session(manager, session, manual).await?;
    store
        .save(session)
        .with_context(|| format!("Failed to save session {}", session.id))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use condense_types::MessageContent;

    #[test]
    fn test_format_message_flags() {
        let line = format_message(0, &Message::user("hello").with_visibility(false, true));
        assert!(line.contains("[-S]"));
        assert!(line.contains("user"));
        assert!(line.ends_with("hello"));
    }

    #[test]
    fn test_format_message_marks_boundary() {
        let marker = Message::new(
            condense_types::Role::Assistant,
            vec![MessageContent::summarization_requested("compacted")],
        )
        .with_visibility(true, false);
        let line = format_message(3, &marker);
        assert!(line.contains("[D-]"));
        assert!(line.contains("== "));
    }

    #[test]
    fn test_format_message_truncates() {
        let line = format_message(1, &Message::assistant("x".repeat(200)));
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_continuation_line() {
        let message = Message::user("keep going");
        assert_eq!(
            continuation_line(Some(&message), true),
            "Continuation ready: keep going"
        );
        assert_eq!(
            continuation_line(Some(&message), false),
            "Continuation (not queued): keep going"
        );
        assert_eq!(continuation_line(None, false), "No continuation returned.");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["condense", "compact", "abc", "--manual", "-v"]);
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Command::Compact { ref session_id, manual: true } if session_id == "abc"
        ));
    }
}
