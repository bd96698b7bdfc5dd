//! Interactive farming-advisory chat.
//!
//! This binary provides a streaming REPL interface to the Pungde agent
//! service, with saved chats and PDF export.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the production service as the guest user
//! pungde-chat
//!
//! # Point at a local agent deployment
//! pungde-chat --base-url http://localhost:8000
//!
//! # Keep saved chats somewhere else, write exports to ./reports
//! pungde-chat --archive-dir /var/lib/pungde --export-dir reports
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new chat
//! - `/save <name>` - Save the current chat
//! - `/chats` - List saved chats
//! - `/export [dir]` - Export the chat as a PDF report
//! - `/quit` - Exit the application

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pungde::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use pungde::{ChatArchive, FileStorage, HttpAssetFetcher, PungdeClient};

type Session = ChatSession<PungdeClient, FileStorage>;

/// Main entry point for the pungde-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("pungde-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let collector = biometrics::Collector::new();
    pungde::register_biometrics(collector);

    let client = Arc::new(PungdeClient::with_options(
        config.base_url.clone(),
        Some(config.app_name.clone()),
        Some(config.timeout),
    )?);
    let archive = ChatArchive::new(FileStorage::open(&config.archive_dir)?);
    let fetcher = HttpAssetFetcher::new(config.timeout)?;
    let mut session = ChatSession::new(client.clone(), config.user_id.clone(), archive);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // Token of the turn in flight; Ctrl+C cancels it.
    let current: Arc<Mutex<CancellationToken>> = Arc::new(Mutex::new(CancellationToken::new()));
    let handler_token = current.clone();
    ctrlc::set_handler(move || {
        if let Ok(token) = handler_token.lock() {
            token.cancel();
        }
    })?;

    println!("Pungde farming assistant ({})", client.base_url());
    println!("Type /help for commands, /quit to exit\n");

    match session.start().await {
        Ok(()) => {
            for message in session.messages() {
                renderer.print_message(message);
            }
        }
        Err(err) => renderer.print_error(&format!(
            "Could not connect to the assistant: {err}. Use /retry to try again."
        )),
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(cmd, &mut session, &mut renderer, &fetcher, &config).await;
                    continue;
                }

                // Regular message - send to the agent
                let token = session.turn_token();
                if let Ok(mut slot) = current.lock() {
                    *slot = token.clone();
                }
                if let Err(e) = session.send_streaming(line, &mut renderer, &token).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

async fn run_command(
    cmd: ChatCommand,
    session: &mut Session,
    renderer: &mut PlainTextRenderer,
    fetcher: &HttpAssetFetcher,
    config: &ChatConfig,
) {
    match cmd {
        ChatCommand::New => match session.new_chat().await {
            Ok(()) => {
                renderer.print_info("Started a new chat.");
                for message in session.messages() {
                    renderer.print_message(message);
                }
            }
            Err(err) => renderer.print_error(&format!(
                "Could not start a new session: {err}. Use /retry to try again."
            )),
        },
        ChatCommand::Retry => match session.retry_session().await {
            Ok(id) => renderer.print_info(&format!("Connected (session {id}).")),
            Err(err) => renderer.print_error(&format!("Still unable to connect: {err}")),
        },
        ChatCommand::Save(name) => match session.save(&name) {
            Ok(chat) => renderer.print_info(&format!("Saved \"{}\" ({}).", chat.name, chat.id)),
            Err(err) => renderer.print_error(&format!("Failed to save chat: {err}")),
        },
        ChatCommand::Chats => match session.saved_chats() {
            Ok(chats) if chats.is_empty() => renderer.print_info("No saved chats."),
            Ok(chats) => {
                for (index, chat) in chats.iter().enumerate() {
                    renderer.print_info(&format!(
                        "  #{:<3} {}  {}  ({} messages)",
                        index + 1,
                        chat.id,
                        chat.name,
                        chat.messages.len()
                    ));
                }
            }
            Err(err) => renderer.print_error(&format!("Failed to read saved chats: {err}")),
        },
        ChatCommand::Load(reference) => {
            let loaded = session
                .resolve(&reference)
                .and_then(|id| session.load(&id).map(|chat| chat.name.clone()));
            match loaded {
                Ok(name) => {
                    renderer.print_info(&format!("Viewing \"{name}\" (read-only, /new to chat)."));
                    for message in session.messages() {
                        renderer.print_message(message);
                    }
                }
                Err(err) => renderer.print_error(&format!("Failed to load chat: {err}")),
            }
        }
        ChatCommand::Delete(reference) => {
            let was_viewing = session.viewing().is_some();
            let id = match session.resolve(&reference) {
                Ok(id) => id,
                Err(err) => {
                    renderer.print_error(&format!("Failed to delete chat: {err}"));
                    return;
                }
            };
            match session.delete(&id).await {
                Ok(true) if was_viewing && session.is_ready() => {
                    renderer.print_info("Chat deleted. Started a new chat.")
                }
                Ok(true) if was_viewing => renderer.print_error(
                    "Chat deleted, but a new session could not be started. Use /retry to try again.",
                ),
                Ok(true) => renderer.print_info("Chat deleted."),
                Ok(false) => renderer.print_error(&format!("No saved chat with id {id}")),
                Err(err) => renderer.print_error(&format!("Failed to delete chat: {err}")),
            }
        }
        ChatCommand::Export(dir) => {
            let dir = dir.map(PathBuf::from).unwrap_or_else(|| config.export_dir.clone());
            renderer.print_info("Exporting...");
            match session.export_pdf(fetcher, &dir).await {
                Ok(path) => renderer.print_info(&format!("Exported to {}", path.display())),
                Err(err) => renderer.print_error(&format!("Export failed: {err}")),
            }
        }
        ChatCommand::Status => print_status(session, config),
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::Invalid(message) => renderer.print_error(&message),
        ChatCommand::Quit => {}
    }
}

fn print_status(session: &Session, config: &ChatConfig) {
    let stats = session.stats();
    println!("    Session Status:");
    match &stats.session_id {
        Some(id) => println!("      Session: {id}"),
        None => println!("      Session: (not connected)"),
    }
    println!("      User: {}", stats.user_id);
    println!("      Messages: {}", stats.message_count);
    match &stats.viewing {
        Some(name) => println!("      Viewing: {name} (read-only)"),
        None => println!("      Viewing: (current chat)"),
    }
    println!(
        "      Turns: {} ({} failed)",
        stats.turns, stats.failed_turns
    );
    if let Some(error) = &stats.last_error {
        println!("      Last error: {error}");
    }
    println!("      Archive: {}", config.archive_dir.display());
    println!("      Exports: {}", config.export_dir.display());
}
