//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the chat surface (sessions, saved chats,
//! export) and is never sent to the agent.

/// A reference to a saved chat: its id, or `#n` for the n-th entry of `/chats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(String),
    /// One-based position in the most-recent-first list.
    Index(usize),
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start a new chat with a fresh session.
    New,

    /// Retry acquiring a session after a failure.
    Retry,

    /// Save the current chat under a name.
    Save(String),

    /// List saved chats.
    Chats,

    /// Open a saved chat read-only.
    Load(ChatRef),

    /// Delete a saved chat.
    Delete(ChatRef),

    /// Export the transcript to PDF, optionally into a specific directory.
    Export(Option<String>),

    /// Show session status.
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be sent as a message.
///
/// # Examples
///
/// ```
/// # use pungde::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/save Wheat rust").is_some());
/// assert!(parse_command("How do I treat wheat rust?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "retry" => ChatCommand::Retry,
        "save" => match argument {
            Some(name) => ChatCommand::Save(name.to_string()),
            None => ChatCommand::Invalid("/save requires a name".to_string()),
        },
        "chats" | "history" => ChatCommand::Chats,
        "load" => parse_chat_ref(argument, ChatCommand::Load, "/load"),
        "delete" => parse_chat_ref(argument, ChatCommand::Delete, "/delete"),
        "export" => ChatCommand::Export(argument.map(|s| s.to_string())),
        "status" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_chat_ref<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(ChatRef) -> ChatCommand,
{
    match argument {
        Some(arg) => match arg.strip_prefix('#') {
            Some(index) => match index.parse::<usize>() {
                Ok(n) if n > 0 => constructor(ChatRef::Index(n)),
                _ => ChatCommand::Invalid(format!("{name} expects #<n> with n >= 1")),
            },
            None => constructor(ChatRef::Id(arg.to_string())),
        },
        None => ChatCommand::Invalid(format!("{name} requires a chat id or #<n>")),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /retry                 Retry connecting to the assistant
  /save <name>           Save the current chat
  /chats                 List saved chats
  /load <id|#n>          Open a saved chat (read-only)
  /delete <id|#n>        Delete a saved chat
  /export [dir]          Export the chat as a PDF report
  /status                Show session status
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/NEW"), Some(ChatCommand::New));
        assert_eq!(parse_command("/retry"), Some(ChatCommand::Retry));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Status));
    }

    #[test]
    fn parse_save() {
        assert_eq!(
            parse_command("/save   Paddy blast  "),
            Some(ChatCommand::Save("Paddy blast".to_string()))
        );
        assert!(matches!(
            parse_command("/save"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_chat_references() {
        assert_eq!(
            parse_command("/load 1735689600000"),
            Some(ChatCommand::Load(ChatRef::Id("1735689600000".to_string())))
        );
        assert_eq!(
            parse_command("/delete #2"),
            Some(ChatCommand::Delete(ChatRef::Index(2)))
        );
        assert!(matches!(
            parse_command("/load #0"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/delete #x"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/load"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_export() {
        assert_eq!(parse_command("/export"), Some(ChatCommand::Export(None)));
        assert_eq!(
            parse_command("/export reports"),
            Some(ChatCommand::Export(Some("reports".to_string())))
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model x"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("What crop suits sandy soil?"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in [
            "/new", "/retry", "/save", "/chats", "/load", "/delete", "/export", "/status",
            "/help", "/quit",
        ] {
            assert!(help.contains(command), "{command}");
        }
    }
}
