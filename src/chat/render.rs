//! Output rendering for the chat application.
//!
//! Replies stream in as deltas and complete messages; the [`Renderer`]
//! decides how each is shown.

use std::io::{self, Stdout, Write};

use crate::types::{ChatMessage, Role};

/// ANSI escape code for dim text (used for notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

const ASSISTANT_LABEL: &str = "Pungda";
const USER_LABEL: &str = "You";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of a reply that is arriving token by token.
    fn print_text(&mut self, text: &str);

    /// Print a complete message: a whole reply, or an entry of a saved chat.
    fn print_message(&mut self, message: &ChatMessage);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is complete.
    fn finish_response(&mut self);

    /// Called when the reply is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    /// True while a streamed reply is being printed.
    in_reply: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with the given color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            in_reply: false,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn label(&mut self, role: Role) {
        let (colour, label) = match role {
            Role::Assistant => (ANSI_GREEN, ASSISTANT_LABEL),
            Role::User => (ANSI_CYAN, USER_LABEL),
        };
        if self.use_color {
            let _ = write!(self.out, "{colour}{label}:{ANSI_RESET} ");
        } else {
            let _ = write!(self.out, "{label}: ");
        }
    }

    fn end_reply(&mut self) {
        if self.in_reply {
            let _ = writeln!(self.out);
            self.in_reply = false;
        }
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_text(&mut self, text: &str) {
        if !self.in_reply {
            self.label(Role::Assistant);
            self.in_reply = true;
        }
        let _ = write!(self.out, "{text}");
        self.flush();
    }

    fn print_message(&mut self, message: &ChatMessage) {
        self.end_reply();
        self.label(message.role);
        let _ = writeln!(self.out, "{}", message.content);
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_reply();
        if self.use_color {
            let _ = writeln!(self.out, "{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.out, "Error: {error}");
        }
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.end_reply();
        if self.use_color {
            let _ = writeln!(self.out, "{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.out, "{info}");
        }
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_reply();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_reply();
        let _ = writeln!(self.out, "[interrupted]");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(renderer: PlainTextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn streamed_reply_is_labelled_once() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_text("Use ");
        renderer.print_text("mulch.");
        renderer.finish_response();
        assert_eq!(output(renderer), "Pungda: Use mulch.\n");
    }

    #[test]
    fn complete_messages_end_a_streamed_reply() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_text("partial");
        renderer.print_message(&ChatMessage::assistant("whole"));
        renderer.print_message(&ChatMessage::user("thanks"));
        renderer.finish_response();
        assert_eq!(
            output(renderer),
            "Pungda: partial\nPungda: whole\nYou: thanks\n"
        );
    }

    #[test]
    fn errors_and_interrupts_without_color() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_text("half");
        renderer.print_interrupted();
        renderer.print_error("offline");
        assert_eq!(output(renderer), "Pungda: half\n[interrupted]\nError: offline\n");
    }

    #[test]
    fn color_wraps_labels() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.print_message(&ChatMessage::assistant("hi"));
        assert_eq!(output(renderer), "\x1b[32mPungda:\x1b[0m hi\n");
    }
}
