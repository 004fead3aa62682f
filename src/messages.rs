//! User-facing messages.
//!
//! Callers that talk to the user take a `&dyn Messenger` instead of printing
//! directly, so the same code can run colored on a terminal, plain in a pipe,
//! or silently in tests.

use std::io::{self, IsTerminal, Write};

use crossterm::style::{StyledContent, Stylize};

/// Width at which taxon lists are wrapped.
const OTU_WRAP_WIDTH: usize = 160;

/// Kind of message, which decides its prefix and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Progress,
    Tip,
    Warning,
    Error,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Progress => "> ",
            Level::Tip => "tip: ",
            Level::Warning => "warning: ",
            Level::Error => "error: ",
        }
    }

    fn styled(self) -> StyledContent<&'static str> {
        let prefix = self.prefix();
        match self {
            Level::Progress | Level::Tip => prefix.green(),
            Level::Warning => prefix.magenta(),
            Level::Error => prefix.red(),
        }
    }
}

/// Formats a message with the prefix of its level.
pub fn format_message(level: Level, message: &str, color: bool) -> String {
    if color {
        format!("{}{}", level.styled(), message)
    } else {
        format!("{}{}", level.prefix(), message)
    }
}

/// Lists taxa separated by commas, wrapped and indented by four spaces.
pub fn format_otus<S: AsRef<str>>(otus: &[S]) -> String {
    let joined = otus.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");
    let lines = textwrap::wrap(&joined, OTU_WRAP_WIDTH);
    format!("    {}", lines.join("\n    "))
}

/// Something that can show a message to the user.
pub trait Messenger {
    fn emit(&self, level: Level, message: &str) -> io::Result<()>;
}

/// Writes one formatted message to `out`. Progress lines end in a carriage
/// return so the next one overwrites them.
pub fn write_message<W: Write>(mut out: W, level: Level, message: &str, color: bool) -> io::Result<()> {
    let text = format_message(level, message, color);
    match level {
        Level::Progress => write!(out, "{}\r", text),
        _ => writeln!(out, "{}", text),
    }
}

/// Writes messages to stderr, colored when stderr is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalMessenger {
    color: bool,
}

impl TerminalMessenger {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }
}

impl Default for TerminalMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger for TerminalMessenger {
    fn emit(&self, level: Level, message: &str) -> io::Result<()> {
        write_message(io::stderr().lock(), level, message, self.color)
    }
}

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Messenger for Silent {
    fn emit(&self, _level: Level, _message: &str) -> io::Result<()> {
        Ok(())
    }
}
