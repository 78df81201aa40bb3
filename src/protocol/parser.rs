//! Framed Request Decoder
//!
//! Turns one inbound buffer into a [`Command`]. The buffer is treated as a
//! sequence of CRLF-separated lines shaped like an array of bulk strings:
//!
//! ```text
//! line 0   *<N>          count marker, N includes the command name
//! line 1   $<len>        length marker (only its presence matters)
//! line 2   <name>        command name
//! line 3   $<len>
//! line 4   <arg 0>
//! ...
//! line 2N  <arg N-2>
//! ```
//!
//! Exactly one frame is decoded per call. Anything after the frame is
//! ignored rather than kept for a later call.

use crate::protocol::types::{prefix, CRLF};
use thiserror::Error;

/// Errors that can occur while decoding a request frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input buffer is empty
    #[error("empty input")]
    EmptyInput,

    /// Fewer than the three lines any frame needs
    #[error("frame too short: {0} lines")]
    TooFewLines(usize),

    /// Line 0 does not start with `*`
    #[error("missing count marker")]
    MissingCountMarker,

    /// The count marker is not a positive integer
    #[error("invalid argument count: {0:?}")]
    InvalidCount(String),

    /// The buffer declares more tokens than it carries
    #[error("truncated frame: {declared} tokens declared, {lines} lines present")]
    Truncated { declared: usize, lines: usize },

    /// A token is not valid UTF-8
    #[error("invalid UTF-8 in token")]
    InvalidUtf8,
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// The commands the server knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    Echo,
    Set,
    Get,
    Info,
    Unknown,
}

impl CommandKind {
    /// Maps an upper-cased command name onto a known command.
    pub fn from_name(name: &str) -> Self {
        match name {
            "PING" => CommandKind::Ping,
            "ECHO" => CommandKind::Echo,
            "SET" => CommandKind::Set,
            "GET" => CommandKind::Get,
            "INFO" => CommandKind::Info,
            _ => CommandKind::Unknown,
        }
    }
}

/// A decoded request: an upper-cased name plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Builds a command, normalizing the name to upper case.
    pub fn new(name: impl AsRef<str>, args: Vec<String>) -> Self {
        Self {
            name: name.as_ref().to_ascii_uppercase(),
            args,
        }
    }

    /// Returns which known command this is.
    pub fn kind(&self) -> CommandKind {
        CommandKind::from_name(&self.name)
    }
}

/// Decodes a single command from `buf`.
///
/// # Example
///
/// ```
/// use pulsekv::protocol::parse_command;
///
/// let command = parse_command(b"*2\r\n$4\r\necho\r\n$3\r\nhey\r\n").unwrap();
/// assert_eq!(command.name, "ECHO");
/// assert_eq!(command.args, vec!["hey".to_string()]);
/// ```
pub fn parse_command(buf: &[u8]) -> ParseResult<Command> {
    if buf.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let lines = split_lines(buf);
    if lines.len() < 3 {
        return Err(ParseError::TooFewLines(lines.len()));
    }

    let count = parse_count(lines[0])?;
    if lines.len() < count.saturating_mul(2).saturating_add(1) {
        return Err(ParseError::Truncated {
            declared: count,
            lines: lines.len(),
        });
    }

    let name = token(lines[2])?;
    let args = (0..count - 1)
        .map(|i| token(lines[i * 2 + 4]).map(str::to_string))
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Command::new(name, args))
}

/// Parses the `*<N>` count marker.
fn parse_count(line: &[u8]) -> ParseResult<usize> {
    let digits = match line.split_first() {
        Some((&prefix::ARRAY, rest)) => rest,
        _ => return Err(ParseError::MissingCountMarker),
    };

    let text = std::str::from_utf8(digits).map_err(|_| ParseError::InvalidUtf8)?;
    match text.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::InvalidCount(text.to_string())),
    }
}

fn token(line: &[u8]) -> ParseResult<&str> {
    std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)
}

/// Splits the buffer on every CRLF. A trailing CRLF yields a final empty line.
fn split_lines(buf: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;

    while let Some(pos) = find_crlf(&buf[start..]) {
        lines.push(&buf[start..start + pos]);
        start += pos + CRLF.len();
    }
    lines.push(&buf[start..]);

    lines
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
