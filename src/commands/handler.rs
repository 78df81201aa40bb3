//! Command Handler Module
//!
//! Executes decoded commands against the storage engine and builds the reply
//! for each one.
//!
//! ## Supported Commands
//!
//! - `PING` - Replies `PONG`, arguments are ignored
//! - `ECHO message` - Echo message
//! - `SET key value [PX milliseconds]` - Set a key, optionally with expiry
//! - `GET key` - Get a key's value
//! - `INFO` - Replies `OK`, arguments are ignored
//!
//! Any other name gets an `unknown command` error reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   kind()    │───>│  validate   │───>│   execute   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, CommandKind, RespValue};
use crate::storage::{current_time_millis, StorageEngine};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a command was rejected. The `Display` text is the error reply body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Wrong number of arguments for a known command
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// Arguments have the right count but the wrong shape
    #[error("ERR syntax error")]
    Syntax,

    /// A numeric argument could not be parsed
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    /// PX offset is zero or negative
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    /// The command name is not recognized
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}

type CommandResult = Result<RespValue, CommandError>;

/// Handles commands by dispatching them to the appropriate handlers.
///
/// Holds no state of its own beyond a handle to the shared store, so one
/// handler can be cloned per connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler over the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the storage engine this handler executes against.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes a command and returns the reply to send back.
    ///
    /// Every command produces exactly one reply; rejected commands produce an
    /// error reply and leave the store untouched.
    pub fn execute(&self, command: &Command) -> RespValue {
        let args = command.args.as_slice();

        let result = match command.kind() {
            CommandKind::Ping => Ok(RespValue::pong()),
            CommandKind::Info => Ok(RespValue::ok()),
            CommandKind::Echo => self.cmd_echo(args),
            CommandKind::Set => self.cmd_set(args),
            CommandKind::Get => self.cmd_get(args),
            CommandKind::Unknown => Err(CommandError::UnknownCommand(command.name.clone())),
        };

        result.unwrap_or_else(|err| {
            debug!(command = %command.name, error = %err, "Command rejected");
            err.into()
        })
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[String]) -> CommandResult {
        match args {
            [message] => Ok(RespValue::bulk(Some(message.as_str()))),
            _ => Err(CommandError::WrongArity("echo")),
        }
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[String]) -> CommandResult {
        let expires_at = match args {
            [] | [_] => return Err(CommandError::WrongArity("set")),
            [_, _] => None,
            [_, _, option, millis] if option.eq_ignore_ascii_case("PX") => {
                let millis: i64 = millis.parse().map_err(|_| CommandError::NotAnInteger)?;
                if millis <= 0 {
                    return Err(CommandError::InvalidExpireTime("set"));
                }
                Some(current_time_millis().saturating_add(millis as u64))
            }
            _ => return Err(CommandError::Syntax),
        };

        self.storage.set(args[0].as_str(), args[1].as_str(), expires_at);
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[String]) -> CommandResult {
        match args {
            [key] => Ok(RespValue::bulk(self.storage.get(key))),
            _ => Err(CommandError::WrongArity("get")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage)
    }

    fn make_command(args: &[&str]) -> Command {
        Command::new(
            args[0],
            args[1..].iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["PING"]));
        assert_eq!(response.serialize(), b"+PONG\r\n");

        // Arguments are ignored
        let response = handler.execute(&make_command(&["ping", "hello"]));
        assert_eq!(response, RespValue::pong());
    }

    #[test]
    fn test_info() {
        let handler = create_handler();

        assert_eq!(handler.execute(&make_command(&["INFO"])), RespValue::ok());
        assert_eq!(
            handler.execute(&make_command(&["info", "replication"])),
            RespValue::ok()
        );
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["ECHO", "hey"]));
        assert_eq!(response.serialize(), b"$3\r\nhey\r\n");
    }

    #[test]
    fn test_echo_wrong_arity() {
        let handler = create_handler();

        for command in [&["ECHO"][..], &["ECHO", "a", "b"][..]] {
            let response = handler.execute(&make_command(command));
            assert_eq!(
                response.serialize(),
                b"-ERR wrong number of arguments for 'echo' command\r\n"
            );
        }
        assert!(handler.storage().is_empty());
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["SET", "foo", "bar"]));
        assert_eq!(response.serialize(), b"+OK\r\n");

        let response = handler.execute(&make_command(&["GET", "foo"]));
        assert_eq!(response.serialize(), b"$3\r\nbar\r\n");
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["GET", "nonexistent"]));
        assert_eq!(response.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_get_wrong_arity() {
        let handler = create_handler();

        for command in [&["GET"][..], &["GET", "a", "b"][..]] {
            let response = handler.execute(&make_command(command));
            assert_eq!(
                response,
                RespValue::error("ERR wrong number of arguments for 'get' command")
            );
        }
    }

    #[test]
    fn test_set_wrong_arity_leaves_store_untouched() {
        let handler = create_handler();

        for command in [&["SET"][..], &["SET", "key"][..]] {
            let response = handler.execute(&make_command(command));
            assert_eq!(
                response,
                RespValue::error("ERR wrong number of arguments for 'set' command")
            );
        }
        assert!(handler.storage().is_empty());
    }

    #[test]
    fn test_set_with_px() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["SET", "foo", "bar", "px", "50"]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(&make_command(&["GET", "foo"]));
        assert_eq!(response, RespValue::bulk(Some("bar")));

        std::thread::sleep(Duration::from_millis(100));

        let response = handler.execute(&make_command(&["GET", "foo"]));
        assert_eq!(response.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_set_px_expiry_is_absolute() {
        let handler = create_handler();
        let before = current_time_millis();

        handler.execute(&make_command(&["SET", "foo", "bar", "PX", "10000"]));

        let storage = handler.storage();
        assert_eq!(storage.get_at("foo", before + 9_000), Some("bar".to_string()));
        assert_eq!(storage.get_at("foo", u64::MAX), None);
    }

    #[test]
    fn test_set_px_not_an_integer() {
        let handler = create_handler();
        handler.execute(&make_command(&["SET", "foo", "old"]));

        let response = handler.execute(&make_command(&["SET", "foo", "new", "PX", "soon"]));
        assert_eq!(
            response,
            RespValue::error("ERR value is not an integer or out of range")
        );

        // Prior value survives
        let response = handler.execute(&make_command(&["GET", "foo"]));
        assert_eq!(response, RespValue::bulk(Some("old")));
    }

    #[test]
    fn test_set_px_non_positive() {
        let handler = create_handler();

        for millis in ["0", "-5"] {
            let response = handler.execute(&make_command(&["SET", "foo", "bar", "PX", millis]));
            assert_eq!(
                response,
                RespValue::error("ERR invalid expire time in 'set' command")
            );
        }
        assert!(handler.storage().is_empty());
    }

    #[test]
    fn test_set_syntax_error() {
        let handler = create_handler();

        for command in [
            &["SET", "k", "v", "PX"][..],
            &["SET", "k", "v", "EX", "10"][..],
            &["SET", "k", "v", "PX", "10", "NX"][..],
        ] {
            let response = handler.execute(&make_command(command));
            assert_eq!(response, RespValue::error("ERR syntax error"));
        }
        assert!(handler.storage().is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        let response = handler.execute(&make_command(&["flushdb"]));
        assert_eq!(response.serialize(), b"-ERR unknown command 'FLUSHDB'\r\n");
    }

    #[test]
    fn test_handlers_share_storage() {
        let storage = Arc::new(StorageEngine::new());
        let first = CommandHandler::new(Arc::clone(&storage));
        let second = CommandHandler::new(storage);

        first.execute(&make_command(&["SET", "shared", "yes"]));
        let response = second.execute(&make_command(&["GET", "shared"]));
        assert_eq!(response, RespValue::bulk(Some("yes")));
    }

    #[test]
    fn test_concurrent_set_get_same_key() {
        let storage = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let handler = CommandHandler::new(Arc::clone(&storage));
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let value = format!("value:{}:{}", t, i);
                        let response = handler.execute(&make_command(&["SET", "hot", value.as_str()]));
                        assert_eq!(response, RespValue::ok());

                        // Some writer's value, never null or torn
                        match handler.execute(&make_command(&["GET", "hot"])) {
                            RespValue::BulkString(v) => assert!(v.starts_with("value:")),
                            other => panic!("unexpected reply: {:?}", other),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.len(), 1);

        let handler = CommandHandler::new(storage);
        handler.execute(&make_command(&["SET", "hot", "last"]));
        let response = handler.execute(&make_command(&["GET", "hot"]));
        assert_eq!(response, RespValue::bulk(Some("last")));
    }
}
