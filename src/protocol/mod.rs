//! Wire Protocol
//!
//! Requests arrive as a CRLF-delimited array of bulk strings and replies go
//! out as status, error, bulk or null-bulk frames.
//!
//! ## Modules
//!
//! - `parser`: decodes one request buffer into a [`Command`]
//! - `types`: defines [`RespValue`] and reply serialization
//!
//! ## Example
//!
//! ```
//! use pulsekv::protocol::{parse_command, RespValue};
//!
//! let command = parse_command(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
//! assert_eq!(command.args, vec!["name".to_string()]);
//!
//! let reply = RespValue::bulk(Some("Ariz"));
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_command, Command, CommandKind, ParseError, ParseResult};
pub use types::{encode_bulk, RespValue};
