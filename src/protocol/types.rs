//! Reply Types and Encoding
//!
//! Every reply the server writes is one of four shapes:
//!
//! - `+` Simple status: `+OK\r\n`, `+PONG\r\n`
//! - `-` Error: `-ERR wrong number of arguments for 'get' command\r\n`
//! - `$` Bulk string: `$5\r\nhello\r\n`
//! - `$-1` Null bulk string: `$-1\r\n`
//!
//! All replies are terminated with CRLF (`\r\n`).

use std::fmt;

/// The CRLF terminator used by the protocol
pub const CRLF: &[u8] = b"\r\n";

/// The fixed null bulk marker
pub const NULL_BULK: &[u8] = b"$-1\r\n";

/// Protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A logical reply, ready to be serialized onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply.
    /// Format: `+<word>\r\n`
    SimpleString(String),

    /// Error reply. The message should already carry its `ERR` prefix.
    /// Format: `-<message>\r\n`
    Error(String),

    /// Length-prefixed string.
    /// Format: `$<byte-length>\r\n<data>\r\n`
    BulkString(String),

    /// Null bulk string: `$-1\r\n`
    Null,
}

impl RespValue {
    /// Creates a new status reply.
    ///
    /// # Example
    /// ```
    /// use pulsekv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error reply.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a bulk reply from an optional string.
    ///
    /// Absent and empty strings both collapse to [`RespValue::Null`].
    ///
    /// # Example
    /// ```
    /// use pulsekv::protocol::types::RespValue;
    /// assert_eq!(RespValue::bulk(Some("hey")).serialize(), b"$3\r\nhey\r\n");
    /// assert_eq!(RespValue::bulk(None::<String>).serialize(), b"$-1\r\n");
    /// ```
    pub fn bulk(value: Option<impl Into<String>>) -> Self {
        match value.map(Into::<String>::into) {
            Some(s) if !s.is_empty() => RespValue::BulkString(s),
            _ => RespValue::Null,
        }
    }

    /// Creates a null reply.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Common reply for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Common reply for PING
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => buf.extend_from_slice(NULL_BULK),
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }
}

/// Encodes an optional string as a bulk reply.
///
/// `Some("hey")` becomes `$3\r\nhey\r\n`; `None` and `Some("")` become `$-1\r\n`.
pub fn encode_bulk(value: Option<&str>) -> Vec<u8> {
    RespValue::bulk(value).serialize()
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::BulkString(s) => write!(f, "\"{}\"", s),
            RespValue::Null => write!(f, "(nil)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command 'FOO'");
        assert_eq!(value.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        assert_eq!(encode_bulk(Some("hello")), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_bulk_length_counts_bytes() {
        // "héllo" is five characters but six UTF-8 bytes
        assert_eq!(encode_bulk(Some("héllo")), "$6\r\nhéllo\r\n".as_bytes());
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(encode_bulk(None), b"$-1\r\n");
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_empty_bulk_is_null() {
        assert_eq!(encode_bulk(Some("")), b"$-1\r\n");
        assert!(RespValue::bulk(Some("")).is_null());
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = b"+PONG\r\n".to_vec();
        RespValue::ok().serialize_into(&mut buf);
        assert_eq!(buf, b"+PONG\r\n+OK\r\n");
    }

    #[test]
    fn test_ok_and_pong() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(RespValue::pong().to_string(), "PONG");
        assert_eq!(RespValue::bulk(Some("bar")).to_string(), "\"bar\"");
        assert_eq!(RespValue::null().to_string(), "(nil)");
    }
}
