//! Connection Handler Module
//!
//! Each client gets its own handler task that runs in a loop, reading one
//! request per read, executing it and writing back one reply.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read one buffer             │
//!    │  Decode one command          │
//!    │  Execute command             │
//!    │  Write reply                 │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects, framing error or I/O error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! The read buffer is filled by a single read and cleared after every turn.
//! Bytes left over after the first frame in a read are dropped, and a frame
//! split across two reads is a framing error.

use crate::commands::CommandHandler;
use crate::protocol::{parse_command, Command, ParseError, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Default number of bytes requested per read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the loop can run over a `TcpStream` in
/// production and an in-memory mock in tests.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for the current read
    buffer: BytesMut,

    /// Bytes requested per read
    read_size: usize,

    /// Reply bytes for the current turn
    reply: Vec<u8>,

    /// The command handler (shares the store with every other connection)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    /// * `read_size` - Bytes requested per read
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        read_size: usize,
    ) -> Self {
        stats.connection_opened();

        let read_size = read_size.max(1);
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(read_size),
            read_size,
            reply: Vec::with_capacity(64),
            command_handler,
            stats,
        }
    }

    /// Runs the connection loop until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The read-execute-respond loop. Returns `Ok` on a clean disconnect.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            if !self.read_request().await? {
                return Ok(());
            }

            let command = self.decode_request()?;
            let response = self.command_handler.execute(&command);
            self.stats.command_processed();

            self.send_response(&response).await?;
        }
    }

    /// Reads one buffer from the client. Returns false when the client closed
    /// the connection.
    async fn read_request(&mut self) -> Result<bool, ConnectionError> {
        self.buffer.clear();
        self.buffer.resize(self.read_size, 0);

        let n = self.stream.get_mut().read(&mut self.buffer[..]).await?;
        self.buffer.truncate(n);

        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(true)
    }

    fn decode_request(&self) -> Result<Command, ConnectionError> {
        match parse_command(&self.buffer) {
            Ok(command) => {
                trace!(
                    client = %self.addr,
                    command = %command.name,
                    args = command.args.len(),
                    "Parsed command"
                );
                Ok(command)
            }
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Parse error");
                Err(ConnectionError::Parse(e))
            }
        }
    }

    /// Sends a reply to the client.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        self.reply.clear();
        response.serialize_into(&mut self.reply);

        self.stream.write_all(&self.reply).await?;
        self.stream.flush().await?;

        self.stats.bytes_written(self.reply.len());
        trace!(
            client = %self.addr,
            bytes = self.reply.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request buffer could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Handles a client connection.
///
/// Creates a [`ConnectionHandler`] and runs it to completion. Errors have
/// already been logged by the handler and only end this one connection.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    read_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, read_size);
    // `run` has already logged how the connection ended
    handler.run().await.ok();
}
