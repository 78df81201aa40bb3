//! # PulseKV - A Minimal In-Memory Key-Value Server
//!
//! PulseKV speaks a line-oriented, Redis-like protocol over TCP. Each client
//! connection sends one command per read and gets one reply back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              PulseKV                                │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │              │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │              │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘              │
//! │                            │                  │                     │
//! │                            ▼                  ▼                     │
//! │                     ┌─────────────┐    ┌──────────────────────┐     │
//! │                     │  Decoder /  │    │    StorageEngine     │     │
//! │                     │  Encoder    │    │  (sharded RwLocks)   │     │
//! │                     └─────────────┘    └──────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use pulsekv::commands::CommandHandler;
//! use pulsekv::connection::{handle_connection, ConnectionStats, DEFAULT_READ_BUFFER_SIZE};
//! use pulsekv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("0.0.0.0:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, handler, stats, DEFAULT_READ_BUFFER_SIZE));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `INFO`
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoder and reply encoder
//! - [`storage`]: thread-safe store with passive expiry
//! - [`commands`]: command dispatch and argument validation
//! - [`connection`]: per-client read/execute/reply loop
//! - [`config`]: command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::{CommandError, CommandHandler};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_command, Command, CommandKind, ParseError, RespValue};
pub use storage::StorageEngine;

/// The default port PulseKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host PulseKV binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of PulseKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
