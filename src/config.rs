//! Server configuration
//!
//! Values come from command-line flags, falling back to `PULSEKV_*`
//! environment variables and then to the defaults below.

use crate::connection::DEFAULT_READ_BUFFER_SIZE;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pulsekv")]
#[command(about = "A minimal in-memory key-value server speaking a Redis-like protocol")]
#[command(version)]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "PULSEKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PULSEKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bytes requested from the socket per read; one command per read
    #[arg(
        long,
        env = "PULSEKV_READ_BUFFER_SIZE",
        default_value_t = DEFAULT_READ_BUFFER_SIZE,
        value_parser = parse_buffer_size
    )]
    pub read_buffer_size: usize,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "pulsekv=debug")
    #[arg(long, env = "PULSEKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("read buffer size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
