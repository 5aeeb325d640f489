//! Server configuration types.
//!
//! Address, port and worker thread count for the Pingora listener.
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_THREADS};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Default worker thread count
fn default_threads() -> usize {
    DEFAULT_THREADS
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to (e.g. "0.0.0.0")
    #[serde(default = "default_address")]
    pub address: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads for the proxy service
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener ("address:port")
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
