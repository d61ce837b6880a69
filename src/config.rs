use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl ServerConfig {
    pub fn new(bind: &str) -> Result<Self> {
        let bind = bind
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {bind:?}: {e}")))?;
        Ok(Self { bind })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

/// `~/.planzo/planzo.db`
pub fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
        .join(".planzo");
    Ok(dir.join("planzo.db"))
}
