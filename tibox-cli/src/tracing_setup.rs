//! Tracing setup for the tibox CLI
//!
//! Usage:
//!   tibox --debug ...              # Debug logging to stderr
//!   RUST_LOG=tibox_core=debug tibox  # Fine-grained log control
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug level unless RUST_LOG is set
    pub debug: bool,
    /// Fallback level from the config file
    pub level: Option<String>,
}

pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let fallback = if config.debug {
        "debug".to_string()
    } else {
        config.level.clone().unwrap_or_else(|| "warn".to_string())
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
