pub mod config;
pub mod doctor;
pub mod payments;

use clap::{Parser, Subcommand};
use tb_domain::config::Config;

/// Ticketbot: a WhatsApp assistant for finding and buying event tickets.
#[derive(Debug, Parser)]
#[command(name = "ticketbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the webhook server (default when no subcommand is given).
    Serve,
    /// Check configuration, secrets and the state directory.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Payment queue maintenance.
    #[command(subcommand)]
    Payments(PaymentsCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum PaymentsCommand {
    /// List jobs that failed for good.
    Dead,
    /// Move dead jobs back to the pending queue (run with the server stopped).
    Requeue,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `TB_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.  A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("TB_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_from(&config_path)?;
    Ok((config, config_path))
}

fn load_from(config_path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
