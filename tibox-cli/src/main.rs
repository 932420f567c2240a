//! tibox CLI - drive dictionary-backed input boxes from a terminal
//!
//! A TOML config declares dictionaries (`[dicts.*]`), boxes (`[boxes.*]`)
//! and i18n texts (`[i18n]`). Subcommands run one box's pipeline:
//! - `tidy`: commit text through the value pipeline
//! - `translate`: show the display text for a value
//! - `tips`: fetch the tip list for a hint
//! - `dicts`: list registered dictionaries
//! - `repl`: interactive session against one box

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tibox_core::TiboxConfig;

mod commands;
mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tibox",
    author,
    version,
    about = "Run input boxes with layered value processing and live tip lists"
)]
struct Cli {
    /// Config file (default: ~/.tibox/config.toml)
    #[arg(long, short = 'c', global = true, env = "TIBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tidy text through a box's processors and print the value as JSON
    Tidy(commands::TidyArgs),
    /// Print the display text of a value
    Translate(commands::TranslateArgs),
    /// Fetch tips for a hint and print them as JSON
    Tips(commands::TipsArgs),
    /// List registered dictionaries
    Dicts,
    /// Interactive session against one box
    Repl(commands::ReplArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(TiboxConfig::default_path);
    let config = TiboxConfig::load(&path)?;

    init_tracing(&TracingConfig {
        debug: cli.debug,
        level: config.log_level.clone(),
    })
    .ok();

    match cli.command {
        Commands::Tidy(args) => commands::run_tidy(&config, args).await?,
        Commands::Translate(args) => commands::run_translate(&config, args).await?,
        Commands::Tips(args) => commands::run_tips(&config, args).await?,
        Commands::Dicts => commands::run_dicts(&config)?,
        Commands::Repl(args) => commands::run_repl(&config, args).await?,
    }

    Ok(())
}
