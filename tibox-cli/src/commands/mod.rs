//! Command implementations for the tibox CLI

pub mod repl;
pub mod tips;
pub mod value;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tibox_core::{I18nTable, InputBox, KeepStores, TiboxConfig};

pub use repl::{run_repl, ReplArgs};
pub use tips::{run_tips, TipsArgs};
pub use value::{run_tidy, run_translate, TidyArgs, TranslateArgs};

/// Local keep store location: `~/.tibox/keep.json`
fn keep_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tibox")
        .join("keep.json")
}

/// Build the named box from the config file.
pub async fn open_box(config: &TiboxConfig, name: &str) -> Result<InputBox> {
    let box_config = config.get_box(name)?.clone();
    let registry = config
        .build_registry()
        .context("Failed to build dictionaries")?;
    let i18n: HashMap<String, String> = config.i18n.clone();

    let ibox = InputBox::builder(box_config, &registry)
        .i18n(Arc::new(I18nTable::new(i18n)))
        .keep_stores(KeepStores::with_local_file(keep_path()))
        .build()
        .await
        .with_context(|| format!("Failed to set up box '{}'", name))?;
    Ok(ibox)
}

/// Parse a command-line value: JSON when it parses, plain string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn run_dicts(config: &TiboxConfig) -> Result<()> {
    let registry = config.build_registry()?;
    for name in registry.names() {
        println!("{}", name);
    }
    Ok(())
}
