use anyhow::Result;
use clap::Args;
use tibox_core::{Stage, TiboxConfig};

use super::{open_box, parse_value};

#[derive(Args, Debug)]
pub struct TidyArgs {
    /// Box name from the config
    #[arg(value_name = "BOX")]
    pub box_name: String,

    /// Text to commit
    pub text: String,

    /// Only run these stages (head, main, dict, tail); default all
    #[arg(long, short = 's', value_delimiter = ',', value_parser = parse_stage)]
    pub stages: Vec<Stage>,
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Box name from the config
    #[arg(value_name = "BOX")]
    pub box_name: String,

    /// Value to translate (JSON, or plain text)
    pub value: String,
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    Stage::ALL
        .into_iter()
        .find(|stage| stage.as_str() == s.trim())
        .ok_or_else(|| format!("unknown stage '{}' (expected head, main, dict or tail)", s))
}

pub async fn run_tidy(config: &TiboxConfig, args: TidyArgs) -> Result<()> {
    let ibox = open_box(config, &args.box_name).await?;
    let value = ibox
        .tidy_value(serde_json::Value::String(args.text), &args.stages)
        .await?;
    println!("{}", value);
    Ok(())
}

pub async fn run_translate(config: &TiboxConfig, args: TranslateArgs) -> Result<()> {
    let mut ibox = open_box(config, &args.box_name).await?;
    ibox.update_value(parse_value(&args.value)).await;
    println!("{}", ibox.display_text());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(parse_stage("dict"), Ok(Stage::Dict));
        assert_eq!(parse_stage(" tail "), Ok(Stage::Tail));
        assert!(parse_stage("middle").is_err());
    }
}
