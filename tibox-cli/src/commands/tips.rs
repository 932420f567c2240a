use anyhow::{bail, Result};
use clap::Args;
use tibox_core::{FetchOutcome, InputBox, KeyStroke, TiboxConfig, TipRequest};
use tracing::debug;

use super::open_box;

#[derive(Args, Debug)]
pub struct TipsArgs {
    /// Box name from the config
    #[arg(value_name = "BOX")]
    pub box_name: String,

    /// Text typed so far
    #[arg(default_value = "")]
    pub hint: String,
}

/// Type `hint` into a focused box and wait for its tip fetch.
pub async fn fetch_tips(ibox: &mut InputBox, hint: &str) -> Result<FetchOutcome> {
    ibox.focus().await;
    // Drop the focus fetch so the typed hint is not debounced
    ibox.reset_tips();
    ibox.key_down(KeyStroke::new(hint.chars().last().map(String::from).unwrap_or_default()));

    match ibox.input(hint) {
        TipRequest::Issued(handle) => Ok(handle.outcome().await),
        TipRequest::Hidden => bail!("the box's tip show policy hides tips for this input"),
        TipRequest::NoDict => bail!("the box has no dictionary"),
        TipRequest::Debounced => {
            debug!("tip request debounced");
            Ok(FetchOutcome::Superseded)
        }
    }
}

pub async fn run_tips(config: &TiboxConfig, args: TipsArgs) -> Result<()> {
    let mut ibox = open_box(config, &args.box_name).await?;
    match fetch_tips(&mut ibox, &args.hint).await? {
        FetchOutcome::Committed(_) => {
            let tips = ibox.tips().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(tips.as_ref())?);
        }
        FetchOutcome::Failed => bail!("tip fetch failed; see log for details"),
        FetchOutcome::Superseded => bail!("tip fetch was superseded"),
    }
    Ok(())
}
