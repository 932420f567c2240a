//! Line-oriented session against one box.
//!
//! Plain lines are typed into the box. Lines starting with `:` are
//! commands; `:help` lists them.

use anyhow::Result;
use clap::Args;
use tibox_core::{BoxEvent, FetchOutcome, InputBox, KeyStroke, TiboxConfig, TipRequest, TriggerReason};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::{open_box, parse_value};

#[derive(Args, Debug)]
pub struct ReplArgs {
    /// Box name from the config
    #[arg(value_name = "BOX")]
    pub box_name: String,
}

const HELP: &str = "\
<text>           type text into the box (fetches tips)
:focus / :blur   move focus
:key <k>         press a key (ctrl+k, alt+k, ...)
:commit [text]   commit text (default: what is typed)
:pick <n>        pick tip n
:set <value>     set the value from outside (JSON or text)
:clear / :copy   clean icon / copy icon
:tips            show the tip list
:state           dump box state
:quit";

enum Step {
    Continue,
    Quit,
}

pub async fn run_repl(config: &TiboxConfig, args: ReplArgs) -> Result<()> {
    let mut ibox = open_box(config, &args.box_name).await?;
    let mut events = ibox.subscribe();
    println!("box '{}' ready; :help for commands", args.box_name);
    println!("{}", ibox.state().dump());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let step = handle_line(&mut ibox, line.trim_end()).await;
        drain_events(&mut events);
        match step {
            Ok(Step::Quit) => break,
            Ok(Step::Continue) => {}
            Err(err) => println!("error: {:#}", err),
        }
    }
    Ok(())
}

async fn handle_line(ibox: &mut InputBox, line: &str) -> Result<Step> {
    let Some(command) = line.strip_prefix(':') else {
        let outcome = type_text(ibox, line).await;
        report_fetch(ibox, outcome);
        return Ok(Step::Continue);
    };

    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();
    match name {
        "quit" | "q" => return Ok(Step::Quit),
        "help" => println!("{}", HELP),
        "focus" => {
            let outcome = wait_request(ibox.focus().await).await;
            println!("text: {:?}", ibox.display_text());
            report_fetch(ibox, outcome);
        }
        "blur" => {
            ibox.blur().await;
            println!("text: {:?}", ibox.display_text());
        }
        "key" => ibox.key_down(parse_key(rest)),
        "commit" => {
            let text = if rest.is_empty() {
                ibox.display_text().to_string()
            } else {
                rest.to_string()
            };
            ibox.change_value(&text).await?;
        }
        "pick" => {
            let index: usize = rest.parse()?;
            if ibox.pick_tip(index).await.is_none() {
                println!("no tip #{}", index);
            }
        }
        "set" => {
            ibox.update_value(parse_value(rest)).await;
            println!("text: {:?}", ibox.display_text());
        }
        "clear" => {
            ibox.click_prefix().await?;
        }
        "copy" => ibox.click_suffix(),
        "tips" => print_tips(ibox),
        "state" => println!("{}", ibox.state().dump()),
        other => println!("unknown command ':{}'", other),
    }
    Ok(Step::Continue)
}

/// Type text, retrying once after the debounce window when the previous
/// request was too recent (piped input arrives faster than typing).
async fn type_text(ibox: &mut InputBox, text: &str) -> Option<FetchOutcome> {
    if let Some(last) = text.chars().last() {
        ibox.key_down(KeyStroke::new(last.to_string()));
    }
    let request = match ibox.input(text) {
        TipRequest::Debounced => {
            tokio::time::sleep(ibox.tip_controller().options().debounce).await;
            ibox.request_tips(TriggerReason::KeyedInput)
        }
        other => other,
    };
    wait_request(request).await
}

async fn wait_request(request: TipRequest) -> Option<FetchOutcome> {
    match request {
        TipRequest::Issued(handle) => Some(handle.outcome().await),
        _ => None,
    }
}

fn report_fetch(ibox: &InputBox, outcome: Option<FetchOutcome>) {
    match outcome {
        Some(FetchOutcome::Committed(_)) => print_tips(ibox),
        Some(FetchOutcome::Failed) => println!("tip fetch failed"),
        Some(FetchOutcome::Superseded) | None => {}
    }
}

fn print_tips(ibox: &InputBox) {
    match ibox.tips() {
        Some(tips) if !tips.is_empty() => {
            for (i, tip) in tips.iter().enumerate() {
                println!("  [{}] {}", i, tip.text());
            }
        }
        Some(_) => println!("  (no tips)"),
        None => println!("  (tips hidden)"),
    }
}

fn drain_events(events: &mut broadcast::Receiver<BoxEvent>) {
    loop {
        match events.try_recv() {
            Ok(BoxEvent::Change(value)) => println!("change -> {}", value),
            Ok(BoxEvent::CopyRequested(value)) => println!("copy -> {}", value),
            Ok(event) => println!("{:?}", event),
            Err(TryRecvError::Lagged(n)) => println!("({} events dropped)", n),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

/// `"ctrl+alt+k"` style key description.
fn parse_key(desc: &str) -> KeyStroke {
    let mut parts: Vec<&str> = desc.split('+').map(str::trim).collect();
    let key = parts.pop().unwrap_or_default();
    let mut stroke = KeyStroke::new(key);
    for modifier in parts {
        stroke = match modifier.to_lowercase().as_str() {
            "ctrl" | "ctl" => stroke.with_ctrl(),
            "alt" => stroke.with_alt(),
            "shift" => stroke.with_shift(),
            "meta" | "cmd" => stroke.with_meta(),
            _ => stroke,
        };
    }
    stroke
}
