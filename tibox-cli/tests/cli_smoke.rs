//! Smoke tests running the `tibox` binary against a temp config

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
[dicts.Letters]
items = [
    { value = "a", text = "Alpha" },
    { value = "b", text = "Beta" },
    { value = "g", text = "Gamma" },
]

[boxes.shout]
trimed = true
valueCase = "upper"

[boxes.letter]
options = "Letters"
mustInOptions = true
tipShowTime = "keyin"
"#;

fn setup() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, CONFIG).unwrap();
    (temp_dir, path)
}

fn tibox(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tibox").unwrap();
    cmd.arg("--config").arg(config).env("HOME", config.parent().unwrap());
    cmd
}

#[test]
fn test_tidy_trims_and_uppercases() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["tidy", "shout", "  hello  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"HELLO\""));
}

#[test]
fn test_tidy_dict_stage_rejects_unknown() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["tidy", "letter", "z", "--stages", "dict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn test_translate_uses_dictionary() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["translate", "letter", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Beta"));
}

#[test]
fn test_tips_filter_by_hint() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["tips", "letter", "amm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gamma").and(predicate::str::contains("Beta").not()));
}

#[test]
fn test_dicts_lists_names() {
    let (_dir, config) = setup();
    tibox(&config)
        .arg("dicts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Letters"));
}

#[test]
fn test_unknown_box_fails() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["tidy", "nope", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no box named"));
}

#[test]
fn test_repl_session() {
    let (_dir, config) = setup();
    tibox(&config)
        .args(["repl", "letter"])
        .write_stdin(":focus\nbet\n:pick 0\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] Beta").and(predicate::str::contains("change -> \"b\"")));
}
