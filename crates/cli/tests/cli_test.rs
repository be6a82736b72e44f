//! Basic CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecated for custom build-dir; still works for default

use assert_cmd::Command;
use std::path::Path;

fn notegen(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("notegen").unwrap();
    cmd.arg("--config").arg(config_dir.join("config.toml"));
    cmd
}

fn stdout_of(out: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(out.get_output().stdout.clone()).unwrap()
}

#[test]
fn help_prints_and_exits_success() {
    Command::cargo_bin("notegen")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn config_show_json_valid() {
    let dir = tempfile::tempdir().unwrap();
    let out = notegen(dir.path()).args(["config", "show", "--json"]).assert().success();
    let value: serde_json::Value =
        serde_json::from_str(&stdout_of(&out)).expect("config show --json should output valid JSON");
    assert_eq!(value["datetime"]["date_format"], "YYYY-MM-DD");
}

#[test]
fn config_init_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    notegen(dir.path()).args(["config", "init"]).assert().success();
    let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(written.contains("[datetime]"));
}

#[test]
fn new_creates_next_chapter() {
    let config = tempfile::tempdir().unwrap();
    let vault = tempfile::tempdir().unwrap();
    std::fs::create_dir(vault.path().join("Book")).unwrap();
    std::fs::write(vault.path().join("Book/Chapter 1 - Intro.md"), "").unwrap();
    std::fs::write(vault.path().join("Book/Chapter 2 - Setup.md"), "").unwrap();

    let out = notegen(config.path())
        .args(["new", "--pattern", "Chapter {{counter}} - {% Title %}", "--folder", "Book"])
        .arg("--vault")
        .arg(vault.path())
        .args(["--set", "Title=New Section", "--json"])
        .assert()
        .success();
    let created: serde_json::Value = serde_json::from_str(&stdout_of(&out)).unwrap();
    assert_eq!(created["path"], "Book/Chapter 3 - New Section.md");
    assert_eq!(created["counter"], 3);
    assert!(vault.path().join("Book/Chapter 3 - New Section.md").is_file());
}

#[test]
fn new_rejects_invalid_value() {
    let config = tempfile::tempdir().unwrap();
    let vault = tempfile::tempdir().unwrap();
    let out = notegen(config.path())
        .args(["new", "--pattern", "{% Pages:number %}", "--set", "pages=lots"])
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Pages must be a number"));
}

#[test]
fn preview_marks_unfilled_prompts() {
    let config = tempfile::tempdir().unwrap();
    let out = notegen(config.path())
        .args(["preview", "--pattern", "Chapter {{counter}} - {% Title %}"])
        .assert()
        .success();
    assert_eq!(stdout_of(&out).trim(), "Chapter # - [Title]");
}

#[test]
fn next_counter_scans_vault() {
    let config = tempfile::tempdir().unwrap();
    let vault = tempfile::tempdir().unwrap();
    for n in [1, 5, 10] {
        std::fs::write(vault.path().join(format!("Log {}.md", n)), "").unwrap();
    }
    let out = notegen(config.path())
        .args(["next-counter", "--pattern", "Log {{counter}}"])
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .success();
    assert_eq!(stdout_of(&out).trim(), "11");
}

#[test]
fn prompts_lists_configured_template() {
    let config = tempfile::tempdir().unwrap();
    std::fs::write(
        config.path().join("config.toml"),
        r#"
[[templates]]
name = "Meeting"
title_pattern = "{{date}} {% Topic %} {%? Room:list:A,B ?%}"
"#,
    )
    .unwrap();
    let out = notegen(config.path()).args(["prompts", "meeting"]).assert().success();
    let stdout = stdout_of(&out);
    assert!(stdout.contains("Topic (text)"));
    assert!(stdout.contains("Room (list, optional)  {%? Room:list:A,B ?%}"));
}

#[test]
fn complete_lists_types_json() {
    let config = tempfile::tempdir().unwrap();
    let out = notegen(config.path())
        .args(["complete", "{% Due:dat", "--json"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_str(&stdout_of(&out)).unwrap();
    assert_eq!(value["context"]["stage"], "type");
    let labels: Vec<_> = value["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["date", "datetime"]);
}

#[test]
fn highlight_prints_ranges() {
    let config = tempfile::tempdir().unwrap();
    let out = notegen(config.path())
        .args(["highlight", "{{year}}"])
        .assert()
        .success();
    let stdout = stdout_of(&out);
    assert!(stdout.contains("variable-name"));
    assert!(stdout.contains("year"));
}

#[test]
fn unknown_template_fails() {
    let config = tempfile::tempdir().unwrap();
    notegen(config.path()).args(["new", "nope"]).assert().failure();
}
