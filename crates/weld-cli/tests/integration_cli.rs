//! End-to-end tests for the `weld` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn weld() -> Command {
    let mut cmd = Command::cargo_bin("weld").unwrap();
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_lists_tasks() {
    weld()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve:build"))
        .stdout(predicate::str::contains("styles:build"))
        .stdout(predicate::str::contains("watch:build"));
}

#[test]
fn templates_task_renders_pages() {
    let temp = TempDir::new().unwrap();
    let templates = temp.path().join("src/templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(
        templates.join("index.twig"),
        r#"<link href="{{ "/src/styles/main.css" | asset }}">{{ title }}"#,
    )
    .unwrap();
    fs::write(temp.path().join("src/main.json"), r#"{ "title": "Hello" }"#).unwrap();

    weld()
        .arg("--cwd")
        .arg(temp.path())
        .arg("templates")
        .assert()
        .success();

    let html = fs::read_to_string(temp.path().join("public/index.html")).unwrap();
    assert_eq!(html, r#"<link href="/assets/main.css">Hello"#);
}

#[test]
fn config_file_moves_output() {
    let temp = TempDir::new().unwrap();
    let templates = temp.path().join("src/templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("about.twig"), "about").unwrap();
    fs::write(
        temp.path().join("weld.toml"),
        "[output]\ndir = \"dist\"\ntemplates = \"dist\"\n",
    )
    .unwrap();

    weld()
        .arg("--cwd")
        .arg(temp.path())
        .arg("templates")
        .assert()
        .success();

    assert!(temp.path().join("dist/about.html").exists());
}

#[test]
fn styles_build_writes_css() {
    let temp = TempDir::new().unwrap();
    let styles = temp.path().join("src/styles");
    fs::create_dir_all(&styles).unwrap();
    fs::write(styles.join("main.css"), "body {\n  color: #ff0000;\n}\n").unwrap();

    weld()
        .arg("--cwd")
        .arg(temp.path())
        .arg("styles:build")
        .assert()
        .success();

    let css = fs::read_to_string(temp.path().join("public/assets/main.css")).unwrap();
    assert_eq!(css, "body{color:red}");
}

#[test]
fn missing_sources_warn_and_succeed() {
    let temp = TempDir::new().unwrap();

    weld()
        .arg("--cwd")
        .arg(temp.path())
        .arg("scripts:build")
        .assert()
        .success()
        .stderr(predicate::str::contains("src/scripts not found"));
}

#[test]
fn template_error_fails() {
    let temp = TempDir::new().unwrap();
    let templates = temp.path().join("src/templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("index.twig"), "{% if %}").unwrap();

    weld()
        .arg("--cwd")
        .arg(temp.path())
        .arg("templates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("index.twig"));
}

#[test]
fn missing_project_root_fails() {
    weld()
        .args(["--cwd", "/definitely/not/a/weld/site", "templates"])
        .assert()
        .failure();
}

#[test]
fn invalid_port_is_rejected() {
    weld()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}
