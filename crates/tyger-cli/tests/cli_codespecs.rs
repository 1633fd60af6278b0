use assert_cmd::Command;
use chrono::{Duration, Utc};
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn base_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tyger"));
    cmd.env("HOME", home);
    cmd
}

fn write_context(home: &Path, server_url: &str) {
    let dir = home.join(".tyger");
    fs::create_dir_all(&dir).expect("mkdir");
    let context = json!({
        "version": 1,
        "server_uri": server_url,
        "identity": {
            "authority": format!("{server_url}/tenant"),
            "audience": "api://tyger-server",
            "client_id": "api://tyger-cli"
        },
        "mode": { "type": "device_code" },
        "token": {
            "access_token": "cached-token",
            "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
            "refresh_token": "refresh-1"
        }
    });
    fs::write(dir.join("context.json"), context.to_string()).expect("write context");
}

#[test]
fn create_codespec_requires_login() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args(["create", "codespec", "trainer", "--image", "ubuntu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn create_codespec_rejects_invalid_quantity() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args(["create", "codespec", "trainer", "--image", "ubuntu", "--cpu", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cpu value is invalid"));
}

#[test]
fn create_codespec_puts_codespec_and_prints_version() {
    let home_dir = tempdir().expect("tempdir");
    let mut server = Server::new();
    write_context(home_dir.path(), &server.url());

    let put = server
        .mock("PUT", "/v1/codespecs/trainer")
        .match_header("authorization", "Bearer cached-token")
        .match_body(Matcher::PartialJson(json!({
            "image": "ubuntu:22.04",
            "args": ["python", "train.py"],
            "env": { "MODE": "fast" },
            "buffers": { "inputs": ["in1", "in2"], "outputs": ["out"] },
            "resources": { "gpu": "1" }
        })))
        .with_status(201)
        .with_header(
            "location",
            &format!("{}/v1/codespecs/trainer/versions/4", server.url()),
        )
        .with_body("{}")
        .expect(1)
        .create();

    base_cmd(home_dir.path())
        .args([
            "--insecure",
            "create",
            "codespec",
            "trainer",
            "--image",
            "ubuntu:22.04",
            "-i",
            "in1,in2",
            "-o",
            "out",
            "-e",
            "MODE=fast",
            "--gpu",
            "1",
            "--",
            "python",
            "train.py",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("4\n"));
    put.assert();
}

#[test]
fn create_codespec_reports_server_errors() {
    let home_dir = tempdir().expect("tempdir");
    let mut server = Server::new();
    write_context(home_dir.path(), &server.url());

    server
        .mock("PUT", "/v1/codespecs/trainer")
        .with_status(400)
        .with_body("bad codespec")
        .create();

    base_cmd(home_dir.path())
        .args(["--insecure", "create", "codespec", "trainer", "--image", "ubuntu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad codespec"));
}
