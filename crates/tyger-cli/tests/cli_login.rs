use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CERTIFICATE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tyger-auth/tests/fixtures/principal.pem"
);

fn base_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tyger"));
    cmd.env("HOME", home).env_remove("TYGER_LOGIN_TIMEOUT");
    cmd
}

fn context_path(home: &Path) -> std::path::PathBuf {
    home.join(".tyger").join("context.json")
}

#[test]
fn help_lists_commands() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn status_without_login_reports_not_logged_in() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args(["login", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn service_principal_requires_certificate() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args(["login", "https://tyger.example.com", "-s", "api://sp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--service-principal and --cert must be specified together",
        ));
    assert!(!context_path(home_dir.path()).exists());
}

#[test]
fn device_code_conflicts_with_service_principal() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args([
            "login",
            "https://tyger.example.com",
            "-s",
            "api://sp",
            "-c",
            CERTIFICATE,
            "-d",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--use-device-code cannot be used with --service-principal",
        ));
}

#[test]
fn http_server_requires_insecure_flag() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .args(["login", "http://127.0.0.1:9", "-s", "api://sp", "-c", CERTIFICATE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--insecure"));
}

#[test]
fn logout_without_login_succeeds() {
    let home_dir = tempdir().expect("tempdir");
    base_cmd(home_dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));
}

#[test]
fn corrupt_context_fails_status() {
    let home_dir = tempdir().expect("tempdir");
    let path = context_path(home_dir.path());
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, "{ not json").expect("write");

    base_cmd(home_dir.path())
        .args(["login", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));
    assert!(path.exists());
}

#[test]
fn service_principal_login_then_status_and_logout() {
    let home_dir = tempdir().expect("tempdir");
    let mut server = Server::new();
    server
        .mock("GET", "/v1/metadata")
        .with_status(200)
        .with_body(
            json!({
                "authority": format!("{}/tenant", server.url()),
                "audience": "api://tyger-server",
                "cliAppUri": "api://tyger-cli"
            })
            .to_string(),
        )
        .create();
    let token = server
        .mock("POST", "/tenant/oauth2/v2.0/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".to_string(),
            "client_credentials".to_string(),
        ))
        .with_status(200)
        .with_body(json!({ "access_token": "sp-access", "expires_in": 3599 }).to_string())
        .expect(1)
        .create();

    base_cmd(home_dir.path())
        .args([
            "--insecure",
            "login",
            &server.url(),
            "--service-principal",
            "api://sp",
            "--cert",
            CERTIFICATE,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("as api://sp"));
    token.assert();

    let saved = fs::read_to_string(context_path(home_dir.path())).expect("context");
    assert!(saved.contains("sp-access"));

    base_cmd(home_dir.path())
        .args(["login", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Login:     service principal"))
        .stdout(predicate::str::contains("Principal: api://sp"))
        .stdout(predicate::str::contains("Token:     valid"));

    base_cmd(home_dir.path()).arg("logout").assert().success();
    assert!(!context_path(home_dir.path()).exists());
}
