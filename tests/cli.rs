use assert_cmd::Command;
use predicates::prelude::*;

fn geomcp() -> Command {
    let mut cmd = Command::cargo_bin("geomcp").unwrap();
    cmd.env_remove("GEMINI_API_KEY").env_remove("GEOMCP_TIMEOUT_SECS");
    cmd
}

#[test]
fn test_cli_help() {
    geomcp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: geomcp [OPTIONS] <COMMAND>"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--api-key <API_KEY>"))
        .stdout(predicate::str::contains("--timeout-secs <TIMEOUT_SECS>"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    geomcp()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--templates <TEMPLATES>"))
        .stdout(predicate::str::contains("--static-dir <STATIC_DIR>"));
}

#[test]
fn test_cli_no_command() {
    geomcp()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: geomcp [OPTIONS] <COMMAND>"));
}

#[test]
fn test_missing_api_key_fails_fast() {
    geomcp()
        .arg("chat")
        .write_stdin("hei\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing Gemini API key"));
}

#[test]
fn test_invalid_api_base_fails_fast() {
    geomcp()
        .args(["--api-key", "k", "--api-base", "not a url", "chat"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid Gemini API base URL"));
}

#[test]
fn test_chat_exits_cleanly_on_eof() {
    geomcp()
        .args(["--api-key", "k", "--api-base", "http://127.0.0.1:1", "chat"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("GeoMCP Assistent"));
}

#[test]
fn test_chat_unreachable_model_prints_fallback() {
    geomcp()
        .args(["--api-key", "k", "--api-base", "http://127.0.0.1:1", "chat"])
        .write_stdin("Hva er reguleringsplanen for gnr 12/34?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Beklager, det oppstod en feil. Vennligst prøv igjen."))
        .stdout(predicate::str::contains("Sluttvurdering og beslutning tas alltid av menneskelig saksbehandler."));
}
