use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tubedigest(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tubedigest").unwrap();
    cmd.env("TUBEDIGEST_CONFIG", dir.path().join("config.yaml"))
        .env("TUBEDIGEST_KEYS_FILE", dir.path().join("keys.json"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("TUBEDIGEST_NEW_KEY")
        .env_remove("RUST_LOG")
        .arg("--quiet");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    tubedigest(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("keys"));
}

#[test]
fn test_keys_roundtrip() {
    let dir = TempDir::new().unwrap();

    tubedigest(&dir)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No Supadata API keys added yet."));

    tubedigest(&dir)
        .args(["keys", "add", "sd_first_key_123456", "--name", "primary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("primary (sd_f...3456)"));

    tubedigest(&dir)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("primary (sd_f...3456)"))
        .stdout(predicate::str::contains("sd_first_key_123456").not());

    assert!(dir.path().join("keys.json").exists());
    assert!(dir.path().join("config.yaml").exists());
}

#[test]
fn test_keys_add_reads_stdin() {
    let dir = TempDir::new().unwrap();

    tubedigest(&dir)
        .args(["keys", "add", "--name", "piped"])
        .write_stdin("sd_piped_key_987654\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("piped (sd_p...7654)"));

    tubedigest(&dir)
        .args(["keys", "add"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key given"));
}

#[test]
fn test_keys_add_reads_env() {
    let dir = TempDir::new().unwrap();

    tubedigest(&dir)
        .args(["keys", "add"])
        .env("TUBEDIGEST_NEW_KEY", "sd_env_key_555555")
        .assert()
        .success()
        .stdout(predicate::str::contains("sd_e...5555"));

    tubedigest(&dir)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sd_e...5555"));
}

#[test]
fn test_remove_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    tubedigest(&dir)
        .args(["keys", "remove", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key with id does-not-exist"));
}

#[test]
fn test_transcript_without_keys_points_to_configuration() {
    let dir = TempDir::new().unwrap();
    tubedigest(&dir)
        .args(["transcript", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no transcript API keys configured"))
        .stderr(predicate::str::contains("tubedigest keys"));
}

#[test]
fn test_summarize_without_gemini_key_fails() {
    let dir = TempDir::new().unwrap();
    tubedigest(&dir)
        .args(["summarize", "https://youtu.be/dQw4w9WgXcQ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_actions_lists_builtins() {
    let dir = TempDir::new().unwrap();
    tubedigest(&dir)
        .arg("actions")
        .assert()
        .success()
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("(default)"))
        .stdout(predicate::str::contains("highlights"));
}
