//! CLI integration tests for the scoring-api binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("scoring-api"))
}

// Helper to create a temp payload file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod schema_command {
    use super::*;

    #[test]
    fn prints_arguments_schema() {
        cmd()
            .args(["schema", "clients_interests"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""title":"ClientsInterestsRequest""#))
            .stdout(predicate::str::contains(r#""required":["client_ids"]"#));
    }

    #[test]
    fn prints_envelope_schema() {
        cmd()
            .args(["schema", "method"])
            .assert()
            .success()
            .stdout(predicate::str::contains("MethodRequest"));
    }

    #[test]
    fn pretty_output() {
        cmd()
            .args(["schema", "online_score", "--pretty"])
            .assert()
            .success()
            // Pretty output has newlines and indentation
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn unknown_schema() {
        cmd()
            .args(["schema", "nope"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown schema"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_score_arguments() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(
            &dir,
            "args.json",
            r#"{"phone": "79175002040", "email": "a@b.ru"}"#,
        );

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--method", "online_score"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"))
            .stdout(predicate::str::contains("email, phone"));
    }

    #[test]
    fn invalid_score_arguments() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "args.json", r#"{"phone": "79175002040"}"#);

        cmd()
            .args(["validate", payload.to_str().unwrap(), "-m", "online_score"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("OnlineScoreRequest"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "args.json", r#"{"client_ids": [1, "2"]}"#);

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                "--method",
                "clients_interests",
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""field":"client_ids""#));
    }

    #[test]
    fn json_output_valid() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "args.json", r#"{"client_ids": [1, 2]}"#);

        cmd()
            .args([
                "validate",
                payload.to_str().unwrap(),
                "--method",
                "clients_interests",
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"valid":true,"has":["client_ids"]}"#));
    }

    #[test]
    fn malformed_json() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "args.json", "{not json");

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--method", "online_score"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn missing_file() {
        cmd()
            .args(["validate", "/nonexistent/args.json", "--method", "online_score"])
            .assert()
            .code(3);
    }

    #[test]
    fn unknown_method() {
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "args.json", "{}");

        cmd()
            .args(["validate", payload.to_str().unwrap(), "--method", "get_score"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown method"));
    }
}

mod token_command {
    use super::*;

    #[test]
    fn user_token() {
        // sha512("horns&hoofs" + "h&f" + salt) is stable across runs.
        let first = cmd()
            .args(["token", "--login", "h&f", "--account", "horns&hoofs"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let token = String::from_utf8(first).unwrap();
        assert_eq!(token.trim().len(), 128);
        assert!(token.trim().chars().all(|c| c.is_ascii_hexdigit()));

        cmd()
            .args(["token", "--login", "h&f", "--account", "horns&hoofs"])
            .assert()
            .success()
            .stdout(predicate::str::diff(token));
    }

    #[test]
    fn login_is_required() {
        cmd().args(["token"]).assert().failure();
    }
}
