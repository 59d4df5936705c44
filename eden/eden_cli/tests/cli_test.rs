use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("eden.json");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

fn location(dir: &TempDir) -> String {
    dir.path().to_string_lossy().replace('\\', "/")
}

fn eden() -> Command {
    let mut cmd = Command::cargo_bin("eden").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_stages_lists_boot_order() {
    let output = eden().arg("stages").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let stages: Vec<&str> = stdout
        .lines()
        .filter_map(|l| l.split_whitespace().nth(1))
        .collect();

    assert_eq!(stages.len(), 12);
    assert_eq!(stages.first(), Some(&"os-startup"));
    assert_eq!(stages[4], "user-config-loaded");
    assert_eq!(stages.last(), Some(&"os-boot-finished"));
}

#[test]
fn test_validate_accepts_good_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"{{
                "bootstrap": {{ "location": "{}", "version": "4.1.0" }},
                "hooks": {{ "os-init": ["eden://builtin/system-report"] }}
            }}"#,
            location(&dir)
        ),
    );

    eden()
        .args(["validate", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("hooks:    1"));
}

#[test]
fn test_validate_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"{ "dispatcher": { "max_concurrent_hooks": 0 } }"#,
    );

    eden()
        .args(["validate", "--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrent_hooks"));

    let missing = dir.path().join("missing.json");
    eden()
        .args(["validate", "--config", &missing.to_string_lossy()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_boot_with_allow_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"{{
                "bootstrap": {{ "location": "{}", "version": "4.1.0" }},
                "permissions": {{ "store": "decisions.json" }},
                "hooks": {{ "os-init": ["eden://builtin/system-report"] }}
            }}"#,
            location(&dir)
        ),
    );

    eden()
        .args(["boot", "--config", &config, "--allow-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("os-boot-finished"))
        .stdout(predicate::str::contains("succeeded eden://builtin/system-report"));

    assert!(Path::new(&dir.path().join("decisions.json")).exists());

    eden()
        .args(["check-permission", "--config", &config, "query-system-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("query-system-info granted"));
}

#[test]
fn test_boot_halts_on_gating_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"{{
                "bootstrap": {{ "location": "{}", "version": "4.1.0" }},
                "dispatcher": {{ "gating_stages": ["os-init"] }},
                "permissions": {{ "deny": [{{ "name": "query-system-info" }}] }},
                "hooks": {{ "os-init": ["eden://builtin/system-report"] }}
            }}"#,
            location(&dir)
        ),
    );

    eden()
        .args(["boot", "--config", &config, "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"state\": \"os-init\""))
        .stderr(predicate::str::contains("gating stage os-init"));
}

#[test]
fn test_check_permission_uses_configured_decisions() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"{{
                "bootstrap": {{ "location": "{}", "version": "4.1.0" }},
                "permissions": {{
                    "allow": [{{ "name": "read", "path": "/opt/eden" }}],
                    "deny": [{{ "name": "net" }}]
                }}
            }}"#,
            location(&dir)
        ),
    );

    eden()
        .args(["check-permission", "--config", &config, "read:/opt/eden/packages/a.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("read(/opt/eden/packages/a.txt) granted"));

    eden()
        .args(["check-permission", "--config", &config, r#"{"name":"net","host":"example.org"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied"));

    eden()
        .args(["check-permission", "--config", &config, "log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("log prompt"));
}
