//! Seed actions driven end to end with a stand-in database client

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DB_CONFIG: &str = r#"
config::db.user["admin"]
config::db.name["app"]
config::db.password["secret"]
"#;

#[allow(deprecated)]
fn slop_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("slop").unwrap();
    cmd.current_dir(dir.path());
    for var in ["DB_USER", "DB_NAME", "DB_PASSWORD", "DB_HOST", "DB_PORT"] {
        cmd.env_remove(var);
    }
    cmd
}

fn setup(slopfile: &str, seeds: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Slopfile"), slopfile).unwrap();
    for seed in seeds {
        fs::write(dir.path().join(seed), "INSERT INTO users VALUES (1);\n").unwrap();
    }
    dir
}

#[test]
fn test_seed_success() {
    let dir = setup(
        &format!("{}run::seed[\"./init.sql\"]\n", DB_CONFIG),
        &["init.sql"],
    );

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 actions completed"))
        .stderr(predicate::str::contains("✓ seed ./init.sql"));
}

#[test]
fn test_seed_client_failure() {
    let dir = setup(
        &format!("{}run::seed[\"./init.sql\"]\n", DB_CONFIG),
        &["init.sql"],
    );

    slop_cmd(&dir)
        .args(["--db-client", "false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("seed: line 5: false failed"));
}

#[test]
fn test_seed_missing_file() {
    let dir = setup(&format!("{}run::seed[\"./gone.sql\"]\n", DB_CONFIG), &[]);

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist: ./gone.sql"));
}

#[test]
fn test_seed_requires_sql_file() {
    let dir = setup(
        &format!("{}run::seed[\"./users.csv\"]\n", DB_CONFIG),
        &["users.csv"],
    );

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "./users.csv needs to be a valid SQL file",
        ));
}

#[test]
fn test_task_selected_from_command_line() {
    let dir = setup(
        &format!(
            "{}run::seed[\"./missing.sql\"]\n@setup {{\nrun::seed[\"./init.sql\"]\n}}\n",
            DB_CONFIG
        ),
        &["init.sql"],
    );

    // only the task runs, so the missing top-level seed is never touched
    slop_cmd(&dir)
        .args(["--db-client", "true", "setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 actions completed"));
}

#[test]
fn test_failure_stops_remaining_actions() {
    let dir = setup(
        &format!(
            "{}run::seed[\"./a.sql\"]\nrun::seed[\"./gone.sql\"]\nrun::seed[\"./b.sql\"]\n",
            DB_CONFIG
        ),
        &["a.sql", "b.sql"],
    );

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("✓ seed ./a.sql"))
        .stderr(predicate::str::contains("seed ./b.sql").not());
}

#[test]
fn test_missing_env_vars_without_config() {
    let dir = setup("run::seed[\"./init.sql\"]\n", &["init.sql"]);

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "action seed: missing env vars: DB_USER, DB_NAME, DB_PASSWORD",
        ));
}

#[test]
fn test_credentials_from_process_env() {
    let dir = setup("run::seed[\"./init.sql\"]\n", &["init.sql"]);

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .env("DB_USER", "admin")
        .env("DB_NAME", "app")
        .env("DB_PASSWORD", "secret")
        .assert()
        .success();
}

#[test]
fn test_sourced_env_file() {
    let dir = setup(
        r#"
source::env["./.env.local"]
var::seed[$env.SLOP_TEST_SEED]
run::seed[$seed]
"#,
        &["init.sql"],
    );
    fs::write(
        dir.path().join(".env.local"),
        "DB_USER=admin\nDB_NAME=app\nDB_PASSWORD=secret\nSLOP_TEST_SEED=./init.sql\n",
    )
    .unwrap();

    slop_cmd(&dir)
        .args(["--db-client", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 actions completed"));
}

#[test]
fn test_missing_env_file() {
    let dir = setup("source::env[\"./.env.missing\"]\n", &[]);

    slop_cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1: failed to load env file"));
}

#[test]
fn test_unimplemented_action() {
    let dir = setup(&format!("{}run::migrate[\"./m\"]\n", DB_CONFIG), &[]);

    slop_cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "line 5: action not implemented: migrate",
        ));
}

#[cfg(unix)]
#[test]
fn test_seed_timeout() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup(
        &format!("{}run::seed[\"./init.sql\"]\n", DB_CONFIG),
        &["init.sql"],
    );
    let client = dir.path().join("slow-client");
    fs::write(&client, "#!/bin/sh\nexec sleep 5\n").unwrap();
    fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).unwrap();

    slop_cmd(&dir)
        .arg("--db-client")
        .arg(&client)
        .args(["--timeout", "200ms"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timed out after"));
}
