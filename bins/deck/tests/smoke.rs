use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deck(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deck").unwrap();
    cmd.arg("--data-dir").arg(dir.path().join("data"));
    cmd
}

fn added_id(dir: &TempDir, args: &[&str]) -> String {
    let out = deck(dir).arg("add").args(args).output().unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

#[test]
fn fresh_store_lists_demo_scripts() {
    let dir = TempDir::new().unwrap();
    deck(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("File Organizer")
                .and(predicate::str::contains("Data Cleaner")),
        );
}

#[test]
fn run_walks_back_to_idle() {
    let dir = TempDir::new().unwrap();
    let id = added_id(&dir, &["--name", "Backup Job", "--type", "backup"]);

    deck(&dir)
        .args(["--run-ms", "20", "--settle-ms", "20", "run", &id])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Script 'Backup Job' started execution.")
                .and(predicate::str::contains("completed"))
                .and(predicate::str::contains("idle")),
        );

    deck(&dir)
        .args(["--json", "show", &id])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"status\": \"idle\"")
                .and(predicate::str::contains("\"lastRun\": \"")),
        );

    deck(&dir)
        .args(["logs", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("info").and(predicate::str::contains("success")));
}

#[test]
fn unknown_id_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    deck(&dir)
        .args(["show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("script nope not found"));
}

#[test]
fn schedule_is_stored_as_data() {
    let dir = TempDir::new().unwrap();
    deck(&dir)
        .args([
            "schedule",
            "1",
            "--frequency",
            "weekly",
            "--time",
            "09:30",
            "--day",
            "mon",
            "--day",
            "fri",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("weekly on Monday, Friday at 09:30"));

    deck(&dir)
        .args(["--json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scheduled\": 1"));

    deck(&dir)
        .args(["--json", "list", "--status", "idle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cronExpression\"").not());
}

#[test]
fn export_import_and_delete() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let id = added_id(&dir, &["--name", "My Weekly  Report", "--code", "print('hi')"]);

    deck(&dir)
        .args(["export", &id, "--out"])
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("my-weekly-report.json"));

    let file = out_dir.join("my-weekly-report.json");
    let imported = deck(&dir).arg("import").arg(&file).output().unwrap();
    assert!(imported.status.success());
    let new_id = String::from_utf8(imported.stdout).unwrap().trim().to_string();
    assert_ne!(new_id, id);

    deck(&dir).args(["delete", &id]).assert().success();
    deck(&dir).args(["delete", &id]).assert().failure();
    deck(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("My Weekly  Report"));
}

#[test]
fn template_gallery() {
    let dir = TempDir::new().unwrap();
    deck(&dir)
        .arg("templates")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("template3").and(predicate::str::contains("System Backup")),
        );
    deck(&dir).args(["use-template", "template3"]).assert().success();
    deck(&dir)
        .args(["--json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 3"));
}

#[test]
fn schedule_on_unknown_id_prints_no_schedule() {
    let dir = TempDir::new().unwrap();
    deck(&dir)
        .args(["schedule", "nope", "--frequency", "daily", "--time", "08:00"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("script nope not found"));
}

#[test]
fn reset_restores_demo_scripts() {
    let dir = TempDir::new().unwrap();
    added_id(&dir, &["--name", "Throwaway"]);
    deck(&dir).args(["--run-ms", "10", "--settle-ms", "10", "run", "1"]).assert().success();

    deck(&dir).arg("reset").assert().failure().stderr(predicate::str::contains("--yes"));
    deck(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Throwaway"));

    deck(&dir)
        .args(["reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored 2 demo scripts"));
    deck(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("File Organizer")
                .and(predicate::str::contains("Data Cleaner"))
                .and(predicate::str::contains("Throwaway").not()),
        );
    deck(&dir)
        .args(["logs", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no log entries"));
}
