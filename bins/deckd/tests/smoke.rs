use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn prints_help() {
    Command::cargo_bin("deckd").unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--data-dir"));
}
