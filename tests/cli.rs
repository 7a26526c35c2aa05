use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TOWER: &str = "2Ms1.EL0.ER0.";

fn write_plain_tower(dir: &Path) {
    let rm = "\
a\t\t 1\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 2
b\t\t -1\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t -2
c\t\t 3\t 3\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0
bad\t\t 1\t oops\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0
";
    let na = "a\t\t3 \t1 \t\nb\t\t-3 \t1 \t\nc\t\t8 \t1 \t\n";
    fs::write(dir.join(format!("{TOWER}rm.u1.all")), rm).unwrap();
    fs::write(dir.join(format!("{TOWER}rm.na.all")), na).unwrap();
}

#[test]
fn test_cli_writes_legacy_reports() {
    let temp = TempDir::new().unwrap();
    write_plain_tower(temp.path());

    Command::cargo_bin("matter-pairs")
        .unwrap()
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2Ms1.EL0.ER0.: 3 states, 2 pairs, 2 paired, 1 unpaired",
        ));

    let pairs = fs::read_to_string(temp.path().join(format!("{TOWER}vector_pairs.txt"))).unwrap();
    assert_eq!(
        pairs,
        "a:b \nb:a \n\nTotal number of pairs: 2\nNumber of paired states: 2"
    );
    let unpaired = fs::read_to_string(temp.path().join(format!("{TOWER}up_vectors.txt"))).unwrap();
    assert_eq!(unpaired, "c\n\nTotal number of unpaired states: 1");
}

#[test]
fn test_cli_parallel_and_json() {
    let temp = TempDir::new().unwrap();
    write_plain_tower(temp.path());

    Command::cargo_bin("matter-pairs")
        .unwrap()
        .arg(temp.path())
        .args(["--parallel", "--json"])
        .assert()
        .success();

    let json = fs::read_to_string(temp.path().join(format!("{TOWER}pairing_summary.json"))).unwrap();
    assert!(json.contains("\"total_pairs\": 2"));
    assert!(json.contains("\"unpaired\": 1"));
}

#[test]
fn test_cli_bracketed_layout() {
    let temp = TempDir::new().unwrap();
    let rm = "\
( 1, 1, 1) ab c  1  0  0  0  0  0  0  0  0  0  0  1
( 2, 1, 1) ab c -1  0  0  0  0  0  0  0  0  0  0 -1
";
    let na = "\
( 1, 1, 1) ab c   1   2   3   4   5
( 2, 1, 1) ab c   1   2  -3   4   5
";
    fs::write(temp.path().join(format!("{TOWER}rm.u1.all")), rm).unwrap();
    fs::write(temp.path().join(format!("{TOWER}rm.na.all")), na).unwrap();

    Command::cargo_bin("matter-pairs")
        .unwrap()
        .arg(temp.path())
        .arg("--bracketed")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 states, 2 pairs, 2 paired, 0 unpaired"));

    let pairs = fs::read_to_string(temp.path().join(format!("{TOWER}vector_pairs.txt"))).unwrap();
    assert!(pairs.starts_with("( 1, 1, 1) ab c:( 2, 1, 1) ab c \n"));
}

#[test]
fn test_cli_missing_na_file_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(format!("{TOWER}rm.u1.all")),
        "a\t\t 1\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 0\t 2\n",
    )
    .unwrap();

    Command::cargo_bin("matter-pairs")
        .unwrap()
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing RM or NA data"));
}

#[test]
fn test_cli_empty_directory_fails() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("matter-pairs")
        .unwrap()
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tower files found"));
}
