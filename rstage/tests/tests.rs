use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Read;

#[test]
fn check_rstage_help() {
    let mut cmd = Command::cargo_bin("rstage").unwrap();
    cmd.arg("--help").assert().success();
}

#[test]
fn check_rstage_version() {
    let mut cmd = Command::cargo_bin("rstage").unwrap();
    cmd.arg("--version").assert().success();
}

fn setup_test_env() -> (tempfile::TempDir, tempfile::TempDir, tempfile::TempDir) {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let staging_dir = tempfile::tempdir().unwrap();
    (src_dir, dst_dir, staging_dir)
}

fn read_gzip(path: &std::path::Path) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut contents = String::new();
    flate2::read::GzDecoder::new(file)
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

#[test]
fn missing_local_exits_with_1() {
    Command::cargo_bin("rstage").unwrap().assert().code(1);
}

#[test]
fn missing_remote_exits_with_2() {
    let (src_dir, _dst_dir, _staging_dir) = setup_test_env();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg(src_dir.path())
        .assert()
        .code(2);
}

#[test]
fn transfers_and_compresses_logs() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    std::fs::write(src_dir.path().join("app.log"), "hello").unwrap();
    std::fs::create_dir(src_dir.path().join("nested")).unwrap();
    std::fs::write(src_dir.path().join("nested/worker.log"), "worker").unwrap();
    std::fs::write(src_dir.path().join("notes.txt"), "ignored").unwrap();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path())
        .arg(dst_dir.path())
        .assert()
        .success()
        // staging listing is printed before removal
        .stdout(predicate::str::contains("app.log.gz"))
        .stdout(predicate::str::contains("nested/worker.log.gz"));
    assert_eq!(read_gzip(&dst_dir.path().join("app.log.gz")), "hello");
    assert_eq!(
        read_gzip(&dst_dir.path().join("nested/worker.log.gz")),
        "worker"
    );
    assert!(!dst_dir.path().join("notes.txt.gz").exists());
    assert!(!dst_dir.path().join("notes.txt").exists());
    assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
}

#[test]
fn links_and_targets_are_not_transferred() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    std::fs::write(src_dir.path().join("current.20240101.log"), "current").unwrap();
    std::os::unix::fs::symlink(
        "current.20240101.log",
        src_dir.path().join("current.log"),
    )
    .unwrap();
    std::fs::write(src_dir.path().join("other.log"), "other").unwrap();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path())
        .arg(dst_dir.path())
        .assert()
        .success();
    let mut delivered: Vec<String> = std::fs::read_dir(dst_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    delivered.sort();
    assert_eq!(delivered, vec!["other.log.gz"]);
}

#[test]
fn summary_is_printed_on_request() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    std::fs::write(src_dir.path().join("app.log"), "hello").unwrap();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--summary")
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path())
        .arg(dst_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files compressed: 1"));
}

#[test]
fn missing_local_directory_fails() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path().join("missing"))
        .arg(dst_dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not exist"));
    assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
}

#[test]
fn quiet_suppresses_errors() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--quiet")
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path().join("missing"))
        .arg(dst_dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::is_empty());
}

#[test]
fn remote_failure_cleans_up_staging() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    std::fs::write(src_dir.path().join("app.log"), "hello").unwrap();
    let blocker = dst_dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--staging-dir")
        .arg(staging_dir.path())
        .arg(src_dir.path())
        .arg(blocker.join("remote"))
        .assert()
        .code(3);
    assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let (src_dir, dst_dir, _staging_dir) = setup_test_env();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg("--bogus")
        .arg(src_dir.path())
        .arg(dst_dir.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--bogus"));
}

#[test]
fn extra_positional_is_a_usage_error() {
    let (src_dir, dst_dir, staging_dir) = setup_test_env();
    Command::cargo_bin("rstage")
        .unwrap()
        .arg(src_dir.path())
        .arg(dst_dir.path())
        .arg(staging_dir.path())
        .assert()
        .code(4);
}
