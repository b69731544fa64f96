//! CLI integration tests using `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn maiter_cmd() -> Command {
    Command::cargo_bin("maiter").unwrap()
}

#[test]
fn help_displays_usage() {
    maiter_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Maiter-style"));
}

#[test]
fn list_kernels_prints_all_builtins_sorted() {
    maiter_cmd()
        .arg("list-kernels")
        .assert()
        .success()
        .stdout(predicate::str::contains("pagerank"))
        .stdout(predicate::str::contains("sssp"))
        .stdout(predicate::str::contains("katz"));
}

#[test]
fn run_unknown_kernel_fails_with_unknown_kernel_error() {
    let graph_dir = TempDir::new().unwrap();
    let result_dir = TempDir::new().unwrap();
    let mut f = fs::File::create(graph_dir.path().join("part0")).unwrap();
    writeln!(f, "0\t1").unwrap();
    drop(f);

    maiter_cmd()
        .arg("run")
        .arg("--kernel")
        .arg("not-a-real-kernel")
        .arg("--graph-dir")
        .arg(graph_dir.path())
        .arg("--result-dir")
        .arg(result_dir.path())
        .arg("--shard")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAITER-008"));
}

#[test]
fn run_pagerank_on_a_ring_writes_result_files() {
    let graph_dir = TempDir::new().unwrap();
    let result_dir = TempDir::new().unwrap();
    let mut f = fs::File::create(graph_dir.path().join("part0")).unwrap();
    writeln!(f, "0\t1").unwrap();
    writeln!(f, "1\t2").unwrap();
    writeln!(f, "2\t3").unwrap();
    writeln!(f, "3\t0").unwrap();
    drop(f);

    maiter_cmd()
        .arg("run")
        .arg("--kernel")
        .arg("pagerank")
        .arg("--graph-dir")
        .arg(graph_dir.path())
        .arg("--result-dir")
        .arg(result_dir.path())
        .arg("--shard")
        .arg("1")
        .arg("--term-interval-secs")
        .arg("1")
        .arg("--term-epsilon")
        .arg("0.001")
        .assert()
        .success();

    let contents = fs::read_to_string(result_dir.path().join("part-0")).unwrap();
    assert_eq!(contents.lines().count(), 4);
}
