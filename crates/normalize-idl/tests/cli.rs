//! Tests for the idl2py binary.

use assert_cmd::Command;
use tempfile::TempDir;

fn idl2py(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("idl2py").unwrap();
    cmd.current_dir(dir.path()).env("XDG_CONFIG_HOME", dir.path());
    cmd
}

#[test]
fn test_writes_py_next_to_input() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("prog.pro"), "x = [1, 2, 3]\n").unwrap();

    idl2py(&dir).arg("prog.pro").assert().success();

    let code = std::fs::read_to_string(dir.path().join("prog.py")).unwrap();
    assert_eq!(code, "from numpy import *\n\nx = array([1, 2, 3])\n");
}

#[test]
fn test_stdin_to_stdout() {
    let dir = TempDir::new().unwrap();
    idl2py(&dir)
        .arg("-")
        .write_stdin("y = x^2\n")
        .assert()
        .success()
        .stdout("from numpy import *\n\ny = x ** 2\n");
}

#[test]
fn test_check_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("jump.pro"), "goto, done\n").unwrap();

    let output = idl2py(&dir)
        .args(["--check", "jump.pro"])
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("jump.pro:1: conversion error: cannot convert GOTO statements"));
    assert!(!dir.path().join("jump.py").exists());
}

#[test]
fn test_project_config_is_discovered() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("idl2py.toml"), "array_module = \"cupy\"\n").unwrap();
    std::fs::write(dir.path().join("prog.pro"), "x = 1\n").unwrap();

    idl2py(&dir)
        .args(["prog.pro", "-o", "out.py"])
        .assert()
        .success();

    let code = std::fs::read_to_string(dir.path().join("out.py")).unwrap();
    assert_eq!(code, "from cupy import *\n\nx = 1\n");
}

#[test]
fn test_output_requires_single_input() {
    let dir = TempDir::new().unwrap();
    idl2py(&dir)
        .args(["a.pro", "b.pro", "-o", "out.py"])
        .assert()
        .failure();
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    idl2py(&dir).arg("missing.pro").assert().failure();
}
