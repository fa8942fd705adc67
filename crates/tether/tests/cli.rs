// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::process::Command;

fn tether() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tether"))
}

#[test]
fn checksum_prints_sha256() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugin");
    std::fs::write(&path, b"test").unwrap();

    let output = tether().arg("checksum").arg(&path).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    );
}

#[test]
fn checksum_of_missing_file_fails() {
    let output = tether()
        .args(["checksum", "/nonexistent/tether-plugin"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn check_accepts_builtin_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("tether.toml");
    std::fs::write(&config, "[[plugins]]\nname = \"log\"\n").unwrap();

    let output = tether()
        .arg("check")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("configuration ok: 1 plugins"));
}

#[test]
fn check_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("tether.toml");
    std::fs::write(&config, "[[plugins]]\nname = \"x\"\npath = \"/bin/x\"\n").unwrap();

    let output = tether()
        .args(["--config"])
        .arg(&config)
        .arg("check")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("has a path but no type"));
}
