//! haptic-host 命令行端到端测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn host() -> Command {
    let mut cmd = Command::cargo_bin("haptic-host").unwrap();
    // 隔离用户配置目录
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("haptic-host-tests"));
    cmd.env("RUST_LOG", "haptic_host=info,haptic_runtime=info");
    cmd.timeout(std::time::Duration::from_secs(20));
    cmd
}

#[test]
fn test_help_lists_options() {
    host()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--require-device"))
        .stdout(predicate::str::contains("--device"));
}

#[test]
fn test_visual_only_quits_with_zero() {
    host()
        .args(["--device", "none"])
        .write_stdin("q\n")
        .assert()
        .code(0);
}

#[test]
fn test_simulated_device_quits_with_zero() {
    host()
        .args(["--device", "sim", "--width", "800", "--height", "600"])
        .write_stdin("fq\n")
        .assert()
        .code(0);
}

#[test]
fn test_port_held_degrades_and_quits_with_zero() {
    host()
        .args(["--device", "sim-busy"])
        .write_stdin("q\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Another process holds the device port"));
}

#[test]
fn test_required_device_missing_exits_one() {
    host()
        .args(["--device", "none", "--require-device"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_config_file_exits_one() {
    host()
        .args(["--config", "/nonexistent/haptic-host.toml"])
        .assert()
        .code(1);
}

#[test]
fn test_config_file_require_device() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "require_device = true").unwrap();

    host()
        .args(["--device", "sim-broken", "--config"])
        .arg(file.path())
        .assert()
        .code(1);
}

#[test]
fn test_invalid_device_backend_rejected() {
    host().args(["--device", "usb"]).assert().failure();
}
