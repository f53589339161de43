use std::fs;

mod common;

use common::{Fixture, DESCRIPTION};

#[test]
fn version_and_help() {
    let fixture = Fixture::new();
    fixture.cmd().arg("--version").assert().success();

    let output = fixture.cmd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("hwrevision"));
}

#[test]
fn info_describes_image() {
    let fixture = Fixture::new();
    let image = fixture.image();

    let output = fixture.cmd().arg("info").arg(&image).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Version:      1.2.3"));
    assert!(stdout.contains("rootfs.ext4 -> /dev/mmcblk0p1"));
    assert!(stdout.contains("Signed:       no"));
}

#[test]
fn info_json_follows_selection() {
    let fixture = Fixture::new();
    let image = fixture.image();

    let output = fixture
        .cmd()
        .args(["info", "--json", "--board", "myboard"])
        .args(["--software-set", "stable", "--running-mode", "copy1"])
        .arg(&image)
        .output()
        .unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["signed"], false);
    assert_eq!(info["description"]["version"], "1.2.3");
    assert_eq!(
        info["description"]["root_path"],
        serde_json::json!(["software", "myboard", "stable", "copy1"])
    );
    assert_eq!(
        info["description"]["images"][0]["device"],
        "/dev/mmcblk0p2"
    );
    assert_eq!(info["entries"].as_array().unwrap().len(), 2);
}

#[test]
fn info_reads_bare_description() {
    let fixture = Fixture::new();
    let path = fixture.path("sw-description");
    fs::write(&path, DESCRIPTION).unwrap();

    let output = fixture.cmd().arg("info").arg(&path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Smoke test image"));
    assert!(!stdout.contains("Signed:"));
}

#[test]
fn check_reports_missing_artifact() {
    let fixture = Fixture::new();
    let image = fixture.image();

    let output = fixture.cmd().arg("check").arg(&image).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kernel is referenced but not in the image"));
}

#[test]
fn check_selected_board_and_revision() {
    let fixture = Fixture::new();
    let image = fixture.image();
    let check = |revision: &str| {
        fixture
            .cmd()
            .args(["check", "--board", "myboard", "--revision", revision])
            .args(["--software-set", "stable", "--running-mode", "copy1"])
            .arg(&image)
            .output()
            .unwrap()
    };

    let ok = check("2.1");
    assert!(ok.status.success(), "{}", String::from_utf8_lossy(&ok.stdout));
    assert!(String::from_utf8_lossy(&ok.stdout).contains("Image is valid"));

    let bad = check("3.0");
    assert_eq!(bad.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad.stdout).contains("revision 3.0"));
}

#[test]
fn selection_flags_must_come_together() {
    let fixture = Fixture::new();
    let image = fixture.image();

    fixture
        .cmd()
        .args(["info", "--software-set", "stable"])
        .arg(&image)
        .assert()
        .failure();
}

#[test]
fn install_without_daemon_fails() {
    let fixture = Fixture::new();
    let image = fixture.image();

    let output = fixture
        .cmd()
        .arg("--socket")
        .arg(fixture.path("absent.sock"))
        .args(["install", "--retries", "1"])
        .arg(&image)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot reach the update daemon"));
}

#[test]
fn swu_name_is_read_as_archive() {
    let fixture = Fixture::new();
    let path = fixture.path("broken.swu");
    fs::write(&path, DESCRIPTION).unwrap();

    let output = fixture.cmd().arg("info").arg(&path).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"), "{}", stderr);
    assert!(!stderr.contains("Invalid sw-description"));
}
