mod support;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use support::write_scene;

#[test]
fn help_and_version_succeed() {
    cargo_bin_cmd!("tracer-cli")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--shadingsys"))
        .stdout(predicate::str::contains("Devices to use: CPU"));

    cargo_bin_cmd!("tracer-cli")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_scene_prints_usage() {
    cargo_bin_cmd!("tracer-cli")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: tracer-cli [options] <scene-file>"));
}

#[test]
fn list_devices() {
    cargo_bin_cmd!("tracer-cli")
        .arg("--list-devices")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Devices:\n    CPU       Host CPU"));
}

#[test]
fn bad_arguments_fail() {
    cargo_bin_cmd!("tracer-cli")
        .args(["--no-such-flag", "scene.json"])
        .assert()
        .code(1);
}

#[test]
fn validation_errors_exit_with_one() {
    cargo_bin_cmd!("tracer-cli")
        .args(["--samples", "-1", "scene.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid number of samples: -1"));

    cargo_bin_cmd!("tracer-cli")
        .args(["--device", "CUDA", "scene.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown device: CUDA"));

    cargo_bin_cmd!("tracer-cli")
        .args(["--shadingsys", "glsl", "scene.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown shading system: glsl"));
}

#[test]
fn missing_scene_file_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("tracer-cli")
        .arg(dir.path().join("nothing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load scene"));
}

#[test]
fn quiet_render_writes_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = write_scene(dir.path());
    let output = dir.path().join("out.png");

    cargo_bin_cmd!("tracer-cli")
        .args(["--quiet", "--samples", "1", "--threads", "2", "--width", "12", "--height", "6", "--output"])
        .arg(&output)
        .arg(&scene)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(output.exists());
}

#[test]
fn failed_render_exits_with_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = write_scene(dir.path());

    cargo_bin_cmd!("tracer-cli")
        .args(["--quiet", "--samples", "1", "--width", "4", "--height", "4", "--output"])
        .arg(dir.path().join("missing").join("out.png"))
        .arg(&scene)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Render failed"));
}

#[test]
fn progress_is_printed_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scene = write_scene(dir.path());

    cargo_bin_cmd!("tracer-cli")
        .args(["--samples", "1", "--tile-size", "4", "--width", "0", "--height", "0"])
        .arg(&scene)
        .assert()
        .success()
        .stdout(predicate::str::contains("\rProgress"))
        .stdout(predicate::str::contains("\rFinished Rendering."))
        .stdout(predicate::str::ends_with("\n"));
}
