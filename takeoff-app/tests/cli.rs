use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const FLOOR_PLAN: &str = include_str!("data/sample.dxf");

fn write_config(root: &Path) -> std::path::PathBuf {
    let config = root.join("takeoff.toml");
    fs::write(
        &config,
        format!(
            "[logging]\nlevel = \"warn\"\n\n[paths]\ninput_dir = '{}'\noutput_dir = '{}'\nproject = \"sample\"\n\n[tools]\ninkscape = \"takeoff-missing-inkscape\"\ntimeout_secs = 5\n",
            root.join("data").display(),
            root.join("extracted_data").display(),
        ),
    )
    .expect("write config");
    config
}

#[test]
fn dxf_only_input_runs_end_to_end() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(dir.path().join("data")).expect("input dir");
    fs::write(dir.path().join("data").join("sample.dxf"), FLOOR_PLAN).expect("seed dxf");
    let config = write_config(dir.path());

    Command::cargo_bin("takeoff")
        .expect("binary built")
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("cad").and(predicate::str::contains("report")));

    let output = dir.path().join("extracted_data");
    for name in [
        "sample_room_data.csv",
        "sample_cad_area.csv",
        "sample_room_area.csv",
        "sample_material_data.csv",
        "sample_material_estimation.csv",
        "sample_roomwise_material_estimation.csv",
        "sample_room_material_estimation.csv",
        "final_project_report.csv",
        "final_project_report.xlsx",
    ] {
        assert!(output.join(name).is_file(), "{name} 缺失");
    }
    let rooms = fs::read_to_string(output.join("sample_room_area.csv")).expect("room area");
    assert!(rooms.starts_with("Room,Area (sq ft)\nLIVING,14400.0\n"));
}

#[test]
fn estimate_without_inputs_exits_with_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());

    Command::cargo_bin("takeoff")
        .expect("binary built")
        .current_dir(dir.path())
        .args(["--config"])
        .arg(&config)
        .arg("estimate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("estimate").and(predicate::str::contains("failed")));

    assert!(!dir.path().join("extracted_data").join("sample_material_estimation.csv").exists());
}

#[test]
fn unknown_subcommand_is_rejected() {
    Command::cargo_bin("takeoff")
        .expect("binary built")
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("render"));
}
