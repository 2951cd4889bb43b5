use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// 200x150 photo: light "ticket" inside a dark border.
fn write_photo(path: &Path) {
    let img = image::RgbaImage::from_fn(200, 150, |x, y| {
        if (20..180).contains(&x) && (15..135).contains(&y) {
            image::Rgba([230, 220, 180, 255])
        } else {
            image::Rgba([20, 20, 20, 255])
        }
    });
    img.save(path).expect("write test image");
}

fn quadwarp() -> Command {
    Command::cargo_bin("quadwarp").expect("binary built")
}

#[test]
fn warp_writes_png_and_report() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    let output = dir.path().join("flat.png");
    let report = dir.path().join("report.json");
    write_photo(&input);

    quadwarp()
        .args(["warp", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--corners", "180,135 20,15 180,15 20,135"])
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("160x120"));

    let out = image::open(&output).expect("decode output").to_rgba8();
    assert_eq!(out.dimensions(), (160, 120));
    assert!(out.pixels().all(|p| p.0 == [230, 220, 180, 255]));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(json["output"]["width"], 160);
    assert_eq!(json["source_width"], 200);
    assert_eq!(json["corners"][0][0], 20.0);
    assert!(json["preview_scale"].is_null());
}

#[test]
fn warp_accepts_preview_corners() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    let output = dir.path().join("flat.png");
    write_photo(&input);

    quadwarp()
        .args(["warp", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--corners", "10,7.5 90,7.5 90,67.5 10,67.5"])
        .args(["--preview-max-dimension", "100"])
        .assert()
        .success();

    let out = image::open(&output).expect("decode output").to_rgba8();
    assert_eq!(out.dimensions(), (160, 120));
}

#[test]
fn warp_runs_a_job_file() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    let output = dir.path().join("flat.png");
    let job = dir.path().join("job.json");
    write_photo(&input);

    let body = serde_json::json!({
        "image_path": input,
        "output_path": output,
        "corners": {"space": "original", "points": [[20, 15], [180, 15], [180, 135], [20, 135]]},
        "params": {"fill": [255, 0, 255, 255]}
    });
    std::fs::write(&job, body.to_string()).expect("write job");

    quadwarp()
        .arg("warp")
        .arg("--job")
        .arg(&job)
        .assert()
        .success();
    assert!(output.exists());
}

#[test]
fn degenerate_corners_fail_cleanly() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    write_photo(&input);

    quadwarp()
        .args(["warp", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("never.png"))
        .args(["--corners", "30,30 30,30 30,30 120,90"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("degenerate quad"));
    assert!(!dir.path().join("never.png").exists());
}

#[test]
fn wrong_corner_count_is_reported() {
    quadwarp()
        .args(["size", "--corners", "0,0 10,0 10,10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected exactly 4 corner points, got 3"));
}

#[test]
fn malformed_corner_is_a_usage_error() {
    quadwarp()
        .args(["size", "--corners", "0,0 10;0 10,10 x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid corner"));
}

#[test]
fn size_prints_json() {
    quadwarp()
        .args([
            "size",
            "--corners",
            "100,100 900,120 880,900 120,880",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"width\": 780"))
        .stdout(predicate::str::contains("\"height\": 780"));
}

#[test]
fn default_corners_for_preview() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("photo.png");
    write_photo(&input);

    let assert = quadwarp()
        .args(["default-corners", "--input"])
        .arg(&input)
        .args(["--margin", "0.1", "--preview-max-dimension", "100"])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert_eq!(json["preview_scale"]["scale"], 0.5);
    assert_eq!(json["preview_corners"]["top_left"]["x"], 10.0);
    assert_eq!(json["preview_corners"]["bottom_right"]["y"], 67.5);
    assert!(json.get("corners").is_none());
}

#[test]
fn missing_input_file_fails() {
    let dir = tempdir().expect("tempdir");
    quadwarp()
        .args(["warp", "--input"])
        .arg(dir.path().join("absent.jpg"))
        .arg("--output")
        .arg(dir.path().join("out.png"))
        .args(["--corners", "0,0 10,0 10,10 0,10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.jpg"));
}
