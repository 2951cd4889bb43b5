use approx::assert_relative_eq;
use quadwarp::core::{Point, Quad, RgbaImage, WarpError, WarpParams};
use quadwarp::io::{decode_rgba, encode_png, load_rgba, save_png, IoError};
use quadwarp::job::{run_job, CornerSet, WarpJob, WarpReport};
use tempfile::tempdir;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 120x90 dark frame with a bright 80x60 card at (20, 15).
fn card_photo() -> RgbaImage {
    let mut img = RgbaImage::filled(120, 90, [10, 10, 10, 255]).expect("alloc");
    for y in 15..75 {
        for x in 20..100 {
            img.put_pixel(x, y, [240, 200, 40, 255]);
        }
    }
    img
}

fn card_job(dir: &std::path::Path, corners: CornerSet) -> WarpJob {
    WarpJob {
        image_path: dir.join("card.png"),
        output_path: dir.join("card_flat.png"),
        corners,
        params: WarpParams::default(),
        report_path: Some(dir.join("report.json")),
    }
}

#[test]
fn job_warps_card_and_writes_report() {
    init();
    let dir = tempdir().expect("tempdir");
    save_png(dir.path().join("card.png"), &card_photo()).expect("save");

    let job = card_job(
        dir.path(),
        CornerSet::Original {
            points: vec![[100.0, 75.0], [20.0, 75.0], [100.0, 15.0], [20.0, 15.0]],
        },
    );
    let report = run_job(&job).expect("job succeeds");
    assert_eq!((report.output.width, report.output.height), (80, 60));
    assert_eq!(report.corners[0], [20.0, 15.0]);
    assert_eq!(report.corners[2], [100.0, 75.0]);
    assert_relative_eq!(report.h_src_from_dst[0][2], 20.0, epsilon = 1e-9);
    assert_relative_eq!(report.h_src_from_dst[1][2], 15.0, epsilon = 1e-9);
    assert_relative_eq!(report.h_src_from_dst[2][2], 1.0, epsilon = 1e-12);

    let out = load_rgba(&job.output_path).expect("output decodes");
    assert_eq!((out.width, out.height), (80, 60));
    assert!(out.data.chunks_exact(4).all(|p| p == [240, 200, 40, 255]));

    let raw = std::fs::read_to_string(dir.path().join("report.json")).expect("report written");
    let written: WarpReport = serde_json::from_str(&raw).expect("report parses");
    assert_eq!(written.output, report.output);
    assert!(written.preview_scale.is_none());
}

#[test]
fn preview_job_matches_original_job() {
    init();
    let dir = tempdir().expect("tempdir");
    save_png(dir.path().join("card.png"), &card_photo()).expect("save");

    // Longer side 60 -> scale 0.5.
    let job = card_job(
        dir.path(),
        CornerSet::Preview {
            max_dimension: 60,
            points: vec![[10.0, 7.5], [50.0, 7.5], [50.0, 37.5], [10.0, 37.5]],
        },
    );
    let report = run_job(&job).expect("job succeeds");
    let scale = report.preview_scale.expect("preview scale recorded");
    assert_eq!(scale.scale, 0.5);
    assert_eq!((scale.preview_width, scale.preview_height), (60, 45));
    assert_eq!((report.output.width, report.output.height), (80, 60));
    assert_eq!(report.corners[0], [20.0, 15.0]);
}

#[test]
fn degenerate_job_writes_nothing() {
    init();
    let dir = tempdir().expect("tempdir");
    save_png(dir.path().join("card.png"), &card_photo()).expect("save");

    let job = card_job(
        dir.path(),
        CornerSet::Original {
            points: vec![[10.0, 10.0], [50.0, 50.0], [90.0, 90.0], [10.0, 80.0]],
        },
    );
    let err = run_job(&job).unwrap_err();
    assert!(matches!(
        err,
        IoError::Warp(WarpError::DegenerateQuad { .. })
    ));
    assert!(!job.output_path.exists());
    assert!(!dir.path().join("report.json").exists());
}

#[test]
fn unwritable_report_leaves_no_png_behind() {
    init();
    let dir = tempdir().expect("tempdir");
    save_png(dir.path().join("card.png"), &card_photo()).expect("save");

    let mut job = card_job(
        dir.path(),
        CornerSet::Original {
            points: vec![[20.0, 15.0], [100.0, 15.0], [100.0, 75.0], [20.0, 75.0]],
        },
    );
    job.report_path = Some(dir.path().join("no_such_dir").join("report.json"));

    let err = run_job(&job).unwrap_err();
    assert!(matches!(err, IoError::Write { .. }));
    assert!(err.to_string().contains("report.json"));
    assert!(!job.output_path.exists());
}

#[test]
fn missing_image_is_a_read_error() {
    init();
    let dir = tempdir().expect("tempdir");
    let job = card_job(
        dir.path(),
        CornerSet::Original {
            points: vec![[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]],
        },
    );
    assert!(matches!(run_job(&job), Err(IoError::Read { .. })));
}

#[test]
fn tilted_quad_on_decoded_bytes() {
    init();
    let png = encode_png(&card_photo()).expect("encode");
    let src = decode_rgba(&png).expect("decode");

    let picked = [
        Point::new(22.0, 18.0),
        Point::new(97.0, 15.0),
        Point::new(99.0, 73.0),
        Point::new(21.0, 70.0),
    ];
    let quad = Quad::order(&picked).expect("4 points");
    let out = quadwarp::warp_image(&src.view(), &quad, &WarpParams::default()).expect("warp");

    assert_eq!(out.transparent_pixels(), 0);
    let (w, h) = (out.width(), out.height());
    let center = out.image.pixel(w / 2, h / 2);
    assert_eq!(center, [240, 200, 40, 255]);
}
