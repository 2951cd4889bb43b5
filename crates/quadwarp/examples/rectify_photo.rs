//! Interactive-style rectification: build a preview, warp the preview quad
//! for a fast look, then warp the same quad against the full-resolution photo.
//!
//! ```text
//! cargo run -p quadwarp --example rectify_photo -- tmpdata/rectify_photo.json
//! ```

use std::{env, fs, path::PathBuf, time::Instant};

use quadwarp::core::{
    calculate_preview_scale, create_default_corners, make_preview, warp_image_from_preview,
    warp_image_preview, Point, Preview, Quad, WarpParams,
};
use quadwarp::io::{load_rgba, save_png};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: PathBuf,
    #[serde(default = "default_max_dimension")]
    preview_max_dimension: u32,
    /// Corners on the preview; a 10% inset quad when absent.
    #[serde(default)]
    preview_corners: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    preview_output_path: Option<PathBuf>,
    #[serde(default)]
    output_path: Option<PathBuf>,
    #[serde(default)]
    report_path: Option<PathBuf>,
    #[serde(default)]
    params: WarpParams,
}

fn default_max_dimension() -> u32 {
    1000
}

#[derive(Debug, Serialize)]
struct TimingsMs {
    load_image: u64,
    make_preview: u64,
    warp_preview: u64,
    warp_full: u64,
    total: u64,
}

#[derive(Debug, Serialize)]
struct ExampleReport {
    image_path: String,
    config_path: String,
    scale: f64,
    preview_quad: Quad<Preview>,
    preview_output: [usize; 2],
    full_output: [usize; 2],
    timings_ms: TimingsMs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    quadwarp::init_logging(1);

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/rectify_photo.json"));
    let cfg: ExampleConfig = serde_json::from_str(&fs::read_to_string(&config_path)?)?;

    let t_total = Instant::now();

    let t0 = Instant::now();
    let photo = load_rgba(&cfg.image_path)?;
    let load_image_ms = t0.elapsed().as_millis() as u64;

    let t0 = Instant::now();
    let scale = calculate_preview_scale(
        photo.width as u32,
        photo.height as u32,
        cfg.preview_max_dimension,
    )?;
    let preview = make_preview(&photo, &scale)?;
    let make_preview_ms = t0.elapsed().as_millis() as u64;
    log::info!(
        "preview {}x{} (scale {:.3})",
        preview.width,
        preview.height,
        scale.scale
    );

    let quad = match &cfg.preview_corners {
        Some(points) => {
            let points: Vec<Point<Preview>> = points.iter().copied().map(Point::from).collect();
            Quad::order(&points)?
        }
        None => create_default_corners(preview.width as f64, preview.height as f64, 0.1)?,
    };

    let t0 = Instant::now();
    let quick = warp_image_preview(&preview.view(), &quad, &cfg.params)?;
    let warp_preview_ms = t0.elapsed().as_millis() as u64;
    let preview_out = cfg
        .preview_output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("tmpdata/rectified_preview.png"));
    save_png(&preview_out, &quick.image)?;

    let t0 = Instant::now();
    let full = warp_image_from_preview(&photo.view(), &quad, &scale, &cfg.params)?;
    let warp_full_ms = t0.elapsed().as_millis() as u64;
    let full_out = cfg
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("tmpdata/rectified.png"));
    save_png(&full_out, &full.image)?;

    let report = ExampleReport {
        image_path: cfg.image_path.to_string_lossy().into_owned(),
        config_path: config_path.to_string_lossy().into_owned(),
        scale: scale.scale,
        preview_quad: quad,
        preview_output: [quick.width(), quick.height()],
        full_output: [full.width(), full.height()],
        timings_ms: TimingsMs {
            load_image: load_image_ms,
            make_preview: make_preview_ms,
            warp_preview: warp_preview_ms,
            warp_full: warp_full_ms,
            total: t_total.elapsed().as_millis() as u64,
        },
    };

    let report_path = cfg
        .report_path
        .unwrap_or_else(|| PathBuf::from("tmpdata/rectify_report.json"));
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    log::info!("wrote report JSON to {}", report_path.display());

    Ok(())
}
