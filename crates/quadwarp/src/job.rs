//! JSON-facing job description and report.
//!
//! Corner points cross the serialization boundary tagged with their
//! coordinate space, so a preview-space quad can never be warped as if it
//! were in original-image pixels.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{
    calculate_preview_scale, order_quad, Original, OutputSize, Point, Preview, PreviewScale, Quad,
    WarpError, WarpParams,
};

/// Corner points as supplied by a caller, tagged with their coordinate space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum CornerSet {
    /// Pixel coordinates of the full-resolution image.
    Original { points: Vec<[f64; 2]> },
    /// Coordinates on a preview whose longer side was `max_dimension` pixels.
    Preview {
        max_dimension: u32,
        points: Vec<[f64; 2]>,
    },
}

/// Corners after ordering and conversion to original-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResolvedCorners {
    pub quad: Quad<Original>,
    pub preview: Option<(PreviewScale, Quad<Preview>)>,
}

impl CornerSet {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            CornerSet::Original { points } | CornerSet::Preview { points, .. } => points,
        }
    }

    /// Order the points and map them into the `width x height` original image.
    pub fn resolve(&self, width: u32, height: u32) -> Result<ResolvedCorners, WarpError> {
        match self {
            CornerSet::Original { points } => {
                let pts: Vec<Point<Original>> = points.iter().copied().map(Point::from).collect();
                Ok(ResolvedCorners {
                    quad: order_quad(&pts)?,
                    preview: None,
                })
            }
            CornerSet::Preview {
                max_dimension,
                points,
            } => {
                let scale = calculate_preview_scale(width, height, *max_dimension)?;
                let pts: Vec<Point<Preview>> = points.iter().copied().map(Point::from).collect();
                let preview_quad = order_quad(&pts)?;
                Ok(ResolvedCorners {
                    quad: scale.quad_to_original(&preview_quad),
                    preview: Some((scale, preview_quad)),
                })
            }
        }
    }
}

/// Whitespace-separated `x,y` pairs, e.g. `"12,30 400,28 410,600 8,590"`.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerList(pub Vec<[f64; 2]>);

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid corner `{token}`: expected `x,y` with finite numbers")]
pub struct ParseCornerError {
    pub token: String,
}

impl FromStr for CornerList {
    type Err = ParseCornerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c.is_whitespace() || c == ';')
            .filter(|t| !t.is_empty())
            .map(|token| {
                let bad = || ParseCornerError {
                    token: token.to_string(),
                };
                let (x, y) = token.split_once(',').ok_or_else(bad)?;
                let x: f64 = x.trim().parse().map_err(|_| bad())?;
                let y: f64 = y.trim().parse().map_err(|_| bad())?;
                if !(x.is_finite() && y.is_finite()) {
                    return Err(bad());
                }
                Ok([x, y])
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CornerList)
    }
}

impl fmt::Display for CornerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, [x, y]) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{x},{y}")?;
        }
        Ok(())
    }
}

/// One rectification request, as read from a job file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WarpJob {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    pub corners: CornerSet,
    #[serde(default)]
    pub params: WarpParams,
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingsMs {
    pub load_image: u64,
    pub warp: u64,
    pub encode: u64,
    pub total: u64,
}

/// Summary of a finished job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WarpReport {
    pub image_path: String,
    pub output_path: String,
    pub source_width: u32,
    pub source_height: u32,
    pub output: OutputSize,
    pub corners: [[f64; 2]; 4],
    pub preview_scale: Option<PreviewScale>,
    pub h_src_from_dst: [[f64; 3]; 3],
    pub timings_ms: TimingsMs,
}

#[cfg(feature = "image")]
pub use run::run_job;

#[cfg(feature = "image")]
mod run {
    use std::path::Path;
    use std::time::Instant;

    use super::{TimingsMs, WarpJob, WarpReport};
    use crate::core::warp_image;
    use crate::io::{encode_png, load_rgba, IoError};

    /// Load, order, warp and save; returns the report (also written if requested).
    ///
    /// Nothing is left on disk when the call fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all))]
    pub fn run_job(job: &WarpJob) -> Result<WarpReport, IoError> {
        let t_total = Instant::now();

        let t0 = Instant::now();
        let src = load_rgba(&job.image_path)?;
        let load_image = t0.elapsed().as_millis() as u64;

        let resolved = job.corners.resolve(src.width as u32, src.height as u32)?;

        let t0 = Instant::now();
        let result = warp_image(&src.view(), &resolved.quad, &job.params)?;
        let warp = t0.elapsed().as_millis() as u64;
        log::info!(
            "warped {}x{} -> {}x{} in {} ms",
            src.width,
            src.height,
            result.width(),
            result.height(),
            warp
        );

        let t0 = Instant::now();
        let png = encode_png(&result.image)?;
        let encode = t0.elapsed().as_millis() as u64;

        let report = WarpReport {
            image_path: job.image_path.to_string_lossy().into_owned(),
            output_path: job.output_path.to_string_lossy().into_owned(),
            source_width: src.width as u32,
            source_height: src.height as u32,
            output: result.size(),
            corners: resolved.quad.corners().map(<[f64; 2]>::from),
            preview_scale: resolved.preview.map(|(scale, _)| scale),
            h_src_from_dst: result.h_src_from_dst.to_array(),
            timings_ms: TimingsMs {
                load_image,
                warp,
                encode,
                total: t_total.elapsed().as_millis() as u64,
            },
        };
        let report_json = match &job.report_path {
            Some(path) => Some((
                path,
                serde_json::to_string_pretty(&report).map_err(|e| IoError::Write {
                    path: path.clone(),
                    source: e.into(),
                })?,
            )),
            None => None,
        };

        write_file(&job.output_path, &png)?;
        log::info!(
            "wrote {}x{} PNG to {} ({} bytes)",
            result.width(),
            result.height(),
            job.output_path.display(),
            png.len()
        );

        if let Some((path, json)) = report_json {
            // A job either leaves both files or neither.
            if let Err(err) = write_file(path, json.as_bytes()) {
                if let Err(rm) = std::fs::remove_file(&job.output_path) {
                    log::warn!("could not remove {}: {rm}", job.output_path.display());
                }
                return Err(err);
            }
            log::info!("wrote report JSON to {}", path.display());
        }

        Ok(report)
    }

    fn write_file(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
        std::fs::write(path, bytes).map_err(|source| IoError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_corner_lists() {
        let list: CornerList = "12,30 400,28\n410.5,600;8,590".parse().expect("valid");
        assert_eq!(
            list.0,
            vec![[12.0, 30.0], [400.0, 28.0], [410.5, 600.0], [8.0, 590.0]]
        );
        assert_eq!(list.to_string(), "12,30 400,28 410.5,600 8,590");

        let err = "12,30 oops".parse::<CornerList>().unwrap_err();
        assert_eq!(err.token, "oops");
        assert!("1,inf".parse::<CornerList>().is_err());
    }

    #[test]
    fn corner_set_is_tagged_by_space() {
        let json = r#"{"space":"preview","max_dimension":500,"points":[[1,2],[3,4],[5,6],[7,8]]}"#;
        let set: CornerSet = serde_json::from_str(json).expect("valid");
        assert!(matches!(set, CornerSet::Preview { max_dimension: 500, .. }));
        assert_eq!(set.points().len(), 4);

        let untagged = r#"{"points":[[1,2],[3,4],[5,6],[7,8]]}"#;
        assert!(serde_json::from_str::<CornerSet>(untagged).is_err());
        let unknown = r#"{"space":"screen","points":[]}"#;
        assert!(serde_json::from_str::<CornerSet>(unknown).is_err());
    }

    #[test]
    fn preview_corners_resolve_to_original_pixels() {
        let set = CornerSet::Preview {
            max_dimension: 1000,
            points: vec![[250.0, 190.0], [10.0, 12.0], [240.0, 8.0], [14.0, 180.0]],
        };
        let resolved = set.resolve(4000, 3000).expect("valid");
        let (scale, preview_quad) = resolved.preview.expect("preview space");
        assert_eq!(scale.scale, 0.25);
        assert_eq!(preview_quad.top_left, Point::new(10.0, 12.0));
        assert_eq!(resolved.quad.top_left, Point::new(40.0, 48.0));
        assert_eq!(resolved.quad.bottom_right, Point::new(1000.0, 760.0));
    }

    #[test]
    fn wrong_point_count_is_invalid_input() {
        let set = CornerSet::Original {
            points: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
        };
        let err = set.resolve(10, 10).unwrap_err();
        assert_eq!(err, WarpError::InvalidPointCount { got: 3 });
    }

    #[test]
    fn job_defaults_params() {
        let json = r#"{
            "image_path": "in.jpg",
            "output_path": "out.png",
            "corners": {"space": "original", "points": [[0,0],[9,0],[9,9],[0,9]]}
        }"#;
        let job: WarpJob = serde_json::from_str(json).expect("valid");
        assert_eq!(job.params, WarpParams::default());
        assert!(job.report_path.is_none());
    }
}
