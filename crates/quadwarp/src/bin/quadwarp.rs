use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use quadwarp::core::{
    calculate_preview_scale, create_default_corners, Original, OutputSize, Point, Preview,
    PreviewScale, Quad, WarpError, WarpParams,
};
use quadwarp::io::IoError;
use quadwarp::job::{run_job, CornerList, CornerSet, WarpJob};

#[derive(Parser, Debug)]
#[command(
    name = "quadwarp",
    version,
    about = "Straighten a photographed ticket, poster or setlist from its 4 corners"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Warp the quad bounded by 4 corners into an upright PNG.
    Warp(WarpArgs),
    /// Print the output size that `warp` would produce for the given corners.
    Size(SizeArgs),
    /// Print the default editable quad for an image.
    DefaultCorners(DefaultCornersArgs),
}

#[derive(Args, Debug)]
struct WarpArgs {
    /// JSON job file; replaces --input/--output/--corners.
    #[arg(long, conflicts_with_all = ["input", "output", "corners", "preview_max_dimension"])]
    job: Option<PathBuf>,

    /// Source image (any format the `image` crate decodes).
    #[arg(short, long, required_unless_present = "job")]
    input: Option<PathBuf>,

    /// Destination PNG.
    #[arg(short, long, required_unless_present = "job")]
    output: Option<PathBuf>,

    /// Four corners as "x,y x,y x,y x,y" in any order.
    #[arg(long, required_unless_present = "job", allow_hyphen_values = true)]
    corners: Option<CornerList>,

    /// Corners are on a preview whose longer side is this many pixels.
    #[arg(long)]
    preview_max_dimension: Option<u32>,

    /// Write a JSON report (sizes, homography, timings) here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// RGBA fill for pixels outside the source, e.g. "255,255,255,255".
    #[arg(long, value_parser = parse_rgba)]
    fill: Option<[u8; 4]>,

    /// Refuse outputs with more pixels than this.
    #[arg(long)]
    max_output_pixels: Option<usize>,
}

#[derive(Args, Debug)]
struct SizeArgs {
    /// Four corners as "x,y x,y x,y x,y" in any order.
    #[arg(long, allow_hyphen_values = true)]
    corners: CornerList,
}

#[derive(Args, Debug)]
struct DefaultCornersArgs {
    /// Image whose dimensions seed the quad.
    #[arg(short, long)]
    input: PathBuf,

    /// Inset on each side as a fraction of the dimension.
    #[arg(long, default_value_t = 0.1)]
    margin: f64,

    /// Emit the quad in preview coordinates for this preview size.
    #[arg(long)]
    preview_max_dimension: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Warp(#[from] WarpError),

    #[error("failed to read job file {path}: {source}")]
    JobRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid job file {path}: {source}")]
    JobParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing {0} (or pass --job)")]
    MissingArg(&'static str),
}

fn parse_rgba(s: &str) -> Result<[u8; 4], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected 4 comma-separated channels, got {}", parts.len()));
    }
    let mut out = [0u8; 4];
    for (dst, part) in out.iter_mut().zip(&parts) {
        *dst = part
            .parse()
            .map_err(|_| format!("channel `{part}` is not in 0..=255"))?;
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
struct SizeOut {
    output: OutputSize,
    corners: Quad<Original>,
}

#[derive(Debug, Serialize)]
struct DefaultCornersOut {
    width: u32,
    height: u32,
    margin: f64,
    preview_scale: Option<PreviewScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    corners: Option<Quad<Original>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview_corners: Option<Quad<Preview>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    quadwarp::init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Warp(args) => warp(args),
        Command::Size(args) => size(args),
        Command::DefaultCorners(args) => default_corners(args),
    }
}

fn load_job(path: PathBuf) -> Result<WarpJob, CliError> {
    let raw = fs::read_to_string(&path).map_err(|source| CliError::JobRead {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::JobParse { path, source })
}

fn warp(args: WarpArgs) -> Result<(), CliError> {
    let mut job = match args.job {
        Some(path) => load_job(path)?,
        None => {
            let image_path = args.input.ok_or(CliError::MissingArg("--input"))?;
            let output_path = args.output.ok_or(CliError::MissingArg("--output"))?;
            let corners = args.corners.ok_or(CliError::MissingArg("--corners"))?;
            let corners = match args.preview_max_dimension {
                Some(max_dimension) => CornerSet::Preview {
                    max_dimension,
                    points: corners.0,
                },
                None => CornerSet::Original { points: corners.0 },
            };
            WarpJob {
                image_path,
                output_path,
                corners,
                params: WarpParams::default(),
                report_path: None,
            }
        }
    };

    if let Some(fill) = args.fill {
        job.params.fill = fill;
    }
    if let Some(limit) = args.max_output_pixels {
        job.params.max_output_pixels = limit;
    }
    if args.report.is_some() {
        job.report_path = args.report;
    }

    let report = run_job(&job)?;
    println!(
        "{}x{} -> {}",
        report.output.width, report.output.height, report.output_path
    );
    Ok(())
}

fn size(args: SizeArgs) -> Result<(), CliError> {
    let points: Vec<Point<Original>> = args.corners.0.into_iter().map(Point::from).collect();
    let quad = Quad::order(&points)?;
    quad.validate()?;
    let out = SizeOut {
        output: quad.estimate_output_size(),
        corners: quad,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn default_corners(args: DefaultCornersArgs) -> Result<(), CliError> {
    let (width, height) = image::image_dimensions(&args.input).map_err(IoError::Decode)?;

    let out = match args.preview_max_dimension {
        Some(max_dimension) => {
            let scale = calculate_preview_scale(width, height, max_dimension)?;
            let quad = create_default_corners::<Preview>(
                scale.preview_width as f64,
                scale.preview_height as f64,
                args.margin,
            )?;
            DefaultCornersOut {
                width,
                height,
                margin: args.margin,
                preview_scale: Some(scale),
                corners: None,
                preview_corners: Some(quad),
            }
        }
        None => DefaultCornersOut {
            width,
            height,
            margin: args.margin,
            preview_scale: None,
            corners: Some(create_default_corners::<Original>(
                width as f64,
                height as f64,
                args.margin,
            )?),
            preview_corners: None,
        },
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fill_color() {
        assert_eq!(parse_rgba("255, 255,255,0"), Ok([255, 255, 255, 0]));
        assert!(parse_rgba("1,2,3").is_err());
        assert!(parse_rgba("1,2,3,300").is_err());
    }
}
