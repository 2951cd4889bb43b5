//! High-level facade for the `quadwarp` workspace.
//!
//! This crate provides:
//! - stable re-exports of the geometry/warp core (`quadwarp::core`)
//! - JSON job and report types with space-tagged corner input (`quadwarp::job`)
//! - (feature `image`) decoding files or bytes and PNG export (`quadwarp::io`)
//! - (feature `cli`) the `quadwarp` command-line tool
//!
//! ## Quickstart
//!
//! ```no_run
//! use quadwarp::core::{warp_image, Point, Quad, WarpParams};
//! use quadwarp::io::{load_rgba, save_png};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let photo = load_rgba("ticket.jpg")?;
//! let picked = [
//!     Point::new(812.0, 1190.0),
//!     Point::new(95.0, 130.0),
//!     Point::new(880.0, 160.0),
//!     Point::new(60.0, 1150.0),
//! ];
//! let quad = Quad::order(&picked)?;
//! let out = warp_image(&photo.view(), &quad, &WarpParams::default())?;
//! save_png("ticket_flat.png", &out.image)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `quadwarp::core`: points, quads, preview scale, homography, RGBA buffers, warp.
//! - `quadwarp::job`: `CornerSet`, `WarpJob`, `WarpReport`, `run_job` (feature `image`).
//! - `quadwarp::io` (feature `image`): `load_rgba`, `decode_rgba`, `encode_png`, `save_png`.

pub use quadwarp_core as core;

pub use quadwarp_core::{
    order_quad, warp_image, warp_image_from_preview, warp_image_preview, Homography, Original,
    OutputSize, Point, Preview, PreviewScale, Quad, RgbaImage, WarpError, WarpParams, WarpResult,
};

pub mod job;

#[cfg(feature = "image")]
pub mod io;

/// Install the process-wide logger for binaries and examples.
///
/// `verbose` picks the level (0 warn, 1 info, 2 debug, 3+ trace). With the
/// `tracing` feature, `log` records are bridged into a `tracing` subscriber
/// and `RUST_LOG`, when set, overrides `verbose`.
pub fn init_logging(verbose: u8) {
    let level = quadwarp_core::level_from_verbosity(verbose);
    #[cfg(feature = "tracing")]
    {
        quadwarp_core::init_tracing(false, level);
        if let Err(err) = tracing_log::LogTracer::init() {
            log::debug!("log bridge already installed by the subscriber: {err}");
        }
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(err) = quadwarp_core::init_with_level(level) {
            eprintln!("warning: could not install logger: {err}");
        }
    }
}
