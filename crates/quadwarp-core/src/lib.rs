//! Perspective correction for a user-picked quadrilateral.
//!
//! This crate is purely geometric and works on raw RGBA buffers. It does *not*
//! depend on any concrete image codec; see the `quadwarp` crate for decoding,
//! PNG export and the command-line tool.
//!
//! Pipeline:
//! 1. Order 4 corner points into top-left, top-right, bottom-right, bottom-left.
//! 2. Rescale them from preview to original coordinates if needed.
//! 3. Estimate the output rectangle from averaged opposite edges.
//! 4. Solve the homography output-rectangle -> source-quad (Gauss-Jordan).
//! 5. Inverse-map every output pixel and sample the source bilinearly.
//!
//! ```
//! use quadwarp_core::{warp_image, Point, Quad, RgbaImage, WarpParams};
//!
//! let src = RgbaImage::filled(64, 64, [255, 255, 255, 255]).unwrap();
//! let picked = [
//!     Point::new(50.0, 55.0),
//!     Point::new(6.0, 4.0),
//!     Point::new(58.0, 8.0),
//!     Point::new(3.0, 60.0),
//! ];
//! let quad = Quad::order(&picked).unwrap();
//! let out = warp_image(&src.view(), &quad, &WarpParams::default()).unwrap();
//! assert_eq!(out.transparent_pixels(), 0);
//! ```

mod error;
mod geometry;
mod homography;
mod image;
mod logger;
mod warp;

pub use error::WarpError;
pub use geometry::{
    calculate_preview_scale, clamp_point_to_image, create_default_corners, distance,
    estimate_output_size, order_quad, original_to_preview, preview_to_original, CoordSpace,
    Original, OriginalPoint, OutputSize, Point, Preview, PreviewPoint, PreviewScale, Quad,
};
pub use homography::{
    compute_homography, homography_from_4pt, invert_matrix3x3, transform_point, Homography,
    SINGULAR_EPS,
};
pub use image::{sample_bilinear_rgba, RgbaImage, RgbaImageView, CHANNELS};
pub use warp::{
    make_preview, warp_image, warp_image_from_preview, warp_image_preview, warp_with_homography,
    WarpParams, WarpResult,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
