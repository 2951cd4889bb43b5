//! Inverse-mapping perspective warp.
//!
//! The homography is solved from the output rectangle to the source quad, so
//! every output pixel is mapped straight into the source and sampled there.
//! No per-pixel inversion is needed and the output has no holes.

use std::time::Instant;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{
    compute_homography, sample_bilinear_rgba, CoordSpace, Homography, Original, OutputSize,
    Preview, PreviewScale, Quad, RgbaImage, RgbaImageView, WarpError,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Warp settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpParams {
    /// Color written where the quad reaches outside the source image.
    pub fill: [u8; 4],
    /// Upper bound on `width * height` of the output.
    pub max_output_pixels: usize,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            fill: [0, 0, 0, 0],
            max_output_pixels: 64 * 1024 * 1024,
        }
    }
}

/// Rectified output plus the transform that produced it.
#[derive(Clone, Debug)]
pub struct WarpResult {
    pub image: RgbaImage,
    /// Maps output pixel coordinates to source pixel coordinates.
    pub h_src_from_dst: Homography,
}

impl WarpResult {
    pub fn width(&self) -> usize {
        self.image.width
    }

    pub fn height(&self) -> usize {
        self.image.height
    }

    pub fn size(&self) -> OutputSize {
        OutputSize {
            width: self.image.width,
            height: self.image.height,
        }
    }

    /// Number of pixels left at the fill color (alpha 0 with default params).
    pub fn transparent_pixels(&self) -> usize {
        self.image.data.chunks_exact(4).filter(|p| p[3] == 0).count()
    }
}

/// For each output pixel, map through `h_src_from_dst` and sample bilinearly.
///
/// Output pixels whose source position is outside the image (or at infinity)
/// get `params.fill`.
pub fn warp_with_homography(
    src: &RgbaImageView<'_>,
    h_src_from_dst: &Homography,
    size: OutputSize,
    params: &WarpParams,
) -> Result<RgbaImage, WarpError> {
    src.check()?;
    if size.pixel_count() > params.max_output_pixels {
        return Err(WarpError::OutputTooLarge {
            width: size.width,
            height: size.height,
            limit: params.max_output_pixels,
        });
    }

    let mut out = RgbaImage::new(size.width, size.height)?;
    for y in 0..size.height {
        for x in 0..size.width {
            let px = h_src_from_dst
                .try_apply(Point2::new(x as f64, y as f64))
                .and_then(|p| sample_bilinear_rgba(src, p.x, p.y))
                .unwrap_or(params.fill);
            out.put_pixel(x, y, px);
        }
    }
    Ok(out)
}

fn warp_quad<S: CoordSpace>(
    src: &RgbaImageView<'_>,
    quad: &Quad<S>,
    params: &WarpParams,
) -> Result<WarpResult, WarpError> {
    src.check()?;
    if src.is_empty() {
        return Err(WarpError::InvalidParameter {
            name: "source image",
            reason: format!("{}x{} is empty", src.width, src.height),
        });
    }
    quad.validate().inspect_err(|err| {
        log::warn!("refusing to warp {} quad: {err}", S::NAME);
    })?;

    let started = Instant::now();
    let size = quad.estimate_output_size();
    let dst_rect = Quad::<Original>::rect(size.width as f64, size.height as f64);
    let h_src_from_dst = compute_homography(&dst_rect, quad)?;
    let image = warp_with_homography(src, &h_src_from_dst, size, params)?;

    log::debug!(
        "warped {} quad from {}x{} source into {}x{} in {:.1} ms",
        S::NAME,
        src.width,
        src.height,
        size.width,
        size.height,
        started.elapsed().as_secs_f64() * 1e3
    );

    Ok(WarpResult {
        image,
        h_src_from_dst,
    })
}

/// Rectify the region bounded by `quad` (original-image coordinates).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = src.width, height = src.height))
)]
pub fn warp_image(
    src: &RgbaImageView<'_>,
    quad: &Quad<Original>,
    params: &WarpParams,
) -> Result<WarpResult, WarpError> {
    warp_quad(src, quad, params)
}

/// Rectify a quad edited in preview space against the full-resolution source.
///
/// `scale` must describe `src` as its original image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(scale = scale.scale))
)]
pub fn warp_image_from_preview(
    src: &RgbaImageView<'_>,
    quad: &Quad<Preview>,
    scale: &PreviewScale,
    params: &WarpParams,
) -> Result<WarpResult, WarpError> {
    if (scale.original_width as usize, scale.original_height as usize) != (src.width, src.height) {
        return Err(WarpError::InvalidParameter {
            name: "preview scale",
            reason: format!(
                "describes a {}x{} original but the source is {}x{}",
                scale.original_width, scale.original_height, src.width, src.height
            ),
        });
    }
    warp_quad(src, &scale.quad_to_original(quad), params)
}

/// Downscaled copy of `src` matching `scale`'s preview size.
pub fn make_preview(src: &RgbaImage, scale: &PreviewScale) -> Result<RgbaImage, WarpError> {
    src.downscale(scale.preview_width as usize, scale.preview_height as usize)
}

/// Low-latency warp against a preview image; `quad` indexes `preview` directly.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn warp_image_preview(
    preview: &RgbaImageView<'_>,
    quad: &Quad<Preview>,
    params: &WarpParams,
) -> Result<WarpResult, WarpError> {
    warp_quad(preview, quad, params)
}
