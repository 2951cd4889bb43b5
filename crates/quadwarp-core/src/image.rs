use crate::WarpError;

/// Bytes per pixel: R, G, B, A.
pub const CHANNELS: usize = 4;

/// Slack for positions that land on the border up to rounding error.
const EDGE_EPS: f64 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct RgbaImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGBA, len = w*h*4
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn expected_len(width: usize, height: usize) -> Result<usize, WarpError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(WarpError::OutputTooLarge {
            width,
            height,
            limit: usize::MAX / CHANNELS,
        })
}

impl<'a> RgbaImageView<'a> {
    /// Wrap a raw RGBA buffer, checking its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, WarpError> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(WarpError::BufferSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Check that `data` holds exactly `width * height` RGBA pixels.
    ///
    /// Views built from their public fields skip [`RgbaImageView::new`];
    /// every consumer that indexes pixels calls this first.
    pub fn check(&self) -> Result<(), WarpError> {
        let expected = expected_len(self.width, self.height)?;
        if self.data.len() != expected {
            return Err(WarpError::BufferSize {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl RgbaImage {
    /// Fully transparent image.
    pub fn new(width: usize, height: usize) -> Result<Self, WarpError> {
        let len = expected_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, WarpError> {
        RgbaImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image filled with a single color.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Result<Self, WarpError> {
        let len = expected_len(width, height)?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> RgbaImageView<'_> {
        RgbaImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.view().pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = (y * self.width + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Copy out the `width x height` block whose top-left pixel is `(x, y)`.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Result<Self, WarpError> {
        if x + width > self.width || y + height > self.height {
            return Err(WarpError::InvalidParameter {
                name: "crop",
                reason: format!(
                    "{width}x{height}+{x}+{y} exceeds {}x{}",
                    self.width, self.height
                ),
            });
        }
        let mut out = Self::new(width, height)?;
        let row_bytes = width * CHANNELS;
        for row in 0..height {
            let src = ((y + row) * self.width + x) * CHANNELS;
            let dst = row * row_bytes;
            out.data[dst..dst + row_bytes].copy_from_slice(&self.data[src..src + row_bytes]);
        }
        Ok(out)
    }

    /// Bilinear resize to `width x height`, sampling at pixel centers.
    pub fn downscale(&self, width: usize, height: usize) -> Result<Self, WarpError> {
        if width == 0 || height == 0 || width > self.width || height > self.height {
            return Err(WarpError::InvalidParameter {
                name: "downscale",
                reason: format!(
                    "target {width}x{height} must be non-empty and within {}x{}",
                    self.width, self.height
                ),
            });
        }
        let src = self.view();
        src.check()?;
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let sx = self.width as f64 / width as f64;
        let sy = self.height as f64 / height as f64;
        let mut out = Self::new(width, height)?;
        for y in 0..height {
            let fy = ((y as f64 + 0.5) * sy - 0.5).max(0.0);
            for x in 0..width {
                let fx = ((x as f64 + 0.5) * sx - 0.5).max(0.0);
                if let Some(px) = sample_bilinear_rgba(&src, fx, fy) {
                    out.put_pixel(x, y, px);
                }
            }
        }
        Ok(out)
    }
}

/// Bilinear RGBA sample at a sub-pixel position.
///
/// Returns `None` unless `0 <= x <= width - 1` and `0 <= y <= height - 1`
/// (give or take rounding error). The right/bottom neighbours are clamped to
/// the last column/row, so integer positions reproduce the source pixel.
#[inline]
pub fn sample_bilinear_rgba(src: &RgbaImageView<'_>, x: f64, y: f64) -> Option<[u8; 4]> {
    if src.is_empty() {
        return None;
    }
    let max_x = (src.width - 1) as f64;
    let max_y = (src.height - 1) as f64;
    if !(x >= -EDGE_EPS && y >= -EDGE_EPS && x <= max_x + EDGE_EPS && y <= max_y + EDGE_EPS) {
        return None;
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..CHANNELS {
        let v = p00[c] as f64 * w00
            + p10[c] as f64 * w10
            + p01[c] as f64 * w01
            + p11[c] as f64 * w11;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
