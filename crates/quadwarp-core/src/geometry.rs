//! Corner points, quads and the coordinate spaces they live in.
//!
//! Corner handles are usually edited on a downscaled preview of the photo and
//! the warp runs on the full-resolution image. The space is part of the point
//! type (`Point<Preview>` vs `Point<Original>`), so mixing the two needs an
//! explicit conversion through [`PreviewScale`].

use std::marker::PhantomData;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::WarpError;

/// Twice-triangle area (in px²) below which three corners count as collinear.
const MIN_TRIANGLE_AREA: f64 = 1e-6;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Original {}
    impl Sealed for super::Preview {}
}

/// Marker trait for coordinate spaces.
pub trait CoordSpace:
    sealed::Sealed + Copy + Clone + Default + std::fmt::Debug + PartialEq + Send + Sync + 'static
{
    const NAME: &'static str;
}

/// Pixel coordinates of the full-resolution source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Original;

/// Pixel coordinates of a downscaled preview of the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preview;

impl CoordSpace for Original {
    const NAME: &'static str = "original";
}

impl CoordSpace for Preview {
    const NAME: &'static str = "preview";
}

/// A 2D point tagged with its coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<S: CoordSpace = Original> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

pub type OriginalPoint = Point<Original>;
pub type PreviewPoint = Point<Preview>;

impl<S: CoordSpace> Point<S> {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    #[inline]
    pub fn to_na(self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn from_na(p: Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    fn scaled(self, factor: f64) -> Point<S> {
        Point::new(self.x * factor, self.y * factor)
    }

    #[inline]
    fn retag<T: CoordSpace>(self) -> Point<T> {
        Point::new(self.x, self.y)
    }
}

impl<S: CoordSpace> From<[f64; 2]> for Point<S> {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl<S: CoordSpace> From<Point<S>> for [f64; 2] {
    fn from(p: Point<S>) -> Self {
        [p.x, p.y]
    }
}

/// Euclidean distance between two points of the same space.
#[inline]
pub fn distance<S: CoordSpace>(a: Point<S>, b: Point<S>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Cross product of (b - a) x (c - a): twice the signed triangle area.
#[inline]
fn cross<S: CoordSpace>(a: Point<S>, b: Point<S>, c: Point<S>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Size of the rectified output image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub width: usize,
    pub height: usize,
}

impl OutputSize {
    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

/// Four corners in canonical order: top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Quad<S: CoordSpace = Original> {
    pub top_left: Point<S>,
    pub top_right: Point<S>,
    pub bottom_right: Point<S>,
    pub bottom_left: Point<S>,
}

impl<S: CoordSpace> Quad<S> {
    /// Build a quad from corners that are already in canonical order.
    pub fn new(
        top_left: Point<S>,
        top_right: Point<S>,
        bottom_right: Point<S>,
        bottom_left: Point<S>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    pub fn from_corners(c: [Point<S>; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn corners(&self) -> [Point<S>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Axis-aligned rectangle `[(0,0), (w,0), (w,h), (0,h)]`.
    pub fn rect(width: f64, height: f64) -> Self {
        Self::new(
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        )
    }

    /// Order exactly 4 points into canonical corner order.
    ///
    /// Uses `x + y` (min: top-left, max: bottom-right) and `x - y`
    /// (max: top-right, min: bottom-left). Degenerate layouts are not rejected
    /// here; see [`Quad::validate`].
    pub fn order(points: &[Point<S>]) -> Result<Self, WarpError> {
        let pts: &[Point<S>; 4] = points
            .try_into()
            .map_err(|_| WarpError::InvalidPointCount { got: points.len() })?;

        let by = |key: fn(&Point<S>) -> f64, pick_max: bool| -> Point<S> {
            let mut best = pts[0];
            for p in &pts[1..] {
                let better = if pick_max {
                    key(p).total_cmp(&key(&best)).is_gt()
                } else {
                    key(p).total_cmp(&key(&best)).is_lt()
                };
                if better {
                    best = *p;
                }
            }
            best
        };

        let sum = |p: &Point<S>| p.x + p.y;
        let diff = |p: &Point<S>| p.x - p.y;

        Ok(Self::new(
            by(sum, false),
            by(diff, true),
            by(sum, true),
            by(diff, false),
        ))
    }

    /// Edge lengths as `[top, right, bottom, left]`.
    pub fn edge_lengths(&self) -> [f64; 4] {
        [
            distance(self.top_left, self.top_right),
            distance(self.top_right, self.bottom_right),
            distance(self.bottom_right, self.bottom_left),
            distance(self.bottom_left, self.top_left),
        ]
    }

    /// Signed shoelace area; positive for clockwise corners in image coordinates.
    pub fn signed_area(&self) -> f64 {
        let c = self.corners();
        let mut acc = 0.0;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            acc += a.x * b.y - b.x * a.y;
        }
        0.5 * acc
    }

    /// `true` if the quad is convex (and therefore simple).
    pub fn is_convex(&self) -> bool {
        let c = self.corners();
        let mut sign = 0.0_f64;
        for i in 0..4 {
            let z = cross(c[i], c[(i + 1) % 4], c[(i + 2) % 4]);
            if z.abs() < MIN_TRIANGLE_AREA {
                return false;
            }
            if sign == 0.0 {
                sign = z.signum();
            } else if z.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Reject quads that cannot define a projective transform.
    ///
    /// Fails on non-finite coordinates and whenever any three corners are
    /// collinear (which includes coincident corners and zero area).
    pub fn validate(&self) -> Result<(), WarpError> {
        let c = self.corners();
        if !c.iter().all(|p| p.is_finite()) {
            return Err(WarpError::DegenerateQuad {
                reason: "non-finite corner coordinate",
            });
        }
        for skip in 0..4 {
            let tri: Vec<Point<S>> = (0..4).filter(|&i| i != skip).map(|i| c[i]).collect();
            if cross(tri[0], tri[1], tri[2]).abs() < MIN_TRIANGLE_AREA {
                return Err(WarpError::DegenerateQuad {
                    reason: "three corners are collinear",
                });
            }
        }
        Ok(())
    }

    /// Rectangle size estimated from averaged opposite edges.
    ///
    /// Width averages the top and bottom edges, height the left and right
    /// edges. Both are rounded and at least 1.
    pub fn estimate_output_size(&self) -> OutputSize {
        let [top, right, bottom, left] = self.edge_lengths();
        let width = ((top + bottom) / 2.0).round().max(1.0) as usize;
        let height = ((left + right) / 2.0).round().max(1.0) as usize;
        OutputSize { width, height }
    }

    fn map_points<T: CoordSpace>(&self, f: impl Fn(Point<S>) -> Point<T>) -> Quad<T> {
        Quad::new(
            f(self.top_left),
            f(self.top_right),
            f(self.bottom_right),
            f(self.bottom_left),
        )
    }
}

/// Free-function form of [`Quad::order`].
pub fn order_quad<S: CoordSpace>(points: &[Point<S>]) -> Result<Quad<S>, WarpError> {
    Quad::order(points)
}

/// Free-function form of [`Quad::estimate_output_size`].
pub fn estimate_output_size<S: CoordSpace>(quad: &Quad<S>) -> OutputSize {
    quad.estimate_output_size()
}

/// Relation between a downscaled preview and the original image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewScale {
    /// Preview pixels per original pixel, in `(0, 1]`.
    pub scale: f64,
    pub original_width: u32,
    pub original_height: u32,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl PreviewScale {
    pub fn new(scale: f64, original_width: u32, original_height: u32) -> Result<Self, WarpError> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(WarpError::InvalidParameter {
                name: "scale",
                reason: format!("must be in (0, 1], got {scale}"),
            });
        }
        if original_width == 0 || original_height == 0 {
            return Err(WarpError::InvalidParameter {
                name: "original size",
                reason: format!("{original_width}x{original_height} is empty"),
            });
        }
        let dim = |d: u32| ((d as f64 * scale).round() as u32).max(1);
        Ok(Self {
            scale,
            original_width,
            original_height,
            preview_width: dim(original_width),
            preview_height: dim(original_height),
        })
    }

    /// Scale of 1: preview and original coincide.
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            scale: 1.0,
            original_width: width,
            original_height: height,
            preview_width: width,
            preview_height: height,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
    }

    #[inline]
    pub fn to_original(&self, p: PreviewPoint) -> OriginalPoint {
        p.scaled(1.0 / self.scale).retag()
    }

    #[inline]
    pub fn to_preview(&self, p: OriginalPoint) -> PreviewPoint {
        p.scaled(self.scale).retag()
    }

    pub fn quad_to_original(&self, q: &Quad<Preview>) -> Quad<Original> {
        q.map_points(|p| self.to_original(p))
    }

    pub fn quad_to_preview(&self, q: &Quad<Original>) -> Quad<Preview> {
        q.map_points(|p| self.to_preview(p))
    }
}

/// Largest scale `<= 1` that fits `width x height` inside `max_dimension`.
pub fn calculate_preview_scale(
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<PreviewScale, WarpError> {
    if max_dimension == 0 {
        return Err(WarpError::InvalidParameter {
            name: "max_dimension",
            reason: "must be positive".to_string(),
        });
    }
    let largest = width.max(height);
    if largest == 0 {
        return Err(WarpError::InvalidParameter {
            name: "original size",
            reason: format!("{width}x{height} is empty"),
        });
    }
    if largest <= max_dimension {
        return Ok(PreviewScale::identity(width, height));
    }
    let scale = (max_dimension as f64 / largest as f64).min(1.0);
    PreviewScale::new(scale, width, height)
}

pub fn preview_to_original(p: PreviewPoint, scale: &PreviewScale) -> OriginalPoint {
    scale.to_original(p)
}

pub fn original_to_preview(p: OriginalPoint, scale: &PreviewScale) -> PreviewPoint {
    scale.to_preview(p)
}

/// Rectangle inset by `margin` (fraction of each dimension) on every side.
///
/// Used to seed an editable quad before the user moves the handles.
pub fn create_default_corners<S: CoordSpace>(
    width: f64,
    height: f64,
    margin: f64,
) -> Result<Quad<S>, WarpError> {
    if !(0.0..0.5).contains(&margin) {
        return Err(WarpError::InvalidParameter {
            name: "margin",
            reason: format!("must be in [0, 0.5), got {margin}"),
        });
    }
    if !(width > 0.0 && height > 0.0) {
        return Err(WarpError::InvalidParameter {
            name: "image size",
            reason: format!("{width}x{height} is empty"),
        });
    }
    let mx = width * margin;
    let my = height * margin;
    Ok(Quad::new(
        Point::new(mx, my),
        Point::new(width - mx, my),
        Point::new(width - mx, height - my),
        Point::new(mx, height - my),
    ))
}

/// Keep a corner handle inside `[padding, dimension - padding]` on both axes.
///
/// If `2 * padding` exceeds a dimension the point collapses to its center.
pub fn clamp_point_to_image<S: CoordSpace>(
    p: Point<S>,
    width: f64,
    height: f64,
    padding: f64,
) -> Point<S> {
    let clamp_axis = |v: f64, dim: f64| {
        let lo = padding.min(dim / 2.0);
        let hi = (dim - padding).max(lo);
        if v.is_nan() {
            lo
        } else {
            v.clamp(lo, hi)
        }
    };
    Point::new(clamp_axis(p.x, width), clamp_axis(p.y, height))
}
