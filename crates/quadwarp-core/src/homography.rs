use crate::{CoordSpace, Point, Quad, WarpError};
use nalgebra::{Matrix3, Point2, SMatrix, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Pivots and determinants with a smaller magnitude are treated as zero.
pub const SINGULAR_EPS: f64 = 1e-10;

/// Projective transform in homogeneous coordinates: `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map `(x, y)` with perspective division.
    ///
    /// Points on the line at infinity (`w == 0`) come out non-finite; use
    /// [`Homography::try_apply`] when that matters.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    /// Like [`Homography::apply`] but `None` when `|w|` is below [`SINGULAR_EPS`].
    #[inline]
    pub fn try_apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w.abs() < SINGULAR_EPS {
            return None;
        }
        Some(Point2::new(v[0] / w, v[1] / w))
    }

    pub fn inverse(&self) -> Result<Self, WarpError> {
        invert_matrix3x3(&self.h).map(Self::new)
    }

    pub fn determinant(&self) -> f64 {
        determinant3(&self.h)
    }
}

/// Apply `h` to `(x, y)`: `w = h20*x + h21*y + h22`, then divide by `w`.
#[inline]
pub fn transform_point(h: &Matrix3<f64>, x: f64, y: f64) -> Point2<f64> {
    let w = h[(2, 0)] * x + h[(2, 1)] * y + h[(2, 2)];
    Point2::new(
        (h[(0, 0)] * x + h[(0, 1)] * y + h[(0, 2)]) / w,
        (h[(1, 0)] * x + h[(1, 1)] * y + h[(1, 2)]) / w,
    )
}

#[inline]
fn determinant3(m: &Matrix3<f64>) -> f64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Closed-form 3x3 inverse: adjugate (transposed cofactors) over the determinant.
pub fn invert_matrix3x3(m: &Matrix3<f64>) -> Result<Matrix3<f64>, WarpError> {
    let det = determinant3(m);
    if !det.is_finite() || det.abs() < SINGULAR_EPS {
        return Err(WarpError::SingularMatrix { det });
    }
    let inv_det = 1.0 / det;

    #[rustfmt::skip]
    let adj = Matrix3::new(
        m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
        m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)],
        m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
        m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)],
        m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
        m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)],
        m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
        m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)],
        m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
    );
    Ok(adj * inv_det)
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points4(pts: &[Point2<f64>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

/// Solve the 8x8 system stored as an augmented 8x9 matrix in place.
///
/// Gauss-Jordan with partial pivoting. A pivot below [`SINGULAR_EPS`] makes
/// the system degenerate; it is reported instead of skipped.
fn gauss_jordan_8x9(m: &mut SMatrix<f64, 8, 9>) -> Result<[f64; 8], WarpError> {
    const N: usize = 8;
    for col in 0..N {
        let mut pivot_row = col;
        let mut pivot_abs = m[(col, col)].abs();
        for row in (col + 1)..N {
            let a = m[(row, col)].abs();
            if a > pivot_abs {
                pivot_abs = a;
                pivot_row = row;
            }
        }
        if !(pivot_abs >= SINGULAR_EPS) {
            return Err(WarpError::NumericalDegeneracy { column: col });
        }
        if pivot_row != col {
            m.swap_rows(col, pivot_row);
        }

        let pivot = m[(col, col)];
        for j in col..=N {
            m[(col, j)] /= pivot;
        }

        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = m[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in col..=N {
                m[(row, j)] -= factor * m[(col, j)];
            }
        }
    }

    let mut x = [0.0; N];
    for (i, xi) in x.iter_mut().enumerate() {
        *xi = m[(i, N)];
    }
    Ok(x)
}

/// Compute H such that `dst ~ H * src` from exactly 4 correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Unknowns are
/// `[h0..h7]` with `h8 = 1`; for each correspondence `(x, y) -> (u, v)`:
///
/// ```text
/// h0 x + h1 y + h2 - u h6 x - u h7 y = u
/// h3 x + h4 y + h5 - v h6 x - v h7 y = v
/// ```
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn homography_from_4pt(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Result<Homography, WarpError> {
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);

    let mut a = SMatrix::<f64, 8, 9>::zeros();
    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        a[(r0, 8)] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        a[(r1, 8)] = v;
    }

    let h = gauss_jordan_8x9(&mut a).inspect_err(|err| {
        log::warn!("4-point homography rejected: {err}");
    })?;

    #[rustfmt::skip]
    let hn = Matrix3::<f64>::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0,
    );
    let det_n = determinant3(&hn);
    if !det_n.is_finite() || det_n.abs() < SINGULAR_EPS {
        log::warn!("4-point homography rejected: normalized determinant {det_n:e}");
        return Err(WarpError::NumericalDegeneracy { column: 8 });
    }

    // Denormalize: H = T_dst^-1 * Hn * T_src, then rescale so h8 = 1.
    let t_dst_inv = invert_matrix3x3(&t_dst)?;
    let h_den = t_dst_inv * hn * t_src;
    let s = h_den[(2, 2)];
    if s.abs() < SINGULAR_EPS {
        return Err(WarpError::NumericalDegeneracy { column: 8 });
    }

    Ok(Homography::new(h_den / s))
}

/// Homography mapping the corners of `src` onto the corners of `dst`.
///
/// Both quads must use the same corner order; the spaces may differ, e.g. an
/// output rectangle mapped onto a quad in the original image.
pub fn compute_homography<A: CoordSpace, B: CoordSpace>(
    src: &Quad<A>,
    dst: &Quad<B>,
) -> Result<Homography, WarpError> {
    let s = src.corners().map(Point::to_na);
    let d = dst.corners().map(Point::to_na);
    homography_from_4pt(&s, &d)
}
