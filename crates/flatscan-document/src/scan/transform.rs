// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 2D projective transforms as 3x3 homogeneous matrices.
//
// Matrices act on column vectors `[x, y, 1]^T`. `a.then(&b)` applies `a` first
// and `b` second, i.e. the matrix product `B * A`.

use flatscan_core::error::{Result, ScanError};
use flatscan_core::{CoordinateSpace, Point2D, Quadrilateral};
use imageproc::geometric_transformations::Projection;
use nalgebra::{Matrix3, SMatrix, SVector};
use tracing::debug;

/// Homogeneous weights closer to zero than this are treated as the line at
/// infinity.
const MIN_WEIGHT: f64 = 1e-12;

/// Largest corner misfit (in output pixels) accepted from the projective solve.
const MAX_SOLVE_RESIDUAL: f64 = 1e-6;

/// A composable affine or projective mapping of the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix3<f64>,
}

impl Transform {
    // -- Construction ---------------------------------------------------------

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wrap a matrix, rejecting non-finite or non-invertible ones.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ScanError::SingularTransform(
                "matrix has non-finite entries".into(),
            ));
        }
        let det = matrix.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON * matrix.norm_squared() {
            return Err(ScanError::SingularTransform(format!(
                "matrix is not invertible (det {det:.3e})"
            )));
        }
        Ok(Self { matrix })
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    /// Rotation about the origin by `radians` (y-down: positive turns
    /// clockwise on screen).
    ///
    /// Sine and cosine are snapped to exact 0/±1 for quarter turns so that
    /// rotated extents stay whole-pixel.
    pub fn rotation(radians: f64) -> Self {
        let snap = |v: f64| {
            if v.abs() < 1e-12 {
                0.0
            } else if (v.abs() - 1.0).abs() < 1e-12 {
                v.signum()
            } else {
                v
            }
        };
        let (sin, cos) = radians.sin_cos();
        let (sin, cos) = (snap(sin), snap(cos));
        Self {
            matrix: Matrix3::new(cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// Rotation by `radians` about `center`.
    ///
    /// Built in the only order that keeps `center` fixed: move the centre to
    /// the origin, rotate, move it back.
    pub fn rotation_about<S: CoordinateSpace>(radians: f64, center: Point2D<S>) -> Self {
        Self::translation(-center.x, -center.y)
            .then(&Self::rotation(radians))
            .then(&Self::translation(center.x, center.y))
    }

    /// Axis-aligned scaling about the origin.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// The unique projective map sending the quad's TL, TR, BR, BL corners to
    /// `(0,0)`, `(width,0)`, `(width,height)`, `(0,height)`.
    ///
    /// Both point sets are normalised first (source: centroid at the origin,
    /// mean distance sqrt(2); target: unit scale), then the standard
    /// eight-unknown system with `h22 = 1` is solved and de-normalised.
    pub fn quad_to_rect<S: CoordinateSpace>(
        quad: &Quadrilateral<S>,
        width: f64,
        height: f64,
    ) -> Result<Self> {
        let src = quad.corners();
        let dst = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)];

        let longest = width.max(height);
        if !(longest > 0.0 && longest.is_finite()) {
            return Err(ScanError::SingularTransform(format!(
                "target rectangle {width} x {height} has no area"
            )));
        }
        let target_scale = 1.0 / longest;
        let normalize = normalizing_similarity(&src)?;

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for (i, (p, &(u, v))) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y) = normalize.map_xy(p.x, p.y).ok_or_else(|| {
                ScanError::SingularTransform(format!("corner {p:?} cannot be normalised"))
            })?;
            let (u, v) = (u * target_scale, v * target_scale);
            let r0 = 2 * i;
            let r1 = r0 + 1;

            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let h = a.lu().solve(&b).ok_or_else(|| {
            ScanError::SingularTransform("projective system has no unique solution".into())
        })?;
        let normalized = Self::from_matrix(Matrix3::new(
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
        ))?;

        let transform = Self::from_matrix(
            normalize
                .then(&normalized)
                .then(&Self::scale(longest, longest))
                .matrix,
        )?;

        // A nearly singular system can "solve" to garbage; check the fit.
        for (p, &(u, v)) in src.iter().zip(dst.iter()) {
            let (x, y) = transform.map_xy(p.x, p.y).ok_or_else(|| {
                ScanError::SingularTransform(format!("corner {p:?} maps to infinity"))
            })?;
            let residual = (x - u).hypot(y - v);
            if !(residual <= MAX_SOLVE_RESIDUAL * (1.0 + longest)) {
                return Err(ScanError::SingularTransform(format!(
                    "projective solve is ill-conditioned (corner residual {residual:.3e})"
                )));
            }
        }

        debug!(width, height, matrix = ?transform.matrix, "Homography solved");
        Ok(transform)
    }

    // -- Composition ----------------------------------------------------------

    /// Apply `self`, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        Transform {
            matrix: next.matrix * self.matrix,
        }
    }

    pub fn inverse(&self) -> Result<Transform> {
        let inverse = self.matrix.try_inverse().ok_or_else(|| {
            ScanError::SingularTransform("matrix is not invertible".into())
        })?;
        Self::from_matrix(inverse)
    }

    // -- Application ----------------------------------------------------------

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Homogeneous weight of `(x, y)` under this transform.
    fn weight(&self, x: f64, y: f64) -> f64 {
        self.matrix[(2, 0)] * x + self.matrix[(2, 1)] * y + self.matrix[(2, 2)]
    }

    /// Map raw coordinates. `None` at (or numerically near) the line at
    /// infinity.
    pub fn map_xy(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.matrix;
        let w = self.weight(x, y);
        if !(w.abs() > MIN_WEIGHT) {
            return None;
        }
        let u = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
        let v = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
        (u.is_finite() && v.is_finite()).then_some((u, v))
    }

    /// Map a point from space `S` into space `T`.
    pub fn apply<S: CoordinateSpace, T: CoordinateSpace>(
        &self,
        point: Point2D<S>,
    ) -> Option<Point2D<T>> {
        self.map_xy(point.x, point.y).map(|(x, y)| Point2D::new(x, y))
    }

    /// Map every corner of a quad.
    ///
    /// Fails if any corner cannot be mapped, or if the corners fall on both
    /// sides of the horizon (the image of the quad would wrap through
    /// infinity).
    pub fn apply_quad<S: CoordinateSpace, T: CoordinateSpace>(
        &self,
        quad: &Quadrilateral<S>,
    ) -> Result<Quadrilateral<T>> {
        let weights = quad.corners().map(|p| self.weight(p.x, p.y));
        let all_positive = weights.iter().all(|&w| w > MIN_WEIGHT);
        let all_negative = weights.iter().all(|&w| w < -MIN_WEIGHT);
        if !(all_positive || all_negative) {
            return Err(ScanError::SingularTransform(format!(
                "quad straddles the horizon (weights {weights:?})"
            )));
        }

        let map = |p: Point2D<S>| {
            self.apply::<S, T>(p).ok_or_else(|| {
                ScanError::SingularTransform(format!("corner {p:?} maps to infinity"))
            })
        };
        Ok(Quadrilateral::new(
            map(quad.top_left)?,
            map(quad.top_right)?,
            map(quad.bottom_right)?,
            map(quad.bottom_left)?,
        ))
    }

    /// Convert to an `imageproc` projection for rasterization.
    pub fn to_projection(&self) -> Result<Projection> {
        let m = &self.matrix;
        let row_major = [
            m[(0, 0)] as f32,
            m[(0, 1)] as f32,
            m[(0, 2)] as f32,
            m[(1, 0)] as f32,
            m[(1, 1)] as f32,
            m[(1, 2)] as f32,
            m[(2, 0)] as f32,
            m[(2, 1)] as f32,
            m[(2, 2)] as f32,
        ];
        Projection::from_matrix(row_major).ok_or_else(|| {
            ScanError::SingularTransform("projection is not invertible in f32".into())
        })
    }
}

/// Similarity moving the points' centroid to the origin with mean distance
/// sqrt(2) (Hartley normalisation).
fn normalizing_similarity<S: CoordinateSpace>(points: &[Point2D<S>]) -> Result<Transform> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / n;
    if !(mean_dist > 0.0 && mean_dist.is_finite()) {
        return Err(ScanError::SingularTransform(
            "points cannot be normalised (coincident or non-finite)".into(),
        ));
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Transform::translation(-cx, -cy).then(&Transform::scale(s, s)))
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatscan_core::{Corrected, Sensor};

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    /// Composition order matters: translate-then-rotate differs from
    /// rotate-then-translate.
    #[test]
    fn composition_is_ordered() {
        let t = Transform::translation(10.0, 0.0);
        let r = Transform::rotation(std::f64::consts::FRAC_PI_2);

        let tr = t.then(&r).map_xy(0.0, 0.0).expect("finite");
        let rt = r.then(&t).map_xy(0.0, 0.0).expect("finite");
        assert!(close(tr, (0.0, 10.0)), "got {tr:?}");
        assert!(close(rt, (10.0, 0.0)), "got {rt:?}");
    }

    /// Quarter-turn rotations have exact integer entries.
    #[test]
    fn quarter_turn_is_exact() {
        let r = Transform::rotation(-std::f64::consts::FRAC_PI_2);
        assert_eq!(r.map_xy(3.0, 7.0), Some((7.0, -3.0)));
    }

    /// Rotating about a centre leaves the centre fixed and moves the top
    /// edge to the left for a -90° turn.
    #[test]
    fn rotation_about_keeps_pivot() {
        let center = Point2D::<Corrected>::new(200.0, 100.0);
        let r = Transform::rotation_about(-std::f64::consts::FRAC_PI_2, center);
        assert!(close(r.map_xy(200.0, 100.0).expect("finite"), (200.0, 100.0)));

        // Midpoint of the top edge of a 400x200 rectangle.
        let top_mid = r.map_xy(200.0, 0.0).expect("finite");
        assert!(close(top_mid, (100.0, 100.0)), "got {top_mid:?}");
    }

    /// The solved homography sends each corner to its rectangle corner.
    #[test]
    fn quad_to_rect_hits_corners() {
        let quad: Quadrilateral<Sensor> = Quadrilateral::from_tuples([
            (120.0, 80.0),
            (610.0, 140.0),
            (700.0, 590.0),
            (60.0, 520.0),
        ]);
        let h = Transform::quad_to_rect(&quad, 500.0, 400.0).expect("solve");
        let mapped: Quadrilateral<Corrected> = h.apply_quad(&quad).expect("map");
        assert!(close((mapped.top_left.x, mapped.top_left.y), (0.0, 0.0)));
        assert!(close((mapped.top_right.x, mapped.top_right.y), (500.0, 0.0)));
        assert!(close((mapped.bottom_right.x, mapped.bottom_right.y), (500.0, 400.0)));
        assert!(close((mapped.bottom_left.x, mapped.bottom_left.y), (0.0, 400.0)));
    }

    /// Collinear corners have no projective map to a rectangle.
    #[test]
    fn quad_to_rect_rejects_collinear() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert!(matches!(
            Transform::quad_to_rect(&quad, 10.0, 10.0),
            Err(ScanError::SingularTransform(_))
        ));
    }

    /// Inverse undoes the transform.
    #[test]
    fn inverse_round_trip() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(10.0, 10.0), (90.0, 20.0), (80.0, 95.0), (5.0, 85.0)]);
        let h = Transform::quad_to_rect(&quad, 100.0, 100.0).expect("solve");
        let back = h.then(&h.inverse().expect("invertible"));
        assert!(close(back.map_xy(42.0, 17.0).expect("finite"), (42.0, 17.0)));
    }

    /// A zero matrix is rejected up front.
    #[test]
    fn singular_matrix_rejected() {
        assert!(Transform::from_matrix(Matrix3::zeros()).is_err());
    }

    /// Points on the horizon line do not map.
    #[test]
    fn horizon_points_do_not_map() {
        let m = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -5.0);
        let t = Transform::from_matrix(m).expect("invertible");
        assert!(t.map_xy(5.0, 3.0).is_none());
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(t.apply_quad::<Sensor, Corrected>(&quad).is_err());
    }

    /// Conversion to an imageproc projection maps points the same way.
    #[test]
    fn projection_agrees() {
        let t = Transform::translation(3.0, -2.0).then(&Transform::rotation(0.3));
        let projection = t.to_projection().expect("projection");
        let (px, py) = projection * (5.0f32, 4.0f32);
        let (ex, ey) = t.map_xy(5.0, 4.0).expect("finite");
        assert!((px as f64 - ex).abs() < 1e-3 && (py as f64 - ey).abs() < 1e-3);
    }
}
