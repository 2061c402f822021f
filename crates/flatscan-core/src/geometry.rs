// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar geometry value types — points tagged with their coordinate space,
// labelled quadrilaterals, and axis-aligned extents.
//
// All pixel coordinates are y-down with the origin at the top-left corner of
// the image. Pixel (i, j) covers the unit square [i, i+1) x [j, j+1).

use std::fmt;
use std::marker::PhantomData;

use crate::error::{Result, ScanError};

/// A named coordinate space. Points from different spaces never mix without
/// an explicit mapping.
pub trait CoordinateSpace: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Short name used in log fields.
    const NAME: &'static str;
}

/// The camera sensor's native pixel space (frames and detections).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sensor;

/// The on-screen view space used for the live overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display;

/// The space of the flattened, orientation-normalised output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Corrected;

impl CoordinateSpace for Sensor {
    const NAME: &'static str = "sensor";
}

impl CoordinateSpace for Display {
    const NAME: &'static str = "display";
}

impl CoordinateSpace for Corrected {
    const NAME: &'static str = "corrected";
}

// ---------------------------------------------------------------------------
// Point2D
// ---------------------------------------------------------------------------

/// A 2D point in the coordinate space `S`.
#[derive(Clone, Copy, PartialEq)]
pub struct Point2D<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point2D<S> {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// Euclidean distance to another point in the same space.
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Re-label this point as belonging to space `T`.
    ///
    /// Only mappings that have actually converted the coordinates should call
    /// this.
    pub fn retag<T: CoordinateSpace>(self) -> Point2D<T> {
        Point2D::new(self.x, self.y)
    }
}

impl<S: CoordinateSpace> fmt::Debug for Point2D<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.2}, {:.2})", S::NAME, self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Quadrilateral
// ---------------------------------------------------------------------------

/// Four labelled corners of a document-like shape.
///
/// Labels refer to the orientation of the space the quad lives in; for a
/// detector result that is the sensor's native orientation, not the viewer's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral<S: CoordinateSpace> {
    pub top_left: Point2D<S>,
    pub top_right: Point2D<S>,
    pub bottom_right: Point2D<S>,
    pub bottom_left: Point2D<S>,
}

impl<S: CoordinateSpace> Quadrilateral<S> {
    pub fn new(
        top_left: Point2D<S>,
        top_right: Point2D<S>,
        bottom_right: Point2D<S>,
        bottom_left: Point2D<S>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Build a quad from `(x, y)` tuples in TL, TR, BR, BL order.
    pub fn from_tuples(corners: [(f64, f64); 4]) -> Self {
        let [tl, tr, br, bl] = corners.map(|(x, y)| Point2D::new(x, y));
        Self::new(tl, tr, br, bl)
    }

    /// Corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point2D<S>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Apply a point mapping to every corner, keeping the labels.
    pub fn map<T, F>(&self, f: F) -> Quadrilateral<T>
    where
        T: CoordinateSpace,
        F: Fn(Point2D<S>) -> Point2D<T>,
    {
        Quadrilateral::new(
            f(self.top_left),
            f(self.top_right),
            f(self.bottom_right),
            f(self.bottom_left),
        )
    }

    /// Shoelace area. Positive when TL -> TR -> BR -> BL runs clockwise on
    /// screen (y-down), negative for the mirrored winding.
    pub fn signed_area(&self) -> f64 {
        let c = self.corners();
        let mut twice = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        twice / 2.0
    }

    /// Bounding box of the four corners.
    pub fn bounding_extent(&self) -> Extent {
        Extent::bounding(&self.corners())
    }

    /// Reject quads that cannot be flattened.
    ///
    /// Every corner must turn the same way as a proper clockwise quad, by more
    /// than a tolerance relative to the quad's size. Collinear corners and
    /// re-entrant shapes fail this as well as mirrored winding.
    pub fn validate(&self) -> Result<()> {
        let c = self.corners();
        if let Some(bad) = c.iter().find(|p| !p.is_finite()) {
            return Err(ScanError::DegenerateGeometry(format!(
                "non-finite corner {bad:?}"
            )));
        }

        let longest_sq = (0..4)
            .map(|i| {
                let d = c[i].distance_to(&c[(i + 1) % 4]);
                d * d
            })
            .fold(0.0_f64, f64::max);
        if longest_sq <= f64::EPSILON {
            return Err(ScanError::DegenerateGeometry(
                "all corners coincide".into(),
            ));
        }

        let tolerance = longest_sq * 1e-9;
        for i in 0..4 {
            let prev = c[(i + 3) % 4];
            let cur = c[i];
            let next = c[(i + 1) % 4];
            let turn = (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x);
            if turn <= tolerance {
                return Err(ScanError::DegenerateGeometry(format!(
                    "corner {i} at {cur:?} is collinear, reflex, or wound backwards (turn {turn:.3e})"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extent
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle describing where content lives in its space.
///
/// The origin is not guaranteed to be (0, 0) once a transform has been
/// applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero-based extent of a `width` x `height` raster.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// Smallest extent containing every point.
    pub fn bounding<S: CoordinateSpace>(points: &[Point2D<S>]) -> Self {
        let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Centre of the extent, tagged with the caller's space.
    pub fn center<S: CoordinateSpace>(&self) -> Point2D<S> {
        Point2D::new(self.mid_x(), self.mid_y())
    }

    /// True when there is no area to rasterize.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Quadrilateral<Sensor> {
        Quadrilateral::from_tuples([(min, min), (max, min), (max, max), (min, max)])
    }

    /// A proper axis-aligned square passes validation with positive area.
    #[test]
    fn square_is_valid() {
        let quad = square(100.0, 900.0);
        assert!(quad.validate().is_ok());
        assert!((quad.signed_area() - 640_000.0).abs() < 1e-6);
    }

    /// All four corners on one line is rejected.
    #[test]
    fn collinear_quad_is_degenerate() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
        assert!(matches!(
            quad.validate(),
            Err(ScanError::DegenerateGeometry(_))
        ));
        assert!(quad.signed_area().abs() < 1e-9);
    }

    /// Three collinear corners (a triangle with a midpoint) is rejected.
    #[test]
    fn three_collinear_corners_is_degenerate() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (0.0, 80.0)]);
        assert!(quad.validate().is_err());
    }

    /// The mirrored winding has negative area and is rejected.
    #[test]
    fn mirrored_quad_is_degenerate() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]);
        assert!(quad.signed_area() < 0.0);
        assert!(quad.validate().is_err());
    }

    /// A dart-shaped (re-entrant) quad is rejected.
    #[test]
    fn reentrant_quad_is_degenerate() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (100.0, 0.0), (30.0, 30.0), (0.0, 100.0)]);
        assert!(quad.validate().is_err());
    }

    /// NaN corners are rejected rather than propagated.
    #[test]
    fn non_finite_corner_is_degenerate() {
        let mut quad = square(0.0, 10.0);
        quad.bottom_left = Point2D::new(f64::NAN, 3.0);
        assert!(quad.validate().is_err());
    }

    /// Thin but proper quads are still accepted.
    #[test]
    fn thin_rectangle_is_valid() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(0.0, 0.0), (1000.0, 0.0), (1000.0, 1.0), (0.0, 1.0)]);
        assert!(quad.validate().is_ok());
    }

    /// Bounding extent and midpoints for an offset quad.
    #[test]
    fn extent_of_offset_quad() {
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(-20.0, 5.0), (60.0, 0.0), (70.0, 40.0), (-10.0, 45.0)]);
        let extent = quad.bounding_extent();
        assert_eq!(extent, Extent::new(-20.0, 0.0, 90.0, 45.0));
        assert!((extent.mid_x() - 25.0).abs() < 1e-12);
        assert!((extent.mid_y() - 22.5).abs() < 1e-12);
        assert!(!extent.is_empty());
    }

    /// Zero-width and NaN extents count as empty.
    #[test]
    fn empty_extents() {
        assert!(Extent::new(5.0, 5.0, 0.0, 10.0).is_empty());
        assert!(Extent::new(0.0, 0.0, f64::NAN, 10.0).is_empty());
        assert!(!Extent::from_size(1, 1).is_empty());
    }

    /// Mapping keeps corner labels in place.
    #[test]
    fn map_preserves_labels() {
        let quad = square(0.0, 10.0);
        let swapped: Quadrilateral<Display> = quad.map(|p| Point2D::new(p.y, p.x));
        assert_eq!(swapped.top_right, Point2D::new(0.0, 10.0));
        assert_eq!(swapped.bottom_left, Point2D::new(10.0, 0.0));
    }
}
