// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sensor → display mapping for the live overlay.
//
// The sensor delivers landscape frames while the preview is portrait, so the
// overlay swaps axes before scaling. This mapping is for drawing only; the
// corrector always works on the untouched sensor quad.

use flatscan_core::{Display, Point2D, Quadrilateral, Sensor};

/// Uniform scale plus optional axis swap from sensor pixels to view points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    scale: f64,
    swap_axes: bool,
}

impl DisplayMapping {
    /// Fit the (possibly rotated) sensor frame inside the view.
    ///
    /// Returns `None` for empty or non-finite sizes, where no sensible scale
    /// exists.
    pub fn new(sensor_size: (u32, u32), view_size: (f64, f64), swap_axes: bool) -> Option<Self> {
        let (sensor_w, sensor_h) = (f64::from(sensor_size.0), f64::from(sensor_size.1));
        let (view_w, view_h) = view_size;
        if !(view_w.is_finite() && view_h.is_finite()) {
            return None;
        }

        let scale = if swap_axes {
            (view_w / sensor_h).min(view_h / sensor_w)
        } else {
            (view_w / sensor_w).min(view_h / sensor_h)
        };

        (scale.is_finite() && scale > 0.0).then_some(Self { scale, swap_axes })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn swaps_axes(&self) -> bool {
        self.swap_axes
    }

    pub fn to_display_point(&self, point: Point2D<Sensor>) -> Point2D<Display> {
        let (x, y) = if self.swap_axes {
            (point.y, point.x)
        } else {
            (point.x, point.y)
        };
        Point2D::new(x * self.scale, y * self.scale)
    }

    /// Map every corner, keeping its label.
    pub fn to_display(&self, quad: &Quadrilateral<Sensor>) -> Quadrilateral<Display> {
        quad.map(|p| self.to_display_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Landscape 1920x1080 sensor into a portrait 540x960 view: the swap makes
    /// the sensor's height the view's width, so the fit is exactly 0.5.
    #[test]
    fn swapped_scale_fits_rotated_frame() {
        let mapping = DisplayMapping::new((1920, 1080), (540.0, 960.0), true).expect("mapping");
        assert!((mapping.scale() - 0.5).abs() < 1e-12);
    }

    /// The limiting axis wins.
    #[test]
    fn scale_uses_the_tighter_axis() {
        // view_w / sensor_h = 0.5, view_h / sensor_w = 0.25
        let mapping = DisplayMapping::new((4000, 1000), (500.0, 1000.0), true).expect("mapping");
        assert!((mapping.scale() - 0.25).abs() < 1e-12);

        let upright = DisplayMapping::new((1000, 500), (250.0, 500.0), false).expect("mapping");
        assert!((upright.scale() - 0.25).abs() < 1e-12);
    }

    /// Corners swap x/y, scale, and keep their labels.
    #[test]
    fn quad_corners_swap_and_scale() {
        let mapping = DisplayMapping::new((1920, 1080), (540.0, 960.0), true).expect("mapping");
        let quad: Quadrilateral<Sensor> =
            Quadrilateral::from_tuples([(100.0, 200.0), (900.0, 220.0), (880.0, 700.0), (120.0, 680.0)]);

        let shown = mapping.to_display(&quad);
        assert_eq!(shown.top_left, Point2D::new(100.0, 50.0));
        assert_eq!(shown.top_right, Point2D::new(110.0, 450.0));
        assert_eq!(shown.bottom_right, Point2D::new(350.0, 440.0));
        assert_eq!(shown.bottom_left, Point2D::new(340.0, 60.0));
    }

    /// Without the swap, x stays x.
    #[test]
    fn no_swap_keeps_axes() {
        let mapping = DisplayMapping::new((200, 100), (400.0, 200.0), false).expect("mapping");
        let p = mapping.to_display_point(Point2D::new(10.0, 30.0));
        assert_eq!(p, Point2D::new(20.0, 60.0));
    }

    /// Zero or NaN sizes give no mapping instead of an infinite scale.
    #[test]
    fn empty_sizes_have_no_mapping() {
        assert!(DisplayMapping::new((0, 0), (400.0, 800.0), true).is_none());
        assert!(DisplayMapping::new((640, 480), (0.0, 800.0), true).is_none());
        assert!(DisplayMapping::new((640, 480), (f64::NAN, 800.0), false).is_none());
    }
}
