// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction — flatten a detected document quadrilateral into an
// upright rectangular image.

use flatscan_core::config::{CorrectionConfig, InterpolationMode, SizingRule};
use flatscan_core::error::{Result, ScanError};
use flatscan_core::{Corrected, Extent, Point2D, Quadrilateral, Sensor};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, warp_into};
use tracing::{debug, info, instrument};

use crate::image::raster::RasterImage;
use crate::scan::transform::Transform;

/// The geometry of one correction pass, computed before any pixel is touched.
#[derive(Debug, Clone)]
pub struct CorrectionPlan {
    /// Natural (possibly capped) size of the flattened quad, before rotation.
    pub output_size: (u32, u32),
    /// Projective map from the source onto `[0, w] x [0, h]`.
    pub unwarp: Transform,
    /// Bounding box of the unwarped quad.
    pub intermediate_extent: Extent,
    /// Rotation about the centre of `intermediate_extent`.
    pub orientation: Transform,
    /// `unwarp` followed by `orientation`.
    pub transform: Transform,
    /// Bounding box of the fully transformed quad; the output raster covers
    /// exactly this region.
    pub final_extent: Extent,
}

impl CorrectionPlan {
    /// Where a source point ends up in the corrected image's space.
    pub fn map_point(&self, point: Point2D<Sensor>) -> Option<Point2D<Corrected>> {
        self.transform.apply(point)
    }
}

/// Maps a quadrilateral region of a source image onto a flat, upright
/// rectangle.
///
/// ## Pipeline
///
/// 1. Validate the quad (non-collinear, positive area, convex)
/// 2. Derive the output size from the quad's side lengths
/// 3. Solve the projective transform sending TL, TR, BR, BL to the corners
///    of that rectangle
/// 4. Rotate about the centre of the *unwarped* extent so the sensor's
///    native axis matches the viewer's orientation
/// 5. Rasterize into a buffer covering the final extent via
///    `imageproc::geometric_transformations::warp_into`
///
/// Every step that cannot produce a sensible result fails with a
/// silent-abort error; nothing here panics on bad geometry.
#[derive(Debug, Clone, Default)]
pub struct PerspectiveCorrector {
    config: CorrectionConfig,
}

impl PerspectiveCorrector {
    pub fn new(config: CorrectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    // -- Geometry -------------------------------------------------------------

    /// Side lengths reduced to a width and height by the sizing rule.
    fn natural_size(&self, quad: &Quadrilateral<Sensor>) -> (f64, f64) {
        let top = quad.top_left.distance_to(&quad.top_right);
        let bottom = quad.bottom_left.distance_to(&quad.bottom_right);
        let left = quad.top_left.distance_to(&quad.bottom_left);
        let right = quad.top_right.distance_to(&quad.bottom_right);

        match self.config.sizing {
            SizingRule::AverageSides => ((top + bottom) / 2.0, (left + right) / 2.0),
            SizingRule::LongestSides => (top.max(bottom), left.max(right)),
        }
    }

    /// Whole-pixel output size, scaled down uniformly to respect
    /// `max_output_side`. Any positive side is at least one pixel.
    fn output_size(&self, quad: &Quadrilateral<Sensor>) -> Result<(u32, u32)> {
        let (width, height) = self.natural_size(quad);
        let cap = self.config.max_output_side.max(1) as f64;
        let longest = width.max(height);
        let scale = if longest > cap { cap / longest } else { 1.0 };

        let (width, height) = (width * scale, height * scale);
        if Extent::new(0.0, 0.0, width, height).is_empty() {
            return Err(ScanError::EmptyExtent { width, height });
        }
        if scale < 1.0 {
            debug!(scale, width, height, "Output size capped");
        }
        Ok((whole_pixels(width), whole_pixels(height)))
    }

    /// Compute the full correction geometry for `quad`.
    #[instrument(skip(self), level = "debug")]
    pub fn plan(&self, quad: &Quadrilateral<Sensor>) -> Result<CorrectionPlan> {
        quad.validate()?;

        let output_size = self.output_size(quad)?;
        let unwarp = Transform::quad_to_rect(quad, output_size.0 as f64, output_size.1 as f64)?;

        let unwarped: Quadrilateral<Corrected> = unwarp.apply_quad(quad)?;
        let intermediate_extent = unwarped.bounding_extent();

        let orientation = Transform::rotation_about(
            self.config.orientation.radians(),
            intermediate_extent.center::<Corrected>(),
        );
        let transform = unwarp.then(&orientation);

        let oriented: Quadrilateral<Corrected> = transform.apply_quad(quad)?;
        let final_extent = oriented.bounding_extent();

        debug!(
            ?output_size,
            ?intermediate_extent,
            ?final_extent,
            "Correction planned"
        );

        Ok(CorrectionPlan {
            output_size,
            unwarp,
            intermediate_extent,
            orientation,
            transform,
            final_extent,
        })
    }

    // -- Rasterization --------------------------------------------------------

    /// Flatten `quad` out of `source`.
    ///
    /// `quad` must be in `source`'s own coordinate space (sensor space for a
    /// camera frame, never display-mapped). The returned image's extent is
    /// the final extent of the plan, origin included.
    #[instrument(
        skip_all,
        fields(src_w = source.width(), src_h = source.height())
    )]
    pub fn correct(&self, source: &RasterImage, quad: &Quadrilateral<Sensor>) -> Result<RasterImage> {
        let plan = self.plan(quad)?;
        let extent = plan.final_extent;

        if extent.is_empty() {
            return Err(ScanError::EmptyExtent {
                width: extent.width,
                height: extent.height,
            });
        }
        let (out_w, out_h) = (whole_pixels(extent.width), whole_pixels(extent.height));

        // Pixel (i, j) is centred at (origin + i + 0.5, origin + j + 0.5) on
        // both sides of the warp.
        let src_extent = source.extent();
        let to_buffer = Transform::translation(src_extent.x + 0.5, src_extent.y + 0.5)
            .then(&plan.transform)
            .then(&Transform::translation(-extent.x - 0.5, -extent.y - 0.5));
        let projection = to_buffer.to_projection()?;

        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(
            source.pixels(),
            &projection,
            interpolation(self.config.interpolation),
            Rgba(self.config.background),
            &mut output,
        );

        info!(
            out_w = output.width(),
            out_h = output.height(),
            origin_x = extent.x,
            origin_y = extent.y,
            "Perspective correction applied"
        );

        Ok(RasterImage::with_origin(output, extent.x, extent.y))
    }
}

/// Round a positive size to whole pixels, never below one.
fn whole_pixels(size: f64) -> u32 {
    size.round().max(1.0) as u32
}

fn interpolation(mode: InterpolationMode) -> Interpolation {
    match mode {
        InterpolationMode::Nearest => Interpolation::Nearest,
        InterpolationMode::Bilinear => Interpolation::Bilinear,
        InterpolationMode::Bicubic => Interpolation::Bicubic,
    }
}

// -- Tests --------------------------------------------------------------------
