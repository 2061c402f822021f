// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan-document — Raster handling and perspective correction for Flatscan.
//
// Provides the immutable raster type that flows through the capture pipeline
// and the correction pass that flattens a detected quadrilateral into an
// upright rectangular image (projective unwarp, orientation rotation about the
// unwarped centre, extent-based rasterization).

pub mod image;
pub mod scan;

// Re-export the primary types so callers can use `flatscan_document::RasterImage` etc.
pub use crate::image::raster::RasterImage;
pub use scan::correct::{CorrectionPlan, PerspectiveCorrector};
pub use scan::transform::Transform;
