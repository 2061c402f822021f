// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — projective/affine transforms and perspective correction
// of a detected document quadrilateral.

pub mod correct;
pub mod transform;

pub use correct::{CorrectionPlan, PerspectiveCorrector};
pub use transform::Transform;
