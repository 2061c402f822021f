// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Flatscan capture pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Quadrilateral, Sensor};

/// Unique identifier for one claimed capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A feature reported by the external detector for one frame.
///
/// Only the rectangle variant is ever flattened; everything else the detector
/// may report (faces, text regions, codes) is carried as `Other` and ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectedFeature {
    /// A four-cornered document-like shape in sensor coordinates.
    Rectangle(Quadrilateral<Sensor>),
    /// Any non-rectangle feature, identified by the detector's kind name.
    Other { kind: String },
}

impl DetectedFeature {
    /// The quad, if this is a rectangle feature.
    pub fn as_rectangle(&self) -> Option<&Quadrilateral<Sensor>> {
        match self {
            Self::Rectangle(quad) => Some(quad),
            Self::Other { .. } => None,
        }
    }
}

/// The first rectangle among a frame's features, if any.
pub fn first_rectangle(features: &[DetectedFeature]) -> Option<&Quadrilateral<Sensor>> {
    features.iter().find_map(DetectedFeature::as_rectangle)
}
