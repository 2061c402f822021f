// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Flatscan.

use thiserror::Error;

/// Top-level error type for all Flatscan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Geometry errors --
    #[error("degenerate quadrilateral: {0}")]
    DegenerateGeometry(String),

    #[error("singular transform: {0}")]
    SingularTransform(String),

    #[error("empty output extent ({width} x {height})")]
    EmptyExtent { width: f64, height: f64 },

    // -- Collaborator errors --
    #[error("no camera device available")]
    DeviceUnavailable,

    // -- Raster errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Session plumbing --
    #[error("capture pipeline error: {0}")]
    Pipeline(String),

    // -- Configuration files --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether this failure only means "no corrected image this time".
    ///
    /// Geometry failures abort the capture silently; the live preview keeps
    /// running and the next tap starts a fresh attempt.
    pub fn is_silent_abort(&self) -> bool {
        matches!(
            self,
            Self::DegenerateGeometry(_) | Self::SingularTransform(_) | Self::EmptyExtent { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
