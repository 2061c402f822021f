// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// How the natural output size is derived from the quad's side lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizingRule {
    /// Mean of each pair of opposite sides.
    #[default]
    AverageSides,
    /// Longer of each pair of opposite sides (never downsamples an edge).
    LongestSides,
}

/// Pixel sampling used when rasterizing the corrected image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Rigid rotation applied after unwarping, about the unwarped image's centre.
///
/// The sensor's native axis is a quarter turn away from the portrait UI. The
/// right value depends on how the camera is mounted, so it is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputOrientation {
    /// -90°: the sensor's top edge ends up on the display's left.
    #[default]
    RotateLeft,
    /// +90°: the sensor's top edge ends up on the display's right.
    RotateRight,
    /// No rotation.
    Upright,
}

impl OutputOrientation {
    /// Rotation angle in radians (y-down convention, negative is
    /// counter-clockwise on screen).
    pub fn radians(self) -> f64 {
        match self {
            Self::RotateLeft => -std::f64::consts::FRAC_PI_2,
            Self::RotateRight => std::f64::consts::FRAC_PI_2,
            Self::Upright => 0.0,
        }
    }
}

/// Settings for the perspective correction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub sizing: SizingRule,
    pub interpolation: InterpolationMode,
    pub orientation: OutputOrientation,
    /// Upper bound on either output side, in pixels. Larger natural sizes are
    /// scaled down uniformly.
    pub max_output_side: u32,
    /// RGBA fill for output pixels that sample outside the source.
    pub background: [u8; 4],
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            sizing: SizingRule::AverageSides,
            interpolation: InterpolationMode::Bilinear,
            orientation: OutputOrientation::RotateLeft,
            max_output_side: 8192,
            background: [255, 255, 255, 255],
        }
    }
}

/// Settings for the live detection overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Hide the outline if no newer detection arrives within this window.
    pub hide_after_ms: u64,
    /// Swap x and y when mapping sensor corners to the view.
    pub swap_axes: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hide_after_ms: 2000,
            swap_axes: true,
        }
    }
}

/// Settings for showing the corrected image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// How long the corrected image stays up before detection resumes.
    pub dwell_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { dwell_ms: 2000 }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub correction: CorrectionConfig,
    pub overlay: OverlayConfig,
    pub presentation: PresentationConfig,
}

impl ScanConfig {
    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Read settings, falling back to defaults if the file is missing or
    /// invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn overlay_timeout(&self) -> Duration {
        Duration::from_millis(self.overlay.hide_after_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.presentation.dwell_ms)
    }
}
