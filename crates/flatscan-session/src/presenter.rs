// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic presenter seams. The native UI implements these; the
// logging stub stands in on hosts without a screen (desktop, CI).

use flatscan_core::error::Result;
use flatscan_core::{CaptureId, Display, Quadrilateral};
use tracing::{debug, info};

use crate::session::CorrectedCapture;

/// Draws the live outline of the detected document.
pub trait OverlayPresenter: Send + Sync {
    /// Size of the preview view in display points.
    fn view_size(&self) -> (f64, f64);

    /// Draw or move the outline. Called from the frame lane, so it must be
    /// cheap and must not block.
    fn show_quad(&self, quad: Quadrilateral<Display>);

    /// Remove the outline (auto-hide after no fresh detection).
    fn hide_quad(&self);
}

/// Shows a finished corrected capture.
pub trait ImagePresenter: Send + Sync {
    /// Take ownership of the corrected image and put it on screen.
    fn present(&self, capture: CorrectedCapture) -> Result<()>;

    /// Take the image down again once the dwell has elapsed.
    fn dismiss(&self, id: CaptureId) -> Result<()>;
}

/// No-op presenter that only logs, returned for hosts without a native UI.
#[derive(Debug, Clone)]
pub struct LoggingPresenter {
    view_size: (f64, f64),
}

impl LoggingPresenter {
    pub fn new(view_width: f64, view_height: f64) -> Self {
        Self {
            view_size: (view_width, view_height),
        }
    }
}

impl OverlayPresenter for LoggingPresenter {
    fn view_size(&self) -> (f64, f64) {
        self.view_size
    }

    fn show_quad(&self, quad: Quadrilateral<Display>) {
        debug!(?quad, "OverlayPresenter::show_quad on logging presenter");
    }

    fn hide_quad(&self) {
        debug!("OverlayPresenter::hide_quad on logging presenter");
    }
}

impl ImagePresenter for LoggingPresenter {
    fn present(&self, capture: CorrectedCapture) -> Result<()> {
        info!(
            id = %capture.id,
            width = capture.image.width(),
            height = capture.image.height(),
            "ImagePresenter::present on logging presenter"
        );
        Ok(())
    }

    fn dismiss(&self, id: CaptureId) -> Result<()> {
        info!(%id, "ImagePresenter::dismiss on logging presenter");
        Ok(())
    }
}
