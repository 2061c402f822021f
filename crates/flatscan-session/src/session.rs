// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live scan session — connects the frame feed to the overlay and runs each
// claimed capture through correction and presentation.
//
// # Lanes
//
//   - frame lane    (tokio task)      newest frame only; overlay update and
//                                     capture claim happen synchronously here
//   - compute lane  (blocking pool)   `PerspectiveCorrector::correct`
//   - display lane  (tokio task)      present, dwell, dismiss, resume
//
// Lanes share nothing mutable except `CaptureState`. The corrected image
// moves from the compute lane to the display lane through an mpsc channel
// and from there into the presenter by value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use flatscan_core::error::{Result, ScanError};
use flatscan_core::{CaptureId, Quadrilateral, ScanConfig, Sensor, first_rectangle};
use flatscan_document::{PerspectiveCorrector, RasterImage};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::claim::CaptureState;
use crate::frames::{Frame, FrameReceiver};
use crate::mapping::DisplayMapping;
use crate::overlay::HideTimer;
use crate::presenter::{ImagePresenter, OverlayPresenter};

/// A finished correction on its way to the presenter.
#[derive(Debug)]
pub struct CorrectedCapture {
    pub id: CaptureId,
    /// Sequence number of the frame the capture was taken from.
    pub frame_sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub image: RasterImage,
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionStats {
    corrections_dispatched: AtomicU64,
    corrections_failed: AtomicU64,
    images_presented: AtomicU64,
    presentations_failed: AtomicU64,
}

// ---------------------------------------------------------------------------
// ScanSession
// ---------------------------------------------------------------------------

/// A configured, not yet running, scan session.
pub struct ScanSession {
    config: ScanConfig,
    corrector: Arc<PerspectiveCorrector>,
    overlay: Arc<dyn OverlayPresenter>,
    presenter: Arc<dyn ImagePresenter>,
    state: Arc<CaptureState>,
}

impl ScanSession {
    pub fn new(
        config: ScanConfig,
        overlay: Arc<dyn OverlayPresenter>,
        presenter: Arc<dyn ImagePresenter>,
    ) -> Self {
        let corrector = Arc::new(PerspectiveCorrector::new(config.correction.clone()));
        Self {
            config,
            corrector,
            overlay,
            presenter,
            state: Arc::new(CaptureState::new()),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start the frame and display lanes. Must be called inside a tokio
    /// runtime.
    pub fn spawn(self, frames: FrameReceiver) -> SessionHandle {
        let stats = Arc::new(SessionStats::default());
        let shutdown = Arc::new(Notify::new());

        // One capture is in flight at a time (detection is paused until the
        // display lane resumes it), so a single slot is enough.
        let (display_tx, display_rx) = mpsc::channel(1);

        let display_task = tokio::spawn(display_lane(
            display_rx,
            Arc::clone(&self.presenter),
            Arc::clone(&self.state),
            Arc::clone(&stats),
            self.config.dwell(),
        ));

        let lane = FrameLane {
            overlay: Arc::clone(&self.overlay),
            hide_timer: HideTimer::new(self.config.overlay_timeout()),
            swap_axes: self.config.overlay.swap_axes,
            corrector: Arc::clone(&self.corrector),
            state: Arc::clone(&self.state),
            stats: Arc::clone(&stats),
            display_tx,
        };
        let frame_task = tokio::spawn(lane.run(frames, Arc::clone(&shutdown)));

        info!(
            dwell_ms = self.config.presentation.dwell_ms,
            hide_after_ms = self.config.overlay.hide_after_ms,
            "Scan session started"
        );

        SessionHandle {
            state: self.state,
            stats,
            shutdown,
            frame_task,
            display_task,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Control surface of a running session.
pub struct SessionHandle {
    state: Arc<CaptureState>,
    stats: Arc<SessionStats>,
    shutdown: Arc<Notify>,
    frame_task: JoinHandle<Result<()>>,
    display_task: JoinHandle<()>,
}

impl SessionHandle {
    /// The user tapped the shutter. The next frame with a rectangle claims it.
    pub fn request_capture(&self) {
        self.state.request_capture();
    }

    pub fn state(&self) -> &Arc<CaptureState> {
        &self.state
    }

    /// Corrections handed to the compute lane.
    pub fn corrections_dispatched(&self) -> u64 {
        self.stats.corrections_dispatched.load(Ordering::Relaxed)
    }

    /// Corrections that aborted without producing an image.
    pub fn corrections_failed(&self) -> u64 {
        self.stats.corrections_failed.load(Ordering::Relaxed)
    }

    pub fn images_presented(&self) -> u64 {
        self.stats.images_presented.load(Ordering::Relaxed)
    }

    /// Corrected images the presenter refused.
    pub fn presentations_failed(&self) -> u64 {
        self.stats.presentations_failed.load(Ordering::Relaxed)
    }

    /// Captures that have reached a final outcome, shown or not.
    pub fn captures_settled(&self) -> u64 {
        self.images_presented() + self.presentations_failed() + self.corrections_failed()
    }

    /// Stop consuming frames and wait for both lanes to finish.
    ///
    /// A correction already running is not cancelled; it completes and is
    /// presented for the full dwell before this returns.
    ///
    /// Returns `DeviceUnavailable` if the frame feed closed without ever
    /// delivering a frame.
    pub async fn shutdown(self) -> Result<()> {
        info!("Stopping scan session");
        self.shutdown.notify_one();

        let frames = self
            .frame_task
            .await
            .map_err(|e| ScanError::Pipeline(format!("frame lane join: {e}")))?;
        self.display_task
            .await
            .map_err(|e| ScanError::Pipeline(format!("display lane join: {e}")))?;
        frames?;

        info!("Scan session stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Frame lane
// ---------------------------------------------------------------------------

struct FrameLane {
    overlay: Arc<dyn OverlayPresenter>,
    hide_timer: HideTimer,
    swap_axes: bool,
    corrector: Arc<PerspectiveCorrector>,
    state: Arc<CaptureState>,
    stats: Arc<SessionStats>,
    display_tx: mpsc::Sender<CorrectedCapture>,
}

impl FrameLane {
    async fn run(mut self, mut frames: FrameReceiver, shutdown: Arc<Notify>) -> Result<()> {
        let outcome = loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("frame lane received shutdown signal");
                    break Ok(());
                }

                frame = frames.next() => {
                    match frame {
                        Some(frame) => self.on_frame(frame),
                        None if frames.received_any() => {
                            info!("Frame feed closed");
                            break Ok(());
                        }
                        None => {
                            warn!("Frame feed closed before delivering any frame");
                            break Err(ScanError::DeviceUnavailable);
                        }
                    }
                }
            }
        };
        debug!(skipped = frames.skipped(), "frame lane stopped");
        outcome
    }

    fn on_frame(&mut self, frame: Arc<Frame>) {
        if !self.state.is_detecting() {
            trace!(sequence = frame.sequence, "detection paused, frame ignored");
            return;
        }
        let Some(quad) = first_rectangle(&frame.features).copied() else {
            return;
        };

        self.update_overlay(&frame, &quad);

        if self.state.try_claim() {
            self.dispatch(frame, quad);
        }
    }

    fn update_overlay(&mut self, frame: &Frame, quad: &Quadrilateral<Sensor>) {
        let sensor_size = (frame.image.width(), frame.image.height());
        match DisplayMapping::new(sensor_size, self.overlay.view_size(), self.swap_axes) {
            Some(mapping) => {
                self.overlay.show_quad(mapping.to_display(quad));
                self.hide_timer.reschedule(Arc::clone(&self.overlay));
            }
            None => {
                debug!(?sensor_size, "no display mapping for frame, overlay not updated");
            }
        }
    }

    /// Hand the claimed frame to the compute lane.
    fn dispatch(&self, frame: Arc<Frame>, quad: Quadrilateral<Sensor>) {
        if !self.state.pause_detection() {
            warn!(sequence = frame.sequence, "detection was already paused at claim time");
        }

        let id = CaptureId::new();
        let captured_at = Utc::now();
        let frame_sequence = frame.sequence;
        self.stats.corrections_dispatched.fetch_add(1, Ordering::Relaxed);
        info!(%id, frame_sequence, "Capture claimed, correcting");

        let corrector = Arc::clone(&self.corrector);
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);
        let display_tx = self.display_tx.clone();

        tokio::spawn(async move {
            let image = Arc::clone(&frame.image);
            let outcome =
                tokio::task::spawn_blocking(move || corrector.correct(&image, &quad)).await;

            match outcome {
                Ok(Ok(image)) => {
                    let capture = CorrectedCapture {
                        id,
                        frame_sequence,
                        captured_at,
                        image,
                    };
                    let Err(e) = display_tx.try_send(capture) else {
                        return;
                    };
                    error!(%id, error = %e, "display lane unavailable, capture dropped");
                }
                Ok(Err(e)) if e.is_silent_abort() => {
                    warn!(%id, error = %e, "Correction aborted, no image produced");
                }
                Ok(Err(e)) => error!(%id, error = %e, "Correction failed"),
                Err(e) => error!(%id, error = %e, "correction task panicked"),
            }

            stats.corrections_failed.fetch_add(1, Ordering::Relaxed);
            state.resume_detection();
            debug!(%id, "detection resumed after failed capture");
        });
    }
}

// ---------------------------------------------------------------------------
// Display lane
// ---------------------------------------------------------------------------

async fn display_lane(
    mut captures: mpsc::Receiver<CorrectedCapture>,
    presenter: Arc<dyn ImagePresenter>,
    state: Arc<CaptureState>,
    stats: Arc<SessionStats>,
    dwell: Duration,
) {
    while let Some(capture) = captures.recv().await {
        let id = capture.id;
        let (width, height) = (capture.image.width(), capture.image.height());

        match presenter.present(capture) {
            Ok(()) => {
                stats.images_presented.fetch_add(1, Ordering::Relaxed);
                info!(%id, width, height, "Corrected image presented");
                tokio::time::sleep(dwell).await;
                if let Err(e) = presenter.dismiss(id) {
                    warn!(%id, error = %e, "failed to dismiss corrected image");
                }
            }
            Err(e) => {
                stats.presentations_failed.fetch_add(1, Ordering::Relaxed);
                warn!(%id, error = %e, "failed to present corrected image");
            }
        }

        state.resume_detection();
        debug!(%id, "detection resumed");
    }
    debug!("display lane stopped");
}
