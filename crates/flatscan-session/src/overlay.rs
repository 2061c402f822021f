// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot overlay auto-hide. Each fresh detection supersedes the previous
// deadline, so the outline disappears only after a full quiet period.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::presenter::OverlayPresenter;

/// Hides the overlay once no detection has arrived for `timeout`.
///
/// Owned by the frame lane; rescheduling aborts the previous task before
/// starting a new one. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct HideTimer {
    timeout: Duration,
    pending: Option<JoinHandle<()>>,
}

impl HideTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cancel any pending hide and schedule a new one.
    pub fn reschedule(&mut self, overlay: Arc<dyn OverlayPresenter>) {
        self.cancel();
        let timeout = self.timeout;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            trace!("overlay timed out, hiding");
            overlay.hide_quad();
        }));
    }

    /// Drop the pending hide, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// Whether a hide is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for HideTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatscan_core::{Display, Quadrilateral};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingOverlay {
        hides: AtomicUsize,
    }

    impl OverlayPresenter for CountingOverlay {
        fn view_size(&self) -> (f64, f64) {
            (100.0, 100.0)
        }

        fn show_quad(&self, _quad: Quadrilateral<Display>) {}

        fn hide_quad(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// The hide fires once the timeout elapses, not before.
    #[tokio::test(start_paused = true)]
    async fn hides_after_timeout() {
        let overlay = Arc::new(CountingOverlay::default());
        let mut timer = HideTimer::new(Duration::from_millis(100));

        timer.reschedule(overlay.clone());
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    /// A newer detection pushes the deadline out; only one hide fires.
    #[tokio::test(start_paused = true)]
    async fn reschedule_supersedes_pending_hide() {
        let overlay = Arc::new(CountingOverlay::default());
        let mut timer = HideTimer::new(Duration::from_millis(100));

        timer.reschedule(overlay.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        timer.reschedule(overlay.clone());

        // Past the first deadline, before the second.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 1);
    }

    /// A cancelled timer never hides.
    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_hide() {
        let overlay = Arc::new(CountingOverlay::default());
        let mut timer = HideTimer::new(Duration::from_millis(100));

        timer.reschedule(overlay.clone());
        timer.cancel();
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 0);
    }
}
