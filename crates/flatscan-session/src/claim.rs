// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture claim flags shared between the control, frame, and compute lanes.
//
// Rapid taps and back-to-back frames must never start two corrections for
// one request, so "wants capture" is consumed with a single atomic swap and
// "detecting" is paused with a compare-exchange.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

/// The only mutable state shared between lanes.
#[derive(Debug)]
pub struct CaptureState {
    /// Set by a tap, cleared by whichever frame claims it.
    wants_capture: AtomicBool,
    /// False while a capture is being corrected or shown.
    detecting: AtomicBool,
    /// Taps received (including ones folded into a pending request).
    requests: AtomicU64,
    /// Requests actually claimed by a frame.
    claims: AtomicU64,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureState {
    /// Detection enabled, no capture pending.
    pub fn new() -> Self {
        Self {
            wants_capture: AtomicBool::new(false),
            detecting: AtomicBool::new(true),
            requests: AtomicU64::new(0),
            claims: AtomicU64::new(0),
        }
    }

    /// Record a tap. Repeated taps before a claim fold into one request.
    pub fn request_capture(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let already = self.wants_capture.swap(true, Ordering::AcqRel);
        debug!(already_pending = already, "capture requested");
    }

    /// Whether a request is waiting for a frame.
    pub fn capture_pending(&self) -> bool {
        self.wants_capture.load(Ordering::Acquire)
    }

    /// Read-and-clear the request. Exactly one caller sees `true` per request.
    pub fn try_claim(&self) -> bool {
        let claimed = self.wants_capture.swap(false, Ordering::AcqRel);
        if claimed {
            self.claims.fetch_add(1, Ordering::Relaxed);
        }
        claimed
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting.load(Ordering::Acquire)
    }

    /// Stop live detection. Returns `true` only for the caller that actually
    /// switched it off.
    pub fn pause_detection(&self) -> bool {
        self.detecting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn resume_detection(&self) {
        self.detecting.store(true, Ordering::Release);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two taps before any frame produce one claim.
    #[test]
    fn double_tap_claims_once() {
        let state = CaptureState::new();
        state.request_capture();
        state.request_capture();

        assert!(state.try_claim());
        assert!(!state.try_claim());
        assert_eq!(state.requests(), 2);
        assert_eq!(state.claims(), 1);
        assert!(!state.capture_pending());
    }

    /// Nothing to claim without a tap.
    #[test]
    fn no_request_no_claim() {
        let state = CaptureState::new();
        assert!(!state.try_claim());
        assert_eq!(state.claims(), 0);
    }

    /// Many threads racing to claim one request: exactly one wins.
    #[test]
    fn racing_claims_have_one_winner() {
        let state = CaptureState::new();
        state.request_capture();

        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| state.try_claim())).collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("claim thread panicked"))
                .filter(|&won| won)
                .count()
        });
        assert_eq!(winners, 1);
    }

    /// Pausing is single-winner too; resuming re-enables detection.
    #[test]
    fn pause_and_resume() {
        let state = CaptureState::new();
        assert!(state.is_detecting());
        assert!(state.pause_detection());
        assert!(!state.pause_detection());
        assert!(!state.is_detecting());
        state.resume_detection();
        assert!(state.is_detecting());
    }
}
