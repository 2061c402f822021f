// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Producer lane — camera frames and their detections.
//
// Backed by a `tokio::sync::watch` channel: the consumer always sees the
// newest frame and anything it was too slow for is dropped, so at most one
// frame is ever in flight and no backlog builds up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flatscan_core::DetectedFeature;
use flatscan_document::RasterImage;
use tokio::sync::watch;
use tracing::{debug, trace};

/// One camera frame plus whatever the detector found in it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic per-feed counter, starting at 1.
    pub sequence: u64,
    /// Sensor-space pixels.
    pub image: Arc<RasterImage>,
    /// Detector output; empty is common and means "nothing found".
    pub features: Vec<DetectedFeature>,
}

/// Publishing side of the frame lane, held by the camera glue.
#[derive(Debug)]
pub struct FrameFeed {
    tx: watch::Sender<Option<Arc<Frame>>>,
    next_sequence: AtomicU64,
}

impl Default for FrameFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Publish a frame, replacing any frame not yet consumed. Returns the
    /// frame's sequence number.
    pub fn publish(&self, image: RasterImage, features: Vec<DetectedFeature>) -> u64 {
        self.publish_shared(Arc::new(image), features)
    }

    /// Publish a frame whose pixels are already shared.
    pub fn publish_shared(&self, image: Arc<RasterImage>, features: Vec<DetectedFeature>) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        trace!(sequence, features = features.len(), "frame published");
        self.tx.send_replace(Some(Arc::new(Frame {
            sequence,
            image,
            features,
        })));
        sequence
    }

    /// A new consumer. It sees only frames published after this call.
    pub fn subscribe(&self) -> FrameReceiver {
        FrameReceiver {
            rx: self.tx.subscribe(),
            last_sequence: None,
            skipped: 0,
        }
    }
}

/// Consuming side of the frame lane.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: watch::Receiver<Option<Arc<Frame>>>,
    last_sequence: Option<u64>,
    skipped: u64,
}

impl FrameReceiver {
    /// Wait for the newest unseen frame. `None` once the feed is dropped.
    pub async fn next(&mut self) -> Option<Arc<Frame>> {
        loop {
            self.rx.changed().await.ok()?;
            let frame = self.rx.borrow_and_update().clone();
            let Some(frame) = frame else { continue };

            if let Some(last) = self.last_sequence {
                let gap = frame.sequence.saturating_sub(last + 1);
                if gap > 0 {
                    self.skipped += gap;
                    debug!(
                        sequence = frame.sequence,
                        dropped = gap,
                        "late frames replaced before they were consumed"
                    );
                }
            }
            self.last_sequence = Some(frame.sequence);
            return Some(frame);
        }
    }

    /// Whether this receiver has seen at least one frame.
    pub fn received_any(&self) -> bool {
        self.last_sequence.is_some()
    }

    /// Frames replaced by a newer one before this receiver got to them.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
