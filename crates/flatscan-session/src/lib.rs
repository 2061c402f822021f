// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flatscan Session — the live capture pipeline. The frame lane keeps the
// overlay current and claims captures; correction runs on the blocking pool
// and the result is handed to the display lane.

pub mod claim;
pub mod frames;
pub mod mapping;
pub mod overlay;
pub mod presenter;
pub mod session;

pub use claim::CaptureState;
pub use frames::{Frame, FrameFeed, FrameReceiver};
pub use mapping::DisplayMapping;
pub use overlay::HideTimer;
pub use presenter::{ImagePresenter, LoggingPresenter, OverlayPresenter};
pub use session::{CorrectedCapture, ScanSession, SessionHandle};
