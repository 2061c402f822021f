// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flatscan replay — drive a scan session from a still image.
//
// Feeds the image as a short burst of camera frames with a fixed detected
// quad, taps the shutter once, and lets the logging presenter report the
// overlay and the corrected capture. Useful for checking calibration
// settings without a device.
//
//   flatscan-replay <image> <x,y> <x,y> <x,y> <x,y> [config.json]
//
// Corners are in TL, TR, BR, BL order, in the image's pixel coordinates.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use flatscan_core::error::{Result, ScanError};
use flatscan_core::{DetectedFeature, Point2D, Quadrilateral, ScanConfig, Sensor};
use flatscan_document::RasterImage;
use flatscan_session::{FrameFeed, LoggingPresenter, ScanSession};
use tracing::{error, info, warn};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const FRAME_COUNT: usize = 10;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    let [image_path, tl, tr, br, bl, rest @ ..] = args else {
        return Err(ScanError::Pipeline(
            "usage: flatscan-replay <image> <x,y> <x,y> <x,y> <x,y> [config.json]".into(),
        ));
    };

    let config = match rest.first() {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    let quad = Quadrilateral::new(
        parse_corner(tl)?,
        parse_corner(tr)?,
        parse_corner(br)?,
        parse_corner(bl)?,
    );

    let image = Arc::new(RasterImage::from_bytes(&std::fs::read(image_path)?)?);
    info!(
        path = %image_path,
        width = image.width(),
        height = image.height(),
        "Replaying still image"
    );

    let dwell = config.dwell();
    let presenter = Arc::new(LoggingPresenter::new(390.0, 844.0));
    let session = ScanSession::new(config, presenter.clone(), presenter);
    let feed = FrameFeed::new();
    let handle = session.spawn(feed.subscribe());

    handle.request_capture();
    for _ in 0..FRAME_COUNT {
        feed.publish_shared(
            Arc::clone(&image),
            vec![DetectedFeature::Rectangle(quad)],
        );
        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    // Let the capture finish its dwell before tearing down.
    let settled = async {
        while handle.captures_settled() == 0 {
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
    };
    if tokio::time::timeout(SETTLE_TIMEOUT, settled).await.is_err() {
        warn!(timeout_s = SETTLE_TIMEOUT.as_secs(), "capture never settled");
        handle.shutdown().await?;
        return Err(ScanError::Pipeline("capture did not settle in time".into()));
    }
    let presented = handle.images_presented();
    tokio::time::sleep(dwell).await;
    handle.shutdown().await?;

    if presented == 0 {
        return Err(ScanError::Pipeline("capture produced no image".into()));
    }
    Ok(())
}

fn parse_corner(arg: &str) -> Result<Point2D<Sensor>> {
    let parsed = arg
        .split_once(',')
        .and_then(|(x, y)| Some((x.trim().parse::<f64>().ok()?, y.trim().parse::<f64>().ok()?)));
    match parsed {
        Some((x, y)) => Ok(Point2D::new(x, y)),
        None => Err(ScanError::Pipeline(format!("bad corner {arg:?}, expected x,y"))),
    }
}
