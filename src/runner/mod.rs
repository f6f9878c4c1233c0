mod steps;

pub use steps::{write_asset, FlowState, Step};

use crate::config::Settings;
use crate::studio::Studio;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Result of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// Absolute path of the saved video.
    pub video_path: PathBuf,
    /// Number of steps executed.
    pub steps_executed: usize,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Session bootstrap: make sure the output directory exists.
pub async fn prepare(settings: &Settings) -> Result<()> {
    settings.validate()?;
    settings.ensure_download_dir().await?;
    debug!("Download dir: {}", settings.download_dir.display());
    Ok(())
}

/// Run every step in order against `studio`, then close it.
///
/// The studio is closed on every path. The first step error aborts the
/// remaining steps and is returned.
pub async fn run<S: Studio>(settings: &Settings, mut studio: S) -> Result<RunReport> {
    let start = Instant::now();
    let outcome = run_steps(settings, &mut studio).await;

    if let Err(ref e) = outcome {
        warn!("Run failed: {}", e);
        handle_failure(settings, &mut studio).await;
    }

    match (outcome, studio.close().await) {
        (Ok(mut report), closed) => {
            if let Err(e) = closed {
                warn!("Failed to close browser: {}", e);
            }
            report.duration_ms = start.elapsed().as_millis() as u64;
            Ok(report)
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("Failed to close browser: {}", close_err);
            }
            Err(e)
        }
    }
}

async fn run_steps<S: Studio>(settings: &Settings, studio: &mut S) -> Result<RunReport> {
    let mut state = FlowState::default();
    let mut steps_executed = 0;

    for (i, step) in Step::ALL.iter().enumerate() {
        debug!("Executing step {}: {}", i + 1, step);
        steps::execute(*step, studio, settings, &mut state).await?;
        steps_executed += 1;
    }

    let video = state
        .video_path
        .ok_or_else(|| Error::ActionFailed("no video was produced".into()))?;
    let video_path = tokio::fs::canonicalize(&video).await?;
    info!("Video saved to {}", video_path.display());

    Ok(RunReport {
        video_path,
        steps_executed,
        duration_ms: 0,
    })
}

async fn handle_failure<S: Studio>(settings: &Settings, studio: &mut S) {
    let Some(ref screenshot_path) = settings.failure_screenshot else {
        return;
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = screenshot_path.replace("{timestamp}", &timestamp.to_string());
    info!("Saving failure screenshot to: {}", path);
    match studio.screenshot().await {
        Ok(data) => {
            if let Err(e) = write_asset(Path::new(&path), &data).await {
                warn!("Failed to save screenshot: {}", e);
            }
        }
        Err(e) => warn!("Failed to capture screenshot: {}", e),
    }
}
