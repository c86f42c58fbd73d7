use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::client::PixelClient;
use crate::state::{AppState, StatusEvent};

/// Side length of a quadrant's local pixel grid.
pub const QUADRANT_SIZE: u32 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must not be empty")]
    EmptyUser,

    #[error("radius must be non-negative, got {0}")]
    NegativeRadius(i32),
}

/// Parameters of one scan run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub user: String,
    pub center_qx: i32,
    pub center_qy: i32,
    pub radius: i32,
}

impl ScanRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user.trim().is_empty() {
            return Err(ValidationError::EmptyUser);
        }
        if self.radius < 0 {
            return Err(ValidationError::NegativeRadius(self.radius));
        }
        Ok(())
    }
}

/// Validate the request and launch the scan loop as a background task.
///
/// A live run is replaced: its token is cancelled here and its loop exits
/// silently at the next checkpoint, without interrupting an in-flight query.
/// On validation failure one error status event is emitted and no state
/// changes.
pub async fn start_scan<C>(
    state: &AppState,
    client: Arc<C>,
    events: &UnboundedSender<StatusEvent>,
    request: ScanRequest,
) -> Result<(), ValidationError>
where
    C: PixelClient + 'static,
{
    if let Err(e) = request.validate() {
        let _ = events.send(StatusEvent::error(e.to_string()));
        return Err(e);
    }

    let cancel = CancellationToken::new();

    {
        let mut s = state.lock().await;
        if let Some(previous) = s.cancel.take() {
            previous.cancel();
        }
        s.begin_run(request.clone(), cancel.clone());
    }

    let _ = events.send(StatusEvent::info(format!("Scanning for {}", request.user)));

    let app_state = state.clone();
    let events = events.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = run_scan(app_state.clone(), client, events, cancel.clone()).await {
            tracing::error!("scanner error: {e:#}");
            if !cancel.is_cancelled() {
                app_state.lock().await.finish_run();
            }
        }
    });

    state.lock().await.scanner_handle = Some(handle);

    Ok(())
}

/// Cancel the active run, if any. Emits exactly one "stopped" status event
/// per live run; returns false when nothing was running. The loop's
/// in-flight query is never interrupted, the next one is simply not issued.
pub async fn stop_scan(state: &AppState, events: &UnboundedSender<StatusEvent>) -> bool {
    let cancel = {
        let mut s = state.lock().await;
        let Some(cancel) = s.cancel.take() else {
            return false;
        };
        s.running = false;
        s.scanner_handle = None;
        cancel
    };

    cancel.cancel();
    let _ = events.send(StatusEvent::error("Scan stopped."));
    true
}

/// The enumeration loop: every pixel of every quadrant within the request
/// radius, one ownership query at a time, paced by the configured delay.
///
/// The token is checked before each query and at every loop boundary; a
/// cancelled run returns without emitting anything (the stop event belongs
/// to `stop_scan`). Natural exhaustion emits the completion event.
pub async fn run_scan<C: PixelClient>(
    state: AppState,
    client: Arc<C>,
    events: UnboundedSender<StatusEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let (request, delay) = {
        let s = state.lock().await;
        let request = s.request.clone().context("no active scan request")?;
        (request, s.config.request_delay)
    };

    let quadrants = quadrant_positions(request.center_qx, request.center_qy, request.radius);
    let total = quadrants.len();
    tracing::info!(
        "scanning {total} quadrant(s) around ({}, {}) for {}",
        request.center_qx,
        request.center_qy,
        request.user,
    );

    for (i, (qx, qy)) in quadrants.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(());
        }
        tracing::info!("quadrant {}/{total}: ({qx}, {qy})", i + 1);

        for x in 0..QUADRANT_SIZE {
            if cancel.is_cancelled() {
                return Ok(());
            }
            for y in 0..QUADRANT_SIZE {
                if cancel.is_cancelled() {
                    return Ok(());
                }

                let owner = client.pixel_owner(qx, qy, x, y).await;
                if owner.as_deref() == Some(request.user.as_str()) {
                    let count = {
                        let mut s = state.lock().await;
                        s.record_match(qx, qy, x, y)
                    };
                    tracing::info!(
                        "pixel owned by {} at quadrant ({qx}, {qy}) pixel ({x}, {y})",
                        request.user,
                    );
                    let _ = events.send(StatusEvent::success(format!("Pixels found: {count}")));
                }

                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return Ok(());
    }

    state.lock().await.finish_run();
    let _ = events.send(StatusEvent::success("Scan completed."));
    Ok(())
}

/// Quadrants of the square neighborhood of side `2*radius+1` around the
/// center, in row-major order with the X offset as the outer axis.
pub fn quadrant_positions(center_qx: i32, center_qy: i32, radius: i32) -> Vec<(i32, i32)> {
    let mut positions = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            positions.push((center_qx + dx, center_qy + dy));
        }
    }
    positions
}
