use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::scanner::ScanRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// One progress/result message from the scanner to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub message: String,
    pub severity: Severity,
}

impl StatusEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

/// A pixel attributed to the searched user.
#[derive(Debug, Clone, Serialize)]
pub struct FoundPixel {
    pub quadrant_x: i32,
    pub quadrant_y: i32,
    pub x: u32,
    pub y: u32,
    pub found_at: DateTime<Utc>,
}

pub struct AppStateInner {
    pub running: bool,
    pub pixels_found: u64,
    pub request: Option<ScanRequest>,
    pub matches: Vec<FoundPixel>,
    /// Cancellation token of the active run. Taken and cancelled on stop;
    /// cancelled and replaced when a new run starts over a live one.
    pub cancel: Option<CancellationToken>,
    pub scanner_handle: Option<JoinHandle<()>>,
    pub config: Config,
    pub last_status: Option<StatusEvent>,
}

pub type AppState = Arc<Mutex<AppStateInner>>;

impl AppStateInner {
    pub fn new(config: Config) -> Self {
        Self {
            running: false,
            pixels_found: 0,
            request: None,
            matches: Vec::new(),
            cancel: None,
            scanner_handle: None,
            config,
            last_status: None,
        }
    }

    /// Install fresh state for a new run. Counters and results from any
    /// previous run are discarded; the caller cancels the old token first.
    pub fn begin_run(&mut self, request: ScanRequest, cancel: CancellationToken) {
        self.running = true;
        self.pixels_found = 0;
        self.matches.clear();
        self.request = Some(request);
        self.cancel = Some(cancel);
    }

    /// Record a match and return the updated cumulative count.
    pub fn record_match(&mut self, quadrant_x: i32, quadrant_y: i32, x: u32, y: u32) -> u64 {
        self.pixels_found += 1;
        self.matches.push(FoundPixel {
            quadrant_x,
            quadrant_y,
            x,
            y,
            found_at: Utc::now(),
        });
        self.pixels_found
    }

    /// Mark the run finished after natural exhaustion of the search space.
    pub fn finish_run(&mut self) {
        self.running = false;
        self.cancel = None;
        self.scanner_handle = None;
    }
}
