//! Scanner module: the scan coordinator and its result aggregate

pub mod engine;

use crate::network::{PortResult, PortState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use engine::{scan, scan_blocking, PortStream, ScanEngine};

/// A port whose probe failed with a transport error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortError {
    pub port: u16,
    pub error: String,
}

/// Complete scan result, bucketed by outcome.
///
/// Built by the coordinator as outcomes arrive and read-only once handed to
/// the caller. Each scanned port sits in exactly one bucket; when the scan was
/// cancelled, ports that were never probed are in none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    target: String,
    open_ports: Vec<u16>,
    closed_ports: Vec<u16>,
    filtered_ports: Vec<u16>,
    errors: Vec<PortError>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    cancelled: bool,
    #[serde(skip)]
    duration: Duration,
}

impl ScanResult {
    pub(crate) fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            open_ports: Vec::new(),
            closed_ports: Vec::new(),
            filtered_ports: Vec::new(),
            errors: Vec::new(),
            cancelled: false,
            duration: Duration::from_secs(0),
        }
    }

    /// Fold a finished sequence of outcomes (e.g. a drained [`PortStream`])
    /// into a result
    pub fn from_outcomes<I>(target: impl Into<String>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = PortResult>,
    {
        let mut result = Self::new(target);
        for outcome in outcomes {
            result.record(outcome);
        }
        result.finish(Duration::from_secs(0), false);
        result
    }

    /// Merge one outcome into its bucket
    pub(crate) fn record(&mut self, result: PortResult) {
        match result.state {
            PortState::Open => self.open_ports.push(result.port),
            PortState::Closed => self.closed_ports.push(result.port),
            PortState::Filtered => self.filtered_ports.push(result.port),
            PortState::Error => self.errors.push(PortError {
                port: result.port,
                error: result.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }

    /// Seal the result: sort buckets for stable output and stamp metadata
    pub(crate) fn finish(&mut self, duration: Duration, cancelled: bool) {
        self.open_ports.sort_unstable();
        self.closed_ports.sort_unstable();
        self.filtered_ports.sort_unstable();
        self.errors.sort_by_key(|e| e.port);
        self.duration = duration;
        self.cancelled = cancelled;
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Open ports, ascending
    pub fn open(&self) -> &[u16] {
        &self.open_ports
    }

    /// Closed ports, ascending
    pub fn closed(&self) -> &[u16] {
        &self.closed_ports
    }

    /// Filtered ports, ascending
    pub fn filtered(&self) -> &[u16] {
        &self.filtered_ports
    }

    /// Ports that failed with a transport error, by port
    pub fn errors(&self) -> &[PortError] {
        &self.errors
    }

    /// True when the scan was stopped before every port was probed
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Bucket a port landed in, if it was scanned
    pub fn state_of(&self, port: u16) -> Option<PortState> {
        if self.open_ports.binary_search(&port).is_ok() {
            Some(PortState::Open)
        } else if self.closed_ports.binary_search(&port).is_ok() {
            Some(PortState::Closed)
        } else if self.filtered_ports.binary_search(&port).is_ok() {
            Some(PortState::Filtered)
        } else if self.errors.iter().any(|e| e.port == port) {
            Some(PortState::Error)
        } else {
            None
        }
    }

    /// Get the total number of ports with an outcome
    pub fn total_ports(&self) -> usize {
        self.open_ports.len() + self.closed_ports.len() + self.filtered_ports.len() + self.errors.len()
    }

    /// Get scan rate in ports per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total_ports() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            open: self.open_ports.len(),
            closed: self.closed_ports.len(),
            filtered: self.filtered_ports.len(),
            errors: self.errors.len(),
        }
    }
}

/// Per-bucket counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub errors: usize,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.open + self.closed + self.filtered + self.errors
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} open, {} closed, {} filtered, {} errors ({} ports)",
            self.open,
            self.closed,
            self.filtered,
            self.errors,
            self.total()
        )
    }
}
