//! Network module: probe outcomes and the TCP connect prober

pub mod socket;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use socket::{InstrumentedProber, Prober, TcpConnectScanner};

/// Port state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// Connection established
    Open,
    /// Connection actively refused
    Closed,
    /// No answer within the timeout
    Filtered,
    /// Any other transport failure
    Error,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
            PortState::Error => "error",
        }
    }
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing a single port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub state: PortState,
    /// Cause of the failure, present only for [`PortState::Error`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time: Duration,
}

impl PortResult {
    pub fn new(port: u16, state: PortState) -> Self {
        debug_assert!(state != PortState::Error, "use PortResult::error for failures");
        Self {
            port,
            state,
            error: None,
            response_time: Duration::from_millis(0),
        }
    }

    /// Transport failure with its cause
    pub fn error(port: u16, cause: impl Into<String>) -> Self {
        Self {
            port,
            state: PortState::Error,
            error: Some(cause.into()),
            response_time: Duration::from_millis(0),
        }
    }

    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = response_time;
        self
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}
