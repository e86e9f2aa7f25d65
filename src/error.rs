//! Error handling for the portsweep scanner
//!
//! Only structural problems are errors here. Whatever happens to a single
//! port is a scan outcome recorded in [`crate::scanner::ScanResult`], never a
//! `ScanError`.

use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    /// Malformed port specification, surfaced before any probe is sent
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid scan configuration (empty port set, zero timeout, bad target...)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(String),
}

impl ScanError {
    pub fn parse(msg: impl Into<String>) -> Self {
        ScanError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ScanError::Config(msg.into())
    }

    /// True for errors raised before scanning started
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, ScanError::Parse(_) | ScanError::Config(_))
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::Output(e.to_string())
    }
}
