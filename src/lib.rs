//! portsweep - a concurrent TCP connect port scanner
//!
//! Resolve a port specification, probe every port with a bounded worker pool
//! and collect the outcomes into open/closed/filtered/error buckets.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::ScanError;
pub use network::{PortResult, PortState, Prober, TcpConnectScanner};
pub use scanner::{scan, scan_blocking, PortError, ScanEngine, ScanResult, ScanSummary};
pub use utils::port_spec::{resolve_port_spec, PortSpec};

pub type Result<T> = std::result::Result<T, ScanError>;
