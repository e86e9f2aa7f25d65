//! Configuration module for the portsweep scanner

use crate::utils::port_spec::PortSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the home directory by [`ScanConfig::load_default_config`]
pub const DEFAULT_CONFIG_FILE: &str = ".portsweep.toml";

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Timeout for each connection attempt in milliseconds
    pub timeout: u64,

    /// Maximum number of probes in flight at once
    pub concurrency: usize,

    /// Default port specification used when none is given on the command line
    pub ports: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: 1000,
            concurrency: 50,
            ports: "1-1000".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the concurrency bound
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the default port specification
    pub fn with_ports(mut self, ports: impl Into<String>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Parse the configured port specification
    pub fn port_spec(&self) -> crate::Result<PortSpec> {
        PortSpec::parse(&self.ports)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            crate::ScanError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::ScanError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Path of the per-user configuration file, if a home directory exists
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `~/.portsweep.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let Some(path) = Self::default_config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::from_toml_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.timeout == 0 {
            return Err(crate::ScanError::config("Timeout must be greater than 0"));
        }

        if self.concurrency == 0 {
            return Err(crate::ScanError::config("Concurrency must be at least 1"));
        }

        Ok(())
    }
}
