//! Output formatting and management

use crate::error::ScanError;
use crate::scanner::ScanResult;
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    /// Also list closed ports and per-port errors
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            colored: true,
            verbose: false,
        }
    }
}

/// Main output manager
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Render results in the configured format
    pub fn render(&self, results: &ScanResult) -> crate::Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(self.format_text(results)),
            OutputFormat::Json => Self::format_json(results),
        }
    }

    /// Write scan results to stdout
    pub fn write_results(&self, results: &ScanResult) -> crate::Result<()> {
        let output = self.render(results)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(output.as_bytes())?;
        handle.flush()?;
        Ok(())
    }

    /// Export results as pretty JSON to `path`
    pub fn export_json<P: AsRef<Path>>(results: &ScanResult, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let json = Self::format_json(results)?;
        let mut file = File::create(path)
            .map_err(|e| ScanError::Output(format!("Failed to create {}: {}", path.display(), e)))?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        log::info!("Results exported to {}", path.display());
        Ok(())
    }

    /// Format results as JSON
    fn format_json(results: &ScanResult) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as text
    fn format_text(&self, results: &ScanResult) -> String {
        let mut output = String::new();
        let rule = "=".repeat(60);

        output.push('\n');
        output.push_str(&self.paint(&rule, Color::Cyan));
        output.push('\n');
        output.push_str(&self.paint(&format!("Scan Results for {}", results.target()), Color::Cyan));
        output.push('\n');
        output.push_str(&self.paint(&rule, Color::Cyan));
        output.push_str("\n\n");

        if !results.open().is_empty() {
            let header = format!("Open Ports ({}):", results.open().len());
            output.push_str(&self.paint(&header, Color::Green));
            output.push('\n');
            for port in results.open() {
                output.push_str(&format!(
                    "  {} Port {} is OPEN\n",
                    self.paint("✓", Color::Green),
                    port
                ));
            }
        } else {
            output.push_str("No open ports found.\n");
        }

        if !results.filtered().is_empty() {
            let header = format!("Filtered Ports ({}):", results.filtered().len());
            output.push('\n');
            output.push_str(&self.paint(&header, Color::Yellow));
            output.push('\n');
            if self.config.verbose {
                output.push_str(&format!("  {}\n", join_ports(results.filtered())));
            } else {
                output.push_str(&format!("  {} ports are FILTERED\n", results.filtered().len()));
            }
        }

        if self.config.verbose && !results.closed().is_empty() {
            let header = format!("Closed Ports ({}):", results.closed().len());
            output.push('\n');
            output.push_str(&self.paint(&header, Color::Red));
            output.push('\n');
            output.push_str(&format!("  {}\n", join_ports(results.closed())));
        }

        if !results.errors().is_empty() {
            let header = format!("Errors ({}):", results.errors().len());
            output.push('\n');
            output.push_str(&self.paint(&header, Color::Magenta));
            output.push('\n');
            if self.config.verbose {
                for error in results.errors() {
                    output.push_str(&format!("  Port {}: {}\n", error.port, error.error));
                }
            } else {
                output.push_str("  run with --verbose for details\n");
            }
        }

        output.push('\n');
        output.push_str(&format!(
            "Scanned {} in {:.2}s: {}\n",
            results.target(),
            results.duration().as_secs_f64(),
            results.summary()
        ));

        if results.is_cancelled() {
            output.push_str(&self.paint(
                "Scan was interrupted: results are partial\n",
                Color::Yellow,
            ));
        }

        output
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.config.colored {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn join_ports(ports: &[u16]) -> String {
    ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{PortResult, PortState};

    fn sample() -> ScanResult {
        ScanResult::from_outcomes(
            "192.168.1.10",
            vec![
                PortResult::new(80, PortState::Open),
                PortResult::new(22, PortState::Open),
                PortResult::new(23, PortState::Closed),
                PortResult::new(445, PortState::Filtered),
                PortResult::error(3389, "No route to host"),
            ],
        )
    }

    fn plain(verbose: bool) -> OutputManager {
        OutputManager::new(OutputConfig {
            format: OutputFormat::Text,
            colored: false,
            verbose,
        })
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_text_report() {
        let text = plain(false).render(&sample()).unwrap();
        assert!(text.contains("Scan Results for 192.168.1.10"));
        assert!(text.contains("Open Ports (2):"));
        assert!(text.find("Port 22 is OPEN").unwrap() < text.find("Port 80 is OPEN").unwrap());
        assert!(text.contains("1 ports are FILTERED"));
        assert!(!text.contains("Closed Ports"));
        assert!(!text.contains("No route to host"));
        assert!(!text.contains("interrupted"));
    }

    #[test]
    fn test_verbose_text_report() {
        let text = plain(true).render(&sample()).unwrap();
        assert!(text.contains("Closed Ports (1):"));
        assert!(text.contains("Port 3389: No route to host"));
        assert!(text.contains("2 open, 1 closed, 1 filtered, 1 errors (5 ports)"));
    }

    #[test]
    fn test_json_render() {
        let manager = OutputManager::new(OutputConfig {
            format: OutputFormat::Json,
            ..Default::default()
        });
        let json = manager.render(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["open_ports"], serde_json::json!([22, 80]));
        assert_eq!(value["errors"][0]["port"], 3389);
    }

    #[test]
    fn test_export_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");

        OutputManager::export_json(&sample(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let restored: ScanResult = serde_json::from_str(&written).unwrap();
        assert_eq!(restored.target(), "192.168.1.10");
        assert_eq!(restored.open(), &[22, 80]);
        assert_eq!(restored.filtered(), &[445]);
    }

    #[test]
    fn test_export_json_bad_path() {
        let err = OutputManager::export_json(&sample(), "/nonexistent/dir/scan.json").unwrap_err();
        assert!(matches!(err, ScanError::Output(_)));
    }
}
