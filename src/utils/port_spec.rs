//! Port specification parsing
//!
//! A specification is either a single inclusive range (`"20-25"`) or a comma
//! separated list (`"80,22,443"`). Both forms resolve to an ordered list of
//! unique ports: ascending for ranges, first-seen order for lists.

use crate::error::ScanError;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Lowest scannable port
pub const MIN_PORT: u32 = 1;
/// Highest scannable port
pub const MAX_PORT: u32 = 65535;

/// Parsed port specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// Inclusive range, `start <= end`
    Range { start: u16, end: u16 },
    /// Explicit list in input order, possibly with duplicates
    List(Vec<u16>),
}

impl PortSpec {
    /// Parse a specification string (e.g., "1-1000" or "22,80,443")
    pub fn parse(spec: &str) -> crate::Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ScanError::parse("Port specification is empty"));
        }

        if spec.contains('-') {
            let bounds: Vec<&str> = spec.split('-').collect();
            if bounds.len() != 2 {
                return Err(ScanError::parse(format!("Invalid port range: {}", spec)));
            }

            let start = parse_port(bounds[0])?;
            let end = parse_port(bounds[1])?;
            if start > end {
                return Err(ScanError::parse(format!(
                    "Start port {} cannot be greater than end port {}",
                    start, end
                )));
            }

            return Ok(PortSpec::Range { start, end });
        }

        let ports = spec
            .split(',')
            .map(parse_port)
            .collect::<crate::Result<Vec<u16>>>()?;

        Ok(PortSpec::List(ports))
    }

    /// Expand into the ordered, duplicate-free port sequence
    pub fn resolve(&self) -> Vec<u16> {
        match self {
            PortSpec::Range { start, end } => (*start..=*end).collect(),
            PortSpec::List(ports) => dedup_ports(ports.iter().copied()),
        }
    }

    /// Number of distinct ports the specification covers
    pub fn len(&self) -> usize {
        match self {
            PortSpec::Range { start, end } if start > end => 0,
            PortSpec::Range { start, end } => (*end - *start) as usize + 1,
            PortSpec::List(_) => self.resolve().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for PortSpec {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortSpec::parse(s)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Range { start, end } => write!(f, "{}-{}", start, end),
            PortSpec::List(ports) => {
                let joined: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// Parse and resolve a port specification in one step
pub fn resolve_port_spec(spec: &str) -> crate::Result<Vec<u16>> {
    Ok(PortSpec::parse(spec)?.resolve())
}

/// Remove duplicate ports, keeping the first occurrence of each
pub fn dedup_ports<I>(ports: I) -> Vec<u16>
where
    I: IntoIterator<Item = u16>,
{
    let mut seen = HashSet::new();
    ports.into_iter().filter(|port| seen.insert(*port)).collect()
}

fn parse_port(token: &str) -> crate::Result<u16> {
    let token = token.trim();
    // Parsed wider than u16 so out-of-range values get a range error, not a
    // generic integer error
    let value: u32 = token
        .parse()
        .map_err(|e| ScanError::parse(format!("Invalid port '{}': {}", token, e)))?;

    if !(MIN_PORT..=MAX_PORT).contains(&value) {
        return Err(ScanError::parse(format!(
            "Port {} is out of range ({}-{})",
            value, MIN_PORT, MAX_PORT
        )));
    }

    Ok(value as u16)
}
