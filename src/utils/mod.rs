//! Utility modules for the scanner

pub mod port_spec;
pub mod target_parser;

/// Current soft limit on open file descriptors (Unix only)
#[cfg(unix)]
pub fn file_descriptor_limit() -> Option<u64> {
    rlimit::Resource::NOFILE.get().ok().map(|(soft, _)| soft)
}

#[cfg(not(unix))]
pub fn file_descriptor_limit() -> Option<u64> {
    None
}

/// Raise the open file descriptor limit, returning the resulting soft limit
#[cfg(unix)]
pub fn raise_file_descriptor_limit(limit: u64) -> crate::Result<u64> {
    rlimit::Resource::NOFILE.set(limit, limit)?;
    Ok(file_descriptor_limit().unwrap_or(limit))
}

#[cfg(not(unix))]
pub fn raise_file_descriptor_limit(limit: u64) -> crate::Result<u64> {
    Ok(limit)
}

/// Warn when the concurrency bound cannot be honoured by the descriptor limit
pub fn check_concurrency_against_limit(concurrency: usize) -> bool {
    match file_descriptor_limit() {
        Some(limit) if concurrency as u64 >= limit => {
            log::warn!(
                "Concurrency {} reaches the open file limit ({}); probes may fail with socket errors",
                concurrency,
                limit
            );
            false
        }
        _ => true,
    }
}
