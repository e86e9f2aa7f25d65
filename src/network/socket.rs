//! TCP connect probing

use crate::network::{PortResult, PortState};
use async_trait::async_trait;
use socket2::SockRef;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

/// Single-port reachability check.
///
/// Implementations return their outcome instead of touching shared scan
/// state; a failure to reach the port is an outcome, not an error.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &str, port: u16, timeout: Duration) -> PortResult;
}

/// TCP connect scanner (full three-way handshake, no raw sockets)
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectScanner;

impl TcpConnectScanner {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `target` to the address the probe connects to.
    ///
    /// Only the first resolved address is tried, one socket per probe.
    async fn resolve(target: &str, port: u16, deadline: Instant) -> Result<SocketAddr, String> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        match time::timeout_at(deadline, tokio::net::lookup_host((target, port))).await {
            Ok(Ok(mut addrs)) => addrs
                .next()
                .ok_or_else(|| format!("No addresses found for {}", target)),
            Ok(Err(e)) => Err(format!("Failed to resolve {}: {}", target, e)),
            Err(_) => Err(format!("Resolving {} timed out", target)),
        }
    }
}

#[async_trait]
impl Prober for TcpConnectScanner {
    /// Name resolution and the connect attempt share one `timeout` budget
    async fn probe(&self, target: &str, port: u16, timeout: Duration) -> PortResult {
        let start_time = Instant::now();
        let deadline = start_time + timeout;

        let addr = match Self::resolve(target, port, deadline).await {
            Ok(addr) => addr,
            Err(cause) => return PortResult::error(port, cause).with_response_time(start_time.elapsed()),
        };

        let result = match time::timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                close_immediately(stream);
                PortResult::new(port, PortState::Open)
            }
            Ok(Err(e)) => match classify_connect_error(&e) {
                PortState::Error => PortResult::error(port, e.to_string()),
                state => PortResult::new(port, state),
            },
            // The pending connect future is dropped here, closing its socket
            Err(_) => PortResult::new(port, PortState::Filtered),
        };

        result.with_response_time(start_time.elapsed())
    }
}

/// Map a failed connect to a port state
pub fn classify_connect_error(error: &io::Error) -> PortState {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => PortState::Closed,
        io::ErrorKind::TimedOut => PortState::Filtered,
        _ => PortState::Error,
    }
}

/// Abort the connection so the socket and its local port are released now
/// rather than lingering in TIME_WAIT
fn close_immediately(stream: TcpStream) {
    if let Err(e) = SockRef::from(&stream).set_linger(Some(Duration::ZERO)) {
        log::debug!("Failed to set SO_LINGER on probe socket: {}", e);
    }
    drop(stream);
}

/// Prober wrapper tracking how many probes run at once
#[derive(Debug, Default)]
pub struct InstrumentedProber<P> {
    inner: P,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl<P> InstrumentedProber<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Probes currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous probes observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Probes that ran to completion
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<P: Prober> Prober for InstrumentedProber<P> {
    async fn probe(&self, target: &str, port: u16, timeout: Duration) -> PortResult {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        // decremented even when the probe task is aborted
        let _guard = InFlightGuard(&self.in_flight);
        self.peak.fetch_max(current, Ordering::SeqCst);

        let result = self.inner.probe(target, port, timeout).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
