//! Main scanning engine implementation
//!
//! Ports are admitted through a semaphore sized to the concurrency bound, so
//! no more than `concurrency` probes (and sockets) exist at any time. Workers
//! push their outcome into a channel drained by a single consumer, which is
//! the only place the [`ScanResult`] is mutated.

use crate::config::ScanConfig;
use crate::network::{PortResult, Prober, TcpConnectScanner};
use crate::scanner::ScanResult;
use crate::utils::port_spec::dedup_ports;
use crate::utils::target_parser::normalize_target;
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Outcomes in completion order; ends once every admitted probe has reported
pub type PortStream = BoxStream<'static, PortResult>;

/// Main scanning engine
pub struct ScanEngine {
    target: Arc<str>,
    config: ScanConfig,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
}

impl ScanEngine {
    /// Create a new scan engine for `target`, validating the target and config
    pub fn new(target: &str, config: ScanConfig) -> crate::Result<Self> {
        config.validate()?;
        let target = normalize_target(target)?;

        Ok(Self {
            target: target.into(),
            config,
            prober: Arc::new(TcpConnectScanner::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the TCP connect prober
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    /// Stop the scan when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this engine's scans
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every port and return once each has exactly one outcome.
    ///
    /// On cancellation this returns promptly with the outcomes merged so far
    /// and [`ScanResult::is_cancelled`] set.
    pub async fn scan(&self, ports: &[u16]) -> crate::Result<ScanResult> {
        let ports = prepare_ports(ports)?;
        let expected = ports.len();
        let start_time = Instant::now();

        log::info!(
            "Scanning {} ports on {} (concurrency {}, timeout {}ms)",
            expected,
            self.target,
            self.config.concurrency,
            self.config.timeout
        );

        let mut result = ScanResult::new(&*self.target);
        let mut outcomes = self.dispatcher().dispatch(ports);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = outcomes.recv() => match outcome {
                    Some(outcome) => {
                        log::debug!("{}:{} {}", self.target, outcome.port, outcome.state);
                        result.record(outcome);
                    }
                    None => break,
                },
            }
        }

        let cancelled = result.total_ports() < expected;
        if cancelled {
            log::warn!(
                "Scan of {} cancelled after {}/{} ports",
                self.target,
                result.total_ports(),
                expected
            );
        }

        result.finish(start_time.elapsed(), cancelled);
        log::info!(
            "Scan of {} finished in {:.2}s: {}",
            self.target,
            result.duration().as_secs_f64(),
            result.summary()
        );

        Ok(result)
    }

    /// Stream outcomes as probes complete.
    ///
    /// Nothing is sent until the stream is first polled. The stream cannot be
    /// restarted; folding it with [`ScanResult::from_outcomes`] gives the same
    /// buckets as [`ScanEngine::scan`].
    pub fn stream(&self, ports: &[u16]) -> crate::Result<PortStream> {
        let ports = prepare_ports(ports)?;
        let dispatcher = self.dispatcher();

        let outcomes = stream::once(async move { dispatcher.dispatch(ports) }).flat_map(|rx| {
            stream::unfold(rx, |mut rx| async move {
                let outcome = rx.recv().await?;
                Some((outcome, rx))
            })
        });

        Ok(outcomes.boxed())
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            target: self.target.clone(),
            timeout: self.config.timeout_duration(),
            concurrency: self.config.concurrency,
            prober: self.prober.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Bounded worker pool feeding the outcome channel
struct Dispatcher {
    target: Arc<str>,
    timeout: Duration,
    concurrency: usize,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
}

impl Dispatcher {
    fn dispatch(self, ports: Vec<u16>) -> mpsc::UnboundedReceiver<PortResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(ports, tx));
        rx
    }

    async fn run(self, ports: Vec<u16>, tx: mpsc::UnboundedSender<PortResult>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();

        for port in ports {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tx.closed() => {
                    log::debug!("Outcome receiver dropped, stopping admission");
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = self.prober.clone();
            let target = self.target.clone();
            let tx = tx.clone();
            let timeout = self.timeout;

            workers.spawn(async move {
                let _permit = permit; // Keep permit alive until the outcome is sent
                // unwinding only; release builds abort on panic
                let outcome = AssertUnwindSafe(prober.probe(&target, port, timeout))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| PortResult::error(port, "probe panicked"));
                let _ = tx.send(outcome);
            });

            while workers.try_join_next().is_some() {}
        }

        // tx lives until the workers are reaped so a dropped receiver is
        // still noticed; the channel ends when this task returns
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    workers.abort_all();
                    break;
                }
                _ = tx.closed() => {
                    workers.abort_all();
                    break;
                }
                next = workers.join_next() => {
                    if next.is_none() {
                        break;
                    }
                }
            }
        }
    }
}

/// Deduplicate and check the requested ports
fn prepare_ports(ports: &[u16]) -> crate::Result<Vec<u16>> {
    if ports.is_empty() {
        return Err(crate::ScanError::config("No ports specified"));
    }

    if ports.contains(&0) {
        return Err(crate::ScanError::config("Port 0 cannot be scanned"));
    }

    Ok(dedup_ports(ports.iter().copied()))
}

/// Scan `ports` on `target` with the TCP connect prober
pub async fn scan(target: &str, ports: &[u16], config: &ScanConfig) -> crate::Result<ScanResult> {
    ScanEngine::new(target, config.clone())?.scan(ports).await
}

/// Blocking variant of [`scan`] for callers without a runtime
pub fn scan_blocking(target: &str, ports: &[u16], config: &ScanConfig) -> crate::Result<ScanResult> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(scan(target, ports, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PortState;
    use async_trait::async_trait;

    /// Classifies ports by value without touching the network
    struct FakeProber;

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, _target: &str, port: u16, _timeout: Duration) -> PortResult {
            tokio::time::sleep(Duration::from_millis(1)).await;
            match port % 4 {
                0 => PortResult::new(port, PortState::Open),
                1 => PortResult::new(port, PortState::Closed),
                2 => PortResult::new(port, PortState::Filtered),
                _ => PortResult::error(port, "Network is unreachable"),
            }
        }
    }

    fn engine(concurrency: usize) -> ScanEngine {
        let config = ScanConfig::new().with_concurrency(concurrency).with_timeout(100);
        ScanEngine::new("127.0.0.1", config)
            .unwrap()
            .with_prober(Arc::new(FakeProber))
    }

    #[tokio::test]
    async fn test_every_port_lands_in_one_bucket() {
        let ports: Vec<u16> = (1..=40).collect();
        let result = engine(7).scan(&ports).await.unwrap();

        assert_eq!(result.total_ports(), 40);
        assert_eq!(result.open().len(), 10);
        assert_eq!(result.closed().len(), 10);
        assert_eq!(result.filtered().len(), 10);
        assert_eq!(result.errors().len(), 10);
        assert!(!result.is_cancelled());
    }

    #[tokio::test]
    async fn test_duplicate_ports_probed_once() {
        let result = engine(2).scan(&[4, 4, 8, 4]).await.unwrap();
        assert_eq!(result.open(), &[4, 8]);
        assert_eq!(result.total_ports(), 2);
    }

    #[tokio::test]
    async fn test_empty_ports_is_config_error() {
        let err = engine(2).scan(&[]).await.unwrap_err();
        assert!(matches!(err, crate::ScanError::Config(_)));
    }

    #[tokio::test]
    async fn test_port_zero_is_config_error() {
        let err = engine(2).scan(&[0, 80]).await.unwrap_err();
        assert!(matches!(err, crate::ScanError::Config(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_concurrency = ScanConfig::new().with_concurrency(0);
        assert!(ScanEngine::new("127.0.0.1", zero_concurrency).is_err());

        let zero_timeout = ScanConfig::new().with_timeout(0);
        assert!(ScanEngine::new("127.0.0.1", zero_timeout).is_err());

        assert!(ScanEngine::new("not a host", ScanConfig::new()).is_err());
    }

    #[tokio::test]
    async fn test_stream_folds_to_scan_result() {
        let ports: Vec<u16> = (1..=12).collect();
        let engine = engine(3);

        let outcomes: Vec<PortResult> = engine.stream(&ports).unwrap().collect().await;
        assert_eq!(outcomes.len(), 12);

        let folded = ScanResult::from_outcomes(engine.target(), outcomes);
        let scanned = engine.scan(&ports).await.unwrap();
        assert_eq!(folded.open(), scanned.open());
        assert_eq!(folded.closed(), scanned.closed());
        assert_eq!(folded.filtered(), scanned.filtered());
        assert_eq!(folded.errors(), scanned.errors());
    }

    /// Panics on port 13, otherwise defers to [`FakeProber`]
    struct PanickyProber;

    #[async_trait]
    impl Prober for PanickyProber {
        async fn probe(&self, target: &str, port: u16, timeout: Duration) -> PortResult {
            if port == 13 {
                panic!("prober bug on port {}", port);
            }
            FakeProber.probe(target, port, timeout).await
        }
    }

    #[tokio::test]
    async fn test_panicking_prober_recorded_as_error() {
        let engine = engine(3).with_prober(Arc::new(PanickyProber));
        let result = engine.scan(&[12, 13, 14]).await.unwrap();

        assert_eq!(result.total_ports(), 3);
        assert!(!result.is_cancelled());
        assert_eq!(result.state_of(13), Some(PortState::Error));
        assert_eq!(result.errors()[0].error, "probe panicked");
    }

    #[tokio::test]
    async fn test_pre_cancelled_scan_returns_partial() {
        let engine = engine(4);
        engine.cancellation_token().cancel();

        let result = engine.scan(&[1, 2, 3]).await.unwrap();
        assert!(result.is_cancelled());
        assert_eq!(result.total_ports(), 0);
    }
}
