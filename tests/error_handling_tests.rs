//! Error handling tests
//! Structural problems abort before scanning; network conditions never do.

use portsweep::{resolve_port_spec, scan, PortState, ScanConfig, ScanEngine, ScanError};
use std::time::Duration;
use tokio::time::timeout;

#[test]
fn test_port_spec_errors_are_parse_errors() {
    for spec in ["70000", "0", "5-3", "abc", "22,,80", "", "80-"] {
        let err = resolve_port_spec(spec).unwrap_err();
        assert!(matches!(err, ScanError::Parse(_)), "{:?} gave {:?}", spec, err);
        assert!(err.is_fatal_config());
    }
}

#[test]
fn test_valid_port_specs() {
    assert_eq!(resolve_port_spec("1-1000").unwrap().len(), 1000);
    assert_eq!(resolve_port_spec("65535").unwrap(), vec![65535]);
    assert_eq!(resolve_port_spec("80,22,80,443").unwrap(), vec![80, 22, 443]);
}

#[tokio::test]
async fn test_empty_port_set_is_config_error() {
    let err = scan("127.0.0.1", &[], &ScanConfig::default()).await.unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
}

#[tokio::test]
async fn test_invalid_config_is_config_error() {
    let zero_timeout = ScanConfig::new().with_timeout(0);
    let err = scan("127.0.0.1", &[80], &zero_timeout).await.unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));

    let zero_concurrency = ScanConfig::new().with_concurrency(0);
    let err = scan("127.0.0.1", &[80], &zero_concurrency).await.unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
}

#[test]
fn test_malformed_target_is_config_error() {
    for target in ["", "two words", "bad..host", "http://example.com"] {
        let err = ScanEngine::new(target, ScanConfig::default()).err().unwrap();
        assert!(matches!(err, ScanError::Config(_)), "{:?} accepted", target);
    }
}

#[tokio::test]
async fn test_unresolvable_host_is_not_fatal() {
    let config = ScanConfig::new().with_timeout(2000).with_concurrency(4);
    let result = timeout(
        Duration::from_secs(30),
        scan("does-not-exist.invalid", &[80, 443, 8080], &config),
    )
    .await
    .expect("scan hung")
    .expect("resolution failures must not abort the scan");

    assert_eq!(result.errors().len(), 3);
    for port in [80, 443, 8080] {
        assert_eq!(result.state_of(port), Some(PortState::Error));
    }
    assert!(result.errors().iter().all(|e| !e.error.is_empty()));
}

#[tokio::test]
#[ignore]
async fn test_unroutable_target_is_filtered() {
    // TEST-NET-1 drops packets on most networks
    let config = ScanConfig::new().with_timeout(500).with_concurrency(10);
    let result = scan("192.0.2.1", &[22, 80, 443], &config).await.unwrap();

    assert_eq!(result.filtered().len() + result.errors().len(), 3);
    assert!(result.open().is_empty());
}
