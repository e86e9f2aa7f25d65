//! Performance benchmarks for the portsweep scanner

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portsweep::{resolve_port_spec, ScanConfig, ScanEngine};
use std::net::TcpListener;
use tokio::runtime::Runtime;

/// Benchmark port parsing performance
fn bench_port_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("port_parsing");

    group.bench_function("parse_range_1-65535", |b| {
        b.iter(|| resolve_port_spec(black_box("1-65535")).unwrap())
    });

    let list: String = (1..=2000).map(|p: u16| (p % 500 + 1).to_string()).collect::<Vec<_>>().join(",");
    group.bench_function("parse_list_2000_with_duplicates", |b| {
        b.iter(|| resolve_port_spec(black_box(&list)).unwrap())
    });

    group.finish();
}

/// Benchmark loopback scans at different concurrency bounds
fn bench_loopback_scan(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let listeners: Vec<TcpListener> = (0..20)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    let ports: Vec<u16> = listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect();

    let mut group = c.benchmark_group("loopback_scan");
    group.sample_size(20);

    for concurrency in [1usize, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(concurrency), &concurrency, |b, &concurrency| {
            let config = ScanConfig::new().with_concurrency(concurrency).with_timeout(1000);
            let engine = ScanEngine::new("127.0.0.1", config).unwrap();
            b.iter(|| runtime.block_on(engine.scan(black_box(&ports))).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_port_parsing, bench_loopback_scan);
criterion_main!(benches);
