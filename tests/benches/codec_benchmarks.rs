//! # Bleed-Guard Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Probe codec | ClientHello / heartbeat construction |
//! | Probe codec | Response classification by reply size |
//! | Verdict cache | Lookup under a populated cache |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bg_01_heartbeat_probe::{
    build_client_hello, build_malformed_heartbeat_request, classify_heartbeat_response, TlsVersion,
};
use bg_02_interception_gate::{CacheConfig, Host, VerdictCache};

// ============================================================================
// PROBE CODEC
// ============================================================================

fn bench_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe-codec-build");

    group.bench_function("client_hello", |b| {
        b.iter(|| build_client_hello(black_box(TlsVersion::Tls12)))
    });
    group.bench_function("malformed_heartbeat", |b| {
        b.iter(|| build_malformed_heartbeat_request(black_box(TlsVersion::Tls11)))
    });

    group.finish();
}

/// A handshake record followed by a heartbeat record echoing `payload_len`
/// bytes.
fn reply(payload_len: usize) -> Vec<u8> {
    let mut bytes = vec![0x16, 0x03, 0x03, 0x00, 0x04, 0x0E, 0x00, 0x00, 0x00];
    let body_len = (3 + payload_len + 16) as u16;
    bytes.extend([0x18, 0x03, 0x03]);
    bytes.extend(body_len.to_be_bytes());
    bytes.push(0x02);
    bytes.extend((payload_len as u16).to_be_bytes());
    bytes.extend(std::iter::repeat(0xAB).take(payload_len + 16));
    bytes
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe-codec-classify");

    for payload_len in [0usize, 64, 4096, 16_000] {
        let bytes = reply(payload_len);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("heartbeat_reply", payload_len),
            &bytes,
            |b, bytes| b.iter(|| classify_heartbeat_response(0, black_box(bytes))),
        );
    }

    group.finish();
}

// ============================================================================
// VERDICT CACHE
// ============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("verdict-cache");

    for size in [100usize, 10_000] {
        let hosts: Vec<Host> = (0..size)
            .map(|i| Host::parse(&format!("host-{i}.example")).unwrap())
            .collect();

        let unbounded = VerdictCache::new();
        let bounded = VerdictCache::with_config(&CacheConfig {
            ttl: None,
            max_entries: Some(size),
        })
        .unwrap();
        for (i, host) in hosts.iter().enumerate() {
            unbounded.record(host, i % 2 == 0);
            bounded.record(host, i % 2 == 0);
        }

        group.bench_with_input(BenchmarkId::new("lookup_unbounded", size), &hosts, |b, hosts| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % hosts.len();
                black_box(unbounded.lookup(&hosts[i]))
            })
        });
        group.bench_with_input(BenchmarkId::new("lookup_bounded", size), &hosts, |b, hosts| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % hosts.len();
                black_box(bounded.lookup(&hosts[i]))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_builders, bench_classification, bench_cache);
criterion_main!(benches);
