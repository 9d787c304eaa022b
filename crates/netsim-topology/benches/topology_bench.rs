//! Benchmarks for the netsim topology engine
//!
//! Measures performance of:
//! - Device placement
//! - Link creation with duplicate checks
//! - Packet ticks across busy links
//! - Hit testing
//! - Snapshot export/import

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netsim_topology::{DeviceId, DeviceKind, LinkKind, Point, Protocol, Topology};

/// Build a ring of `n` devices with a link between each neighbour pair.
fn ring(n: usize) -> (Topology, Vec<DeviceId>) {
    let mut topo = Topology::default();
    let ids: Vec<DeviceId> = (0..n)
        .map(|i| {
            let kind = DeviceKind::ALL[i % DeviceKind::ALL.len()];
            topo.add_device(kind, Point::new((i % 40) as f64 * 50.0, (i / 40) as f64 * 50.0))
        })
        .collect();
    for i in 0..n {
        let _ = topo.add_connection(&ids[i], &ids[(i + 1) % n], LinkKind::Ethernet);
    }
    (topo, ids)
}

/// Benchmark device placement
fn bench_add_device(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_device");

    for &count in &[10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            b.iter(|| {
                let mut topo = Topology::default();
                for i in 0..n {
                    topo.add_device(DeviceKind::Workstation, Point::new(i as f64, 0.0));
                }
                black_box(topo.device_count())
            })
        });
    }
    group.finish();
}

/// Benchmark link creation, which scans existing links for duplicates
fn bench_add_connection(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_connection");

    for &count in &[10usize, 100, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            b.iter(|| black_box(ring(n)).0.link_count())
        });
    }
    group.finish();
}

/// Benchmark one animation tick with packets on every link
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for &count in &[10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64 * 10));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let (mut topo, ids) = ring(n);
                    for _ in 0..10 {
                        for i in 0..n {
                            let _ = topo.send_packet(&ids[i], &ids[(i + 1) % n], Protocol::Tcp);
                        }
                    }
                    topo
                },
                |mut t| black_box(t.tick()),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

/// Benchmark pointer hit testing against the last-inserted device
fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_at");

    for &count in &[10usize, 100, 1000] {
        let (topo, ids) = ring(count);
        let target = topo.device(&ids[count - 1]).map(|d| d.position).unwrap_or_default();
        group.bench_with_input(BenchmarkId::from_parameter(count), &target, |b, &p| {
            b.iter(|| topo.device_at(black_box(p)))
        });
    }
    group.finish();
}

/// Benchmark snapshot round trip through JSON
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for &count in &[10usize, 100, 1000] {
        let (topo, _) = ring(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("export", count), &topo, |b, t| {
            b.iter(|| t.export_snapshot().to_json_pretty())
        });

        let snapshot = topo.export_snapshot();
        group.bench_with_input(BenchmarkId::new("import", count), &snapshot, |b, s| {
            b.iter(|| {
                let mut fresh = Topology::default();
                fresh.import_snapshot(black_box(s.clone()))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add_device,
    bench_add_connection,
    bench_tick,
    bench_hit_test,
    bench_snapshot,
);

criterion_main!(benches);
