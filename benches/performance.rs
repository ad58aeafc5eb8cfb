//! Performance benchmarks for batch handling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use messages_event_bus::poller::{collect_batch, filter_convo};
use messages_event_bus::{ConvoId, LogEntry, LogKind, Revision};

fn make_page(size: usize, convos: usize) -> Vec<LogEntry> {
    (0..size)
        .map(|i| {
            LogEntry::new(
                LogKind::CreateMessage,
                format!("{:012}", i).as_str(),
                format!("convo-{}", i % convos).as_str(),
            )
        })
        .collect()
}

/// Benchmark cursor advancement over pages of increasing size
fn bench_collect_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_batch");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("page_size", size), &size, |b, &size| {
            let page = make_page(size, 16);
            b.iter(|| {
                let mut cursor = Some(Revision::new(format!("{:012}", size / 2)));
                black_box(collect_batch(&mut cursor, page.clone()));
            });
        });
    }

    group.finish();
}

/// Benchmark per-conversation filtering as the number of conversations grows
fn bench_filter_convo(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_convo");
    let target = ConvoId::from("convo-0");

    for convos in [1, 16, 256] {
        group.bench_with_input(BenchmarkId::new("convos", convos), &convos, |b, &convos| {
            let batch = make_page(1000, convos);
            b.iter(|| {
                black_box(filter_convo(&batch, &target));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_collect_batch, bench_filter_convo);
criterion_main!(benches);
