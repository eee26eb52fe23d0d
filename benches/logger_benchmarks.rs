//! Criterion benchmarks for rust_logit

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_logit::backends::{RotatingFileBackend, RotatingFileConfig};
use rust_logit::prelude::*;
use rust_logit::{compile, DEFAULT_PATTERN};
use std::sync::Arc;
use tempfile::TempDir;

fn sample_record() -> LogRecord {
    LogRecord::new(LogLevel::Warn, "request {} took {:.2}ms")
        .with_timestamp_ms(1_704_450_030_042)
        .with_source(SourceContext::new("src/server/handler.rs", "handle_request", 118))
        .with_arg(VariableValue::new("path", "/api/users"))
        .with_arg(VariableValue::new("elapsed", 12.3456))
        .with_arg(VariableValue::new("status", 200))
}

/// Backend that discards everything
struct NullBackend;

impl Backend for NullBackend {
    fn log(&self, _record: &LogRecord, text: &str) -> rust_logit::Result<()> {
        black_box(text);
        Ok(())
    }

    fn wait(&self) {}

    fn name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Pattern Benchmarks
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_compile");
    group.throughput(Throughput::Elements(1));

    group.bench_function("default_pattern", |b| {
        b.iter(|| black_box(compile(black_box(DEFAULT_PATTERN)).unwrap()));
    });

    group.bench_function("modifiers_and_group", |b| {
        b.iter(|| {
            black_box(compile(black_box("%-8l %=20!@ %10!t %N(<empty>)%^%v%$")).unwrap())
        });
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Elements(1));
    let record = sample_record();

    let default = PatternFormatter::builder(DEFAULT_PATTERN).build().unwrap();
    group.bench_function("default_pattern", |b| {
        b.iter(|| black_box(default.format(black_box(&record))));
    });

    let stripped = PatternFormatter::builder(DEFAULT_PATTERN)
        .strip_colors(true)
        .build()
        .unwrap();
    group.bench_function("default_pattern_stripped", |b| {
        b.iter(|| black_box(stripped.format(black_box(&record))));
    });

    let message_only = PatternFormatter::new("%v").unwrap();
    group.bench_function("message_only", |b| {
        b.iter(|| black_box(message_only.format(black_box(&record))));
    });

    group.bench_function("json", |b| {
        b.iter(|| black_box(default.render_json(black_box(&record))));
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));
    let record = sample_record();

    let null_registry = Registry::new();
    null_registry.add(PatternFormatter::new(DEFAULT_PATTERN).unwrap(), NullBackend);
    group.bench_function("null_backend", |b| {
        b.iter(|| black_box(null_registry.log(black_box(&record))));
    });

    let filtered = Registry::builder()
        .min_level(LogLevel::Error)
        .backend(PatternFormatter::new(DEFAULT_PATTERN).unwrap(), NullBackend)
        .build()
        .unwrap();
    group.bench_function("filtered_by_level", |b| {
        b.iter(|| black_box(filtered.log(black_box(&record))));
    });

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let sync_file = Registry::new();
    sync_file.add(
        PatternFormatter::new(DEFAULT_PATTERN).unwrap(),
        RotatingFileBackend::new(
            RotatingFileConfig::new(temp_dir.path().join("sync")).with_asynchronous(false),
        )
        .unwrap(),
    );
    group.bench_function("sync_rotating_file", |b| {
        b.iter(|| black_box(sync_file.log(black_box(&record))));
    });

    let async_file = Registry::new();
    async_file.add(
        PatternFormatter::new(DEFAULT_PATTERN).unwrap(),
        RotatingFileBackend::new(RotatingFileConfig::new(temp_dir.path().join("async"))).unwrap(),
    );
    group.bench_function("async_rotating_file", |b| {
        b.iter(|| black_box(async_file.log(black_box(&record))));
    });
    async_file.wait();

    group.finish();
}

fn bench_concurrent_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_dispatch");
    let threads = 4;
    let per_thread = 250;
    group.throughput(Throughput::Elements((threads * per_thread) as u64));

    let registry = Arc::new(Registry::new());
    registry.add(PatternFormatter::new(DEFAULT_PATTERN).unwrap(), NullBackend);

    group.bench_function("four_threads_null_backend", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    std::thread::spawn(move || {
                        let record = sample_record();
                        for _ in 0..per_thread {
                            registry.log(&record);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_render,
    bench_dispatch,
    bench_concurrent_dispatch
);
criterion_main!(benches);
