//! Stress tests for concurrent dispatch
//!
//! These tests verify:
//! - No entries are lost when many threads share one registry
//! - Per-thread files stay isolated under heavy interleaving
//! - Enable/disable toggles racing with dispatch never deadlock
//! - Executors drain completely on shutdown under load

use rust_logit::backends::{
    ConsoleBackend, ConsoleConfig, RotatingFileBackend, RotatingFileConfig, UniqueFileBackend,
    UniqueFileConfig,
};
use rust_logit::prelude::*;
use rust_logit::TaskExecutor;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const JAN_5: i64 = 1_704_450_030_000;

#[derive(Clone, Default)]
struct CountingSink(Arc<AtomicUsize>);

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let lines = buf.iter().filter(|b| **b == b'\n').count();
        self.0.fetch_add(lines, Ordering::Relaxed);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_no_entries_lost_across_backends() {
    const THREADS: usize = 10;
    const PER_THREAD: usize = 500;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let out = CountingSink::default();
    let err = CountingSink::default();

    let registry = Arc::new(
        Registry::builder()
            .backend(
                PatternFormatter::new("%v").unwrap(),
                RotatingFileBackend::new(RotatingFileConfig::new(temp_dir.path())).unwrap(),
            )
            .backend(
                PatternFormatter::new("[%l] %v").unwrap(),
                ConsoleBackend::with_streams(
                    ConsoleConfig::default(),
                    false,
                    Box::new(out.clone()),
                    Box::new(err.clone()),
                )
                .unwrap(),
            )
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let level = if i % 10 == 0 { LogLevel::Error } else { LogLevel::Info };
                    let record = LogRecord::new(level, format!("{} {}", t, i)).with_timestamp_ms(JAN_5);
                    assert_eq!(registry.log(&record), 2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    registry.wait();

    let content = std::fs::read_to_string(temp_dir.path().join("2024-01-05.log")).unwrap();
    assert_eq!(content.lines().count(), THREADS * PER_THREAD);
    let console_lines = out.0.load(Ordering::Relaxed) + err.0.load(Ordering::Relaxed);
    assert_eq!(console_lines, THREADS * PER_THREAD);
    assert_eq!(err.0.load(Ordering::Relaxed), THREADS * PER_THREAD / 10);
    assert_eq!(registry.metrics().total_logged() as usize, THREADS * PER_THREAD);
}

#[test]
fn test_unique_files_isolated_under_load() {
    const THREADS: usize = 12;
    const PER_THREAD: usize = 300;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = Arc::new(UniqueFileBackend::new(UniqueFileConfig::new(temp_dir.path())).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let backend = Arc::clone(&backend);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let record = LogRecord::new(LogLevel::Debug, "x");
                    backend.log(&record, &format!("{} {}", t, i)).unwrap();
                }
                backend.wait_thread(thread::current().id());
                (t, backend.file_for_thread(thread::current().id()).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (t, path) = handle.join().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let expected: Vec<String> = (0..PER_THREAD).map(|i| format!("{} {}", t, i)).collect();
        let actual: Vec<&str> = content.lines().collect();
        assert_eq!(actual, expected);
    }
    assert_eq!(backend.thread_count(), THREADS);
}

#[test]
fn test_toggling_entries_while_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Arc::new(Registry::new());
    for name in ["a", "b", "c"] {
        registry.add(
            PatternFormatter::new("%v").unwrap(),
            RotatingFileBackend::new(RotatingFileConfig::new(temp_dir.path().join(name))).unwrap(),
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    let toggler = {
        let registry = Arc::clone(&registry);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                for index in 0..3 {
                    registry.enable(index, flip).unwrap();
                }
                flip = !flip;
                thread::yield_now();
            }
            for index in 0..3 {
                registry.enable(index, true).unwrap();
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..1000 {
                    registry.log(&LogRecord::new(LogLevel::Info, format!("{}", i)));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    toggler.join().unwrap();
    registry.wait();

    let metrics = registry.metrics();
    assert_eq!(metrics.total_logged() + metrics.dropped_count(), 4000);
    assert!((0..3).all(|i| registry.is_enabled(i).unwrap()));
}

#[test]
fn test_executor_shutdown_under_load() {
    let executor = Arc::new(TaskExecutor::new("stress").unwrap());
    let done = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let executor = Arc::clone(&executor);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut accepted = 0;
                for _ in 0..2000 {
                    let done = Arc::clone(&done);
                    let submitted = executor.submit(move || {
                        done.fetch_add(1, Ordering::SeqCst);
                    });
                    if submitted.is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    executor.shutdown();

    let accepted: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();
    assert_eq!(done.load(Ordering::SeqCst), accepted);
    assert!(!executor.is_running());
}
