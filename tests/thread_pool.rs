// tests/thread_pool.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reactor::engine::{ThreadPoolSizer, WorkerCount, WorkerPool};

#[test]
fn per_core_expression_multiplies_by_cores() {
    let sizer = ThreadPoolSizer::with_cores(4);
    assert_eq!(
        sizer.worker_count(Some("2.0C"), true, 16),
        WorkerCount::Fixed(8)
    );
}

#[test]
fn c_suffix_implies_per_core() {
    let sizer = ThreadPoolSizer::with_cores(4);
    assert_eq!(sizer.worker_count(Some("1.5C"), false, 16), WorkerCount::Fixed(6));
    assert_eq!(sizer.worker_count(Some("0.5c"), false, 16), WorkerCount::Fixed(2));
}

#[test]
fn per_core_flag_applies_to_plain_number() {
    let sizer = ThreadPoolSizer::with_cores(3);
    assert_eq!(sizer.worker_count(Some("2"), true, 16), WorkerCount::Fixed(6));
    assert_eq!(sizer.worker_count(Some("2"), false, 16), WorkerCount::Fixed(2));
}

#[test]
fn worker_count_is_capped_by_largest_project_list() {
    let sizer = ThreadPoolSizer::with_cores(8);
    assert_eq!(sizer.worker_count(Some("2.0C"), true, 5), WorkerCount::Fixed(5));
    assert_eq!(sizer.worker_count(Some("32"), false, 3), WorkerCount::Fixed(3));
}

#[test]
fn missing_config_defaults_to_cores_or_project_count() {
    let sizer = ThreadPoolSizer::with_cores(4);
    assert_eq!(sizer.worker_count(None, false, 10), WorkerCount::Fixed(4));
    assert_eq!(sizer.worker_count(None, false, 2), WorkerCount::Fixed(2));
}

#[test]
fn degenerate_config_falls_back_to_default() {
    init_tracing();
    let sizer = ThreadPoolSizer::with_cores(4);
    for expr in ["", "abc", "-2", "0", "0C", "2CC", "1,5"] {
        assert_eq!(
            sizer.worker_count(Some(expr), false, 10),
            WorkerCount::Fixed(4),
            "expression {expr:?}"
        );
    }
}

#[test]
fn unbounded_keyword_gives_unbounded_pool() {
    let sizer = ThreadPoolSizer::with_cores(4);
    assert_eq!(
        sizer.worker_count(Some("unbounded"), false, 10),
        WorkerCount::Unbounded
    );
    assert_eq!(
        sizer.worker_count(Some("Unlimited"), false, 10),
        WorkerCount::Unbounded
    );
}

#[tokio::test]
async fn pool_never_exceeds_fixed_worker_count() {
    init_tracing();

    let mut pool: WorkerPool<usize, usize> = WorkerPool::new(WorkerCount::Fixed(3));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..10 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        pool.submit(i, async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            i * 2
        });
    }

    let mut seen = Vec::new();
    while let Some((label, value)) = with_timeout(pool.next_completed()).await {
        assert_eq!(value, Ok(label * 2));
        seen.push(label);
    }
    seen.sort();

    assert_eq!(seen, (0..10).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    pool.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn panicking_task_is_reported_with_its_label() {
    init_tracing();

    let mut pool: WorkerPool<&'static str, ()> = WorkerPool::new(WorkerCount::Fixed(2));
    pool.submit("ok", async {});
    pool.submit("boom", async { panic!("worker exploded") });

    let mut results = Vec::new();
    while let Some(done) = with_timeout(pool.next_completed()).await {
        results.push(done);
    }
    results.sort_by_key(|(label, _)| *label);

    assert_eq!(results.len(), 2);
    let (label, err) = &results[0];
    assert_eq!(*label, "boom");
    assert_eq!(err.as_ref().unwrap_err(), "worker exploded");
    assert_eq!(results[1], ("ok", Ok(())));
}

#[tokio::test]
async fn shutdown_aborts_stray_tasks_after_grace_period() {
    init_tracing();

    let mut pool: WorkerPool<u8, ()> = WorkerPool::new(WorkerCount::Unbounded);
    pool.submit(1, async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let started = std::time::Instant::now();
    with_timeout(pool.shutdown(Duration::from_millis(50))).await;
    assert!(started.elapsed() < Duration::from_secs(5));
}
