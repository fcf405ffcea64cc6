// src/engine/pool.rs

//! Worker sizing and the per-build worker pool.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// `<n>` or `<n>C`, where `n` may be fractional.
static THREAD_EXPR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?i)([0-9]+(?:\.[0-9]+)?)\s*(c)?$").ok());

/// How many projects may build at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCount {
    Fixed(usize),
    Unbounded,
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCount::Fixed(n) => write!(f, "{n}"),
            WorkerCount::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Turns a thread-count expression into a [`WorkerCount`].
#[derive(Debug, Clone, Copy)]
pub struct ThreadPoolSizer {
    cores: usize,
}

impl Default for ThreadPoolSizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPoolSizer {
    /// Sizer using the parallelism reported by the OS.
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_cores(cores)
    }

    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores: cores.max(1),
        }
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Worker count for `config`, never above `largest`, the size of the
    /// biggest project list of any segment.
    ///
    /// - `None` gives `min(cores, largest)`.
    /// - `"unbounded"` / `"unlimited"` gives [`WorkerCount::Unbounded`].
    /// - `"<n>C"`, or `"<n>"` with `per_core`, gives `round(n * cores)`.
    /// - Anything unparseable, zero or negative falls back to the default
    ///   with a warning.
    pub fn worker_count(&self, config: Option<&str>, per_core: bool, largest: usize) -> WorkerCount {
        let largest = largest.max(1);
        let fallback = WorkerCount::Fixed(self.cores.min(largest));

        let Some(expr) = config else {
            return fallback;
        };

        let trimmed = expr.trim();
        if trimmed.eq_ignore_ascii_case("unbounded") || trimmed.eq_ignore_ascii_case("unlimited") {
            return WorkerCount::Unbounded;
        }

        let Some(caps) = THREAD_EXPR.as_ref().and_then(|re| re.captures(trimmed)) else {
            warn!(threads = %expr, fallback = %fallback, "invalid thread count; using default");
            return fallback;
        };

        let value: f32 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(threads = %expr, fallback = %fallback, "invalid thread count; using default");
                return fallback;
            }
        };
        let per_core = per_core || caps.get(2).is_some();
        let scaled = if per_core {
            value * self.cores as f32
        } else {
            value
        };

        let count = scaled.round() as usize;
        if count == 0 {
            warn!(threads = %expr, fallback = %fallback, "thread count must be positive; using default");
            return fallback;
        }

        let count = count.min(largest);
        debug!(threads = %expr, per_core, cores = self.cores, count, "resolved worker count");
        WorkerCount::Fixed(count)
    }
}

/// Bounded set of concurrently running build tasks for one build.
///
/// Each submitted task waits for a permit (unless the pool is unbounded or
/// the task is submitted unthrottled), then runs on its own tokio task so a
/// panic is reported as an `Err` with the panic message instead of being
/// lost. Aborting the pool aborts the inner tasks too.
pub struct WorkerPool<L, T> {
    tasks: JoinSet<(L, Result<T, String>)>,
    permits: Option<Arc<Semaphore>>,
    count: WorkerCount,
}

impl<L, T> fmt::Debug for WorkerPool<L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("count", &self.count)
            .field("in_flight", &self.tasks.len())
            .finish()
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<L, T> WorkerPool<L, T>
where
    L: Send + 'static,
    T: Send + 'static,
{
    pub fn new(count: WorkerCount) -> Self {
        let permits = match count {
            WorkerCount::Fixed(n) => Some(Arc::new(Semaphore::new(n.max(1)))),
            WorkerCount::Unbounded => None,
        };
        Self {
            tasks: JoinSet::new(),
            permits,
            count,
        }
    }

    pub fn count(&self) -> WorkerCount {
        self.count
    }

    /// Permits limiting concurrency; `None` when unbounded.
    pub fn permits(&self) -> Option<Arc<Semaphore>> {
        self.permits.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `fut` once a worker slot is free.
    pub fn submit<F>(&mut self, label: L, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.tasks.spawn(async move {
            let _permit = match permits {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return (label, Err("worker pool closed".to_string())),
                },
                None => None,
            };
            let result = run_isolated(fut).await;
            (label, result)
        });
    }

    /// Run `fut` without taking a worker slot.
    ///
    /// The task is expected to take [`WorkerPool::permits`] itself around
    /// the parts that must be throttled.
    pub fn submit_unthrottled<F>(&mut self, label: L, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let result = run_isolated(fut).await;
            (label, result)
        });
    }

    /// Wait for the next task to finish. `None` once the pool is empty.
    pub async fn next_completed(&mut self) -> Option<(L, Result<T, String>)> {
        loop {
            match self.tasks.join_next().await? {
                Ok(done) => return Some(done),
                Err(err) => warn!(error = %err, "worker task ended without reporting"),
            }
        }
    }

    /// Wait up to `grace` for outstanding tasks, then abort whatever is left.
    pub async fn shutdown(mut self, grace: Duration) {
        if self.tasks.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                stray = self.tasks.len(),
                grace_ms = grace.as_millis() as u64,
                "worker tasks still running after grace period; aborting"
            );
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }
    }
}

/// Run `fut` on its own task; a panic comes back as `Err` with its message.
pub(crate) async fn run_isolated<F, T>(fut: F) -> Result<T, String>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut inner = AbortOnDrop(tokio::spawn(fut));
    match (&mut inner.0).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_panic() => Err(panic_message(err.into_panic())),
        Err(err) => Err(err.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
