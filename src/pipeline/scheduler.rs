use std::time::Duration;

use rayon::prelude::*;

use crate::foundation::config::ThreadingConfig;
use crate::foundation::error::{EnhanceError, EnhanceResult};

/// Build the decoder's worker pool; `threads` of `Some(0)` is rejected.
pub fn build_thread_pool(threads: Option<usize>) -> EnhanceResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(EnhanceError::validation(
            "threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("enhance-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| EnhanceError::decode(format!("failed to build rayon thread pool: {e}")))
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Work units run across all phases.
    pub units: u64,
    /// Commands generated across all tiles.
    pub commands: u64,
    /// Base-resolution residual phase.
    pub loq1_time: Duration,
    /// Upscale and full-resolution residual phase.
    pub loq0_time: Duration,
    /// Sharpen phase.
    pub sharpen_time: Duration,
    /// Output conversion phase.
    pub convert_time: Duration,
}

/// Fans work units out over the worker pool, or runs them in order without one.
///
/// Either way every unit runs exactly once and results come back in unit order, so a sequential
/// scheduler produces the same frame as a parallel one.
#[derive(Debug)]
pub struct Scheduler {
    pool: Option<rayon::ThreadPool>,
}

impl Scheduler {
    /// Scheduler for `threading`; builds a pool only when `parallel` is set.
    pub fn new(threading: &ThreadingConfig) -> EnhanceResult<Self> {
        let pool = if threading.parallel {
            Some(build_thread_pool(threading.threads)?)
        } else {
            None
        };
        Ok(Self { pool })
    }

    /// Scheduler that runs everything on the calling thread.
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// Worker pool, when parallel.
    pub fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool.as_ref()
    }

    /// Worker count; 1 when sequential.
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, rayon::ThreadPool::current_num_threads)
    }

    /// Run `work` on every unit with per-worker state from `init`.
    ///
    /// All units run even when some fail; the first failure is reported as a
    /// [`EnhanceError::Decode`] naming `stage` and the failure count.
    pub fn run<U, R, S, I, F>(
        &self,
        stage: &'static str,
        units: Vec<U>,
        init: I,
        work: F,
    ) -> EnhanceResult<Vec<R>>
    where
        U: Send,
        R: Send,
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, U) -> EnhanceResult<R> + Sync + Send,
    {
        let results: Vec<EnhanceResult<R>> = match &self.pool {
            Some(pool) => pool.install(|| {
                units
                    .into_par_iter()
                    .map_init(&init, |state, unit| work(state, unit))
                    .collect()
            }),
            None => {
                let mut state = init();
                units
                    .into_iter()
                    .map(|unit| work(&mut state, unit))
                    .collect()
            }
        };
        collect_results(stage, results)
    }
}

fn collect_results<R>(stage: &str, results: Vec<EnhanceResult<R>>) -> EnhanceResult<Vec<R>> {
    let total = results.len();
    let mut out = Vec::with_capacity(total);
    let mut first = None;
    let mut failed = 0usize;
    for item in results {
        match item {
            Ok(v) => out.push(v),
            Err(e) => {
                failed += 1;
                first.get_or_insert(e);
            }
        }
    }
    match first {
        None => Ok(out),
        Some(err) => {
            tracing::warn!(stage, failed, total, error = %err, "work units failed");
            Err(EnhanceError::decode(format!(
                "{stage}: {failed} of {total} units failed, first: {err}"
            )))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/scheduler.rs"]
mod tests;
