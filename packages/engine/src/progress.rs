//! Progress reporting for coverage runs.
//!
//! The engine reports one unit of work per (region, snapshot) pair through
//! a [`ProgressCallback`], so the CLI can draw an `indicatif` bar while
//! library callers and tests pass [`null_progress`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Trait for reporting progress from a coverage run.
///
/// Implementations must be `Send + Sync`; regions are processed on rayon
/// worker threads that all report into the same callback.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// A [`ProgressCallback`] that only counts, for tests and log-only callers.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    done: AtomicU64,
}

impl CountingProgress {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

impl ProgressCallback for CountingProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::Relaxed);
    }

    fn set_message(&self, _msg: String) {}

    fn finish(&self, msg: String) {
        log::debug!("{msg}");
    }
}
