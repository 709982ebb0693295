//! Completion tracking for fan-out work.
//!
//! [`BatchJoin`] counts a fixed number of tasks down to zero and fires a
//! completion callback exactly once, on whichever thread reports the last
//! task. [`AbortFlag`] is the cooperative cancel signal the export worker
//! polls between assets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// Counts for a finished batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// True only when every task ran and none failed. A batch abandoned
    /// part way through never reads as a success.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.completed == self.total
    }
}

struct JoinState {
    remaining: usize,
    completed: usize,
    failed: usize,
    total: usize,
    on_complete: Option<Box<dyn FnOnce(BatchSummary) + Send>>,
}

/// Join point for a known number of parallel tasks.
///
/// Each task calls [`BatchJoin::task_done`] exactly once. The callback runs
/// when the last task reports, outside the internal lock. A batch created
/// with zero pending tasks completes immediately.
pub struct BatchJoin {
    state: Mutex<JoinState>,
}

impl BatchJoin {
    pub fn new(
        pending: usize,
        on_complete: impl FnOnce(BatchSummary) + Send + 'static,
    ) -> Arc<BatchJoin> {
        let join = Arc::new(BatchJoin {
            state: Mutex::new(JoinState {
                remaining: pending,
                completed: 0,
                failed: 0,
                total: pending,
                on_complete: Some(Box::new(on_complete)),
            }),
        });
        if pending == 0 {
            join.fire();
        }
        join
    }

    /// Reports one task finished. Calls past the batch size are ignored.
    pub fn task_done(&self, succeeded: bool) {
        let callback = {
            let mut state = self.state.lock();
            if state.remaining == 0 {
                warn!("task reported after its batch completed");
                return;
            }
            state.remaining -= 1;
            if succeeded {
                state.completed += 1;
            } else {
                state.failed += 1;
            }
            if state.remaining == 0 {
                state.on_complete.take().map(|cb| (cb, summary_of(&state)))
            } else {
                None
            }
        };
        if let Some((cb, summary)) = callback {
            cb(summary);
        }
    }

    fn fire(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.on_complete.take().map(|cb| (cb, summary_of(&state)))
        };
        if let Some((cb, summary)) = callback {
            cb(summary);
        }
    }
}

fn summary_of(state: &JoinState) -> BatchSummary {
    BatchSummary {
        total: state.total,
        completed: state.completed,
        failed: state.failed,
    }
}

/// Shared cancel signal. Cloning hands out another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> AbortFlag {
        AbortFlag::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recording() -> (Arc<Mutex<Vec<BatchSummary>>>, Arc<Mutex<Vec<BatchSummary>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        (fired.clone(), fired)
    }

    #[test]
    fn zero_item_batch_completes_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let _join = BatchJoin::new(0, move |summary| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(summary, BatchSummary { total: 0, completed: 0, failed: 0 });
            assert!(summary.all_succeeded());
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_task_fires_the_callback_once() {
        let (fired, sink) = recording();
        let join = BatchJoin::new(3, move |summary| sink.lock().push(summary));

        join.task_done(true);
        join.task_done(false);
        assert!(fired.lock().is_empty());

        join.task_done(true);
        let summaries = fired.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0], BatchSummary { total: 3, completed: 2, failed: 1 });
        assert!(!summaries[0].all_succeeded());
    }

    #[test]
    fn reports_after_completion_are_ignored() {
        let (fired, sink) = recording();
        let join = BatchJoin::new(1, move |summary| sink.lock().push(summary));

        join.task_done(true);
        join.task_done(true);
        join.task_done(false);

        let summaries = fired.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0], BatchSummary { total: 1, completed: 1, failed: 0 });
    }

    #[test]
    fn tasks_join_from_worker_threads() {
        let (fired, sink) = recording();
        let join = BatchJoin::new(4, move |summary| sink.lock().push(summary));

        std::thread::scope(|scope| {
            for index in 0..4 {
                let join = join.clone();
                scope.spawn(move || join.task_done(index != 2));
            }
        });

        let summaries = fired.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0], BatchSummary { total: 4, completed: 3, failed: 1 });
    }

    #[test]
    fn abort_flag_round_trip() {
        let flag = AbortFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_aborted());
        handle.abort();
        assert!(flag.is_aborted());
    }
}
