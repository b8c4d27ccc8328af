use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::foundation::error::{TrackError, TrackResult};
use crate::pipeline::progress::ProgressObserver;

/// Runs indexed tasks on a dedicated pool with a fixed number of workers.
///
/// Worker threads are the admission tokens: at most `workers()` tasks execute at any moment.
/// The first task error is kept and returned; once it is recorded, tasks that have not started
/// yet are skipped and in-flight ones run to completion.
pub struct BoundedExecutor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl BoundedExecutor {
    pub fn new(workers: usize) -> TrackResult<Self> {
        if workers == 0 {
            return Err(TrackError::validation("executor concurrency must be >= 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ctrack-render-{i}"))
            .build()
            .map_err(|e| TrackError::render(format!("failed to build rayon thread pool: {e}")))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task(i)` for every slot index and store its output in `slots[i]`.
    ///
    /// Each task owns exactly one slot, so results land in index order regardless of completion
    /// order. On error some slots may still be `None` or hold discarded results.
    pub fn run_indexed<T, F>(
        &self,
        slots: &mut [Option<T>],
        task: F,
        observer: &dyn ProgressObserver,
    ) -> TrackResult<()>
    where
        T: Send,
        F: Fn(usize) -> TrackResult<T> + Sync,
    {
        let total = slots.len();
        let completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);
        let first_err = Mutex::new(None::<TrackError>);

        self.pool.install(|| {
            slots.par_iter_mut().enumerate().for_each(|(i, slot)| {
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                match task(i) {
                    Ok(out) => {
                        *slot = Some(out);
                        let n = completed.fetch_add(1, Ordering::AcqRel) + 1;
                        observer.frame_completed(n, total);
                    }
                    Err(e) => {
                        let mut guard = first_err.lock().unwrap_or_else(PoisonError::into_inner);
                        if guard.is_none() {
                            tracing::debug!(task = i, "task failed, cancelling pending tasks: {e}");
                            *guard = Some(e);
                        }
                        cancelled.store(true, Ordering::Release);
                    }
                }
            });
        });

        observer.finished(completed.load(Ordering::Acquire), total);
        match first_err.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for BoundedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedExecutor")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::NoProgress;

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            BoundedExecutor::new(0),
            Err(TrackError::Validation(_))
        ));
    }

    #[test]
    fn fills_every_slot_in_index_order() {
        let ex = BoundedExecutor::new(3).unwrap();
        let mut slots = vec![None; 20];
        ex.run_indexed(&mut slots, |i| Ok(i * i), &NoProgress)
            .unwrap();
        let got: Vec<usize> = slots.into_iter().map(Option::unwrap).collect();
        assert_eq!(got, (0..20).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn first_error_is_returned() {
        let ex = BoundedExecutor::new(1).unwrap();
        let mut slots = vec![None::<usize>; 10];
        let err = ex
            .run_indexed(
                &mut slots,
                |i| {
                    if i >= 4 {
                        Err(TrackError::render(format!("frame {i}")))
                    } else {
                        Ok(i)
                    }
                },
                &NoProgress,
            )
            .unwrap_err();
        // One worker runs tasks in index order, so the later tasks never start.
        assert_eq!(err.to_string(), TrackError::render("frame 4").to_string());
        assert!(slots[5..].iter().all(Option::is_none));
    }

    #[test]
    fn observer_sees_every_completion_and_one_finish() {
        struct Count {
            calls: AtomicUsize,
            max_seen: AtomicUsize,
            finished: AtomicUsize,
        }
        impl ProgressObserver for Count {
            fn frame_completed(&self, completed: usize, _total: usize) {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.max_seen.fetch_max(completed, Ordering::SeqCst);
            }
            fn finished(&self, completed: usize, total: usize) {
                assert_eq!(completed, total);
                self.finished.fetch_add(1, Ordering::SeqCst);
            }
        }
        let obs = Count {
            calls: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        };
        let ex = BoundedExecutor::new(4).unwrap();
        let mut slots = vec![None; 12];
        ex.run_indexed(&mut slots, Ok, &obs).unwrap();
        assert_eq!(obs.calls.load(Ordering::SeqCst), 12);
        assert_eq!(obs.max_seen.load(Ordering::SeqCst), 12);
        assert_eq!(obs.finished.load(Ordering::SeqCst), 1);
    }
}
