use std::time::Instant;

/// Receives completion notifications from pipeline workers.
///
/// `frame_completed` is called concurrently from worker threads, once per successful task, with
/// the running completion count. Counts are unique but may arrive out of order.
pub trait ProgressObserver: Sync {
    fn frame_completed(&self, completed: usize, total: usize);

    /// Called once on the coordinating thread after the batch ends, successfully or not.
    fn finished(&self, _completed: usize, _total: usize) {}
}

/// Ignores all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn frame_completed(&self, _completed: usize, _total: usize) {}
}

/// Logs `frames rendered N/total` every `interval` completions, with an ETA.
#[derive(Debug)]
pub struct LogProgress {
    interval: usize,
    started: Instant,
}

impl LogProgress {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            started: Instant::now(),
        }
    }

    fn should_report(&self, completed: usize, total: usize) -> bool {
        completed % self.interval == 0 || completed == total
    }
}

impl ProgressObserver for LogProgress {
    fn frame_completed(&self, completed: usize, total: usize) {
        if !self.should_report(completed, total) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let eta = if completed > 0 && completed < total {
            let rate = completed as f64 / elapsed.max(f64::EPSILON);
            (total - completed) as f64 / rate
        } else {
            0.0
        };
        tracing::info!(
            elapsed = %format_duration(elapsed),
            eta = %format_duration(eta),
            "frames rendered {completed}/{total}"
        );
    }

    fn finished(&self, completed: usize, total: usize) {
        tracing::debug!(
            "frame batch finished: {completed}/{total} in {}",
            format_duration(self.started.elapsed().as_secs_f64())
        );
    }
}

fn format_duration(secs: f64) -> String {
    // Below this, one decimal still prints under a minute.
    if secs < 59.95 {
        return format!("{secs:.1}s");
    }
    let total = secs.round() as u64;
    let (hours, mins, rest) = (total / 3600, total % 3600 / 60, total % 60);
    if hours == 0 {
        format!("{mins}m {rest}s")
    } else {
        format!("{hours}h {mins}m {rest}s")
    }
}
