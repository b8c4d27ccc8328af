use crate::data::timeline::Timeline;
use crate::foundation::core::FrameRange;
use crate::foundation::error::{TrackError, TrackResult};
use crate::pipeline::executor::BoundedExecutor;
use crate::pipeline::progress::ProgressObserver;
use crate::render::frame::{FrameRenderer, FrameRequest};

/// One rendered frame of an animation batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameResult<T> {
    /// Position in the output sequence, starting at 0.
    pub index: usize,
    /// Exclusive sample cutoff the frame was rendered with.
    pub cutoff: usize,
    pub image: Option<T>,
}

/// Render cutoffs `beg+1 ..= end` over the window starting at `beg`.
///
/// The returned frames are in ascending index order. An empty range yields an empty vector.
#[tracing::instrument(skip(timeline, renderer, executor, observer), fields(workers = executor.workers()))]
pub fn render_frames<R: FrameRenderer>(
    timeline: &Timeline,
    range: FrameRange,
    renderer: &R,
    executor: &BoundedExecutor,
    observer: &dyn ProgressObserver,
) -> TrackResult<Vec<FrameResult<R::Output>>> {
    let range = FrameRange::new(range.beg, range.end)?;
    if range.is_empty() {
        return Ok(Vec::new());
    }
    if range.end > timeline.len() {
        return Err(TrackError::render(format!(
            "frame range [{}, {}) exceeds timeline length {}",
            range.beg,
            range.end,
            timeline.len()
        )));
    }

    let total = range.len_frames();
    let mut slots: Vec<Option<R::Output>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    executor.run_indexed(
        &mut slots,
        |i| renderer.render(timeline, request_for(range, i)),
        observer,
    )?;

    Ok(slots
        .into_iter()
        .enumerate()
        .map(|(index, image)| FrameResult {
            index,
            cutoff: request_for(range, index).cutoff,
            image,
        })
        .collect())
}

fn request_for(range: FrameRange, index: usize) -> FrameRequest {
    FrameRequest::new(range.beg, range.beg + index + 1)
}
