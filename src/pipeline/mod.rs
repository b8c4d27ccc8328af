//! Bounded-concurrency frame rendering with ordered results.

pub mod executor;
pub mod frames;
pub mod progress;

pub use executor::BoundedExecutor;
pub use frames::{FrameResult, render_frames};
pub use progress::{LogProgress, NoProgress, ProgressObserver};
