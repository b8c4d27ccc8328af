#![forbid(unsafe_code)]

pub mod data;
pub mod encode;
pub mod foundation;
pub mod pipeline;
pub mod render;
pub mod run;

pub use data::timeline::{LoadReport, Sample, Timeline, build_timeline, load_timeline};
pub use encode::{GifSequenceEncoder, PalettedFrame, Quantized, quantize};
pub use foundation::config::{
    Bounds, DecodeOptions, GifOptions, PlotSettings, PlotView, RunConfig, SummaryOptions,
    default_concurrency,
};
pub use foundation::core::{Axis, AxisRange, Canvas, FrameRGBA, FrameRange, Position};
pub use foundation::error::{TrackError, TrackResult};
pub use pipeline::{BoundedExecutor, FrameResult, LogProgress, NoProgress, ProgressObserver};
pub use render::frame::{FrameRenderer, FrameRequest, TrajectoryRenderer};
pub use render::summary::{AxisStats, Histogram, Summary, summarize};
pub use render::svg::SvgRasterizer;
pub use run::{RunOutcome, run, write_animation};
