//! Plot rendering: chart composition, rasterization, trajectory frames and the summary image.

pub mod chart;
pub mod frame;
pub mod summary;
pub mod svg;
