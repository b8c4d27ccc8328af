//! Palette quantization and animated GIF output.

pub mod animation;
pub mod quantize;

pub use animation::GifSequenceEncoder;
pub use quantize::{PalettedFrame, Quantized, quantize};
