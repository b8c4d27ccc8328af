use std::collections::HashMap;

use crate::data::timeline::Timeline;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{TrackError, TrackResult};
use crate::render::frame::{FrameRenderer, FrameRequest};

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const SAMPLE_FACTOR: i32 = 10;

/// A frame reduced to an indexed palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalettedFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB triples, at most 256 entries.
    pub palette: Vec<u8>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
}

impl PalettedFrame {
    pub fn palette_len(&self) -> usize {
        self.palette.len() / 3
    }

    /// RGB color of the pixel at `(x, y)`.
    pub fn color_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.indices[(y as usize) * (self.width as usize) + (x as usize)] as usize * 3;
        [self.palette[i], self.palette[i + 1], self.palette[i + 2]]
    }
}

/// Reduce `frame` to at most `palette_size` colors with a single NeuQuant pass.
pub fn quantize(frame: &FrameRGBA, palette_size: usize) -> TrackResult<PalettedFrame> {
    if !(2..=256).contains(&palette_size) {
        return Err(TrackError::encoding(format!(
            "palette size must be within 2..=256 (got {palette_size})"
        )));
    }
    let expected = (frame.width as usize) * (frame.height as usize) * 4;
    if frame.data.is_empty() || frame.data.len() != expected {
        return Err(TrackError::encoding(format!(
            "frame buffer has {} bytes, expected {expected} for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let nq = color_quant::NeuQuant::new(SAMPLE_FACTOR, palette_size, &frame.data);
    let palette = nq.color_map_rgb();

    // Plot frames have few distinct colors; memoize the network search.
    let mut cache = HashMap::<[u8; 4], u8>::new();
    let mut indices = Vec::with_capacity(frame.data.len() / 4);
    for px in frame.data.chunks_exact(4) {
        let key = [px[0], px[1], px[2], px[3]];
        let idx = *cache
            .entry(key)
            .or_insert_with(|| u8::try_from(nq.index_of(px)).unwrap_or(u8::MAX));
        indices.push(idx);
    }

    Ok(PalettedFrame {
        width: frame.width,
        height: frame.height,
        palette,
        indices,
    })
}

/// Quantizes the output of an RGBA renderer inside the render task.
#[derive(Clone, Debug)]
pub struct Quantized<R> {
    inner: R,
    palette_size: usize,
}

impl<R> Quantized<R> {
    pub fn new(inner: R, palette_size: usize) -> Self {
        Self {
            inner,
            palette_size,
        }
    }
}

impl<R> FrameRenderer for Quantized<R>
where
    R: FrameRenderer<Output = FrameRGBA>,
{
    type Output = PalettedFrame;

    fn render(&self, timeline: &Timeline, req: FrameRequest) -> TrackResult<PalettedFrame> {
        let rgba = self.inner.render(timeline, req)?;
        quantize(&rgba, self.palette_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_color_frame() -> FrameRGBA {
        let (w, h) = (128u32, 128u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let px = if y < 40 {
                    [0, 0, 0, 255]
                } else if x < 48 {
                    [255, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                };
                data.extend_from_slice(&px);
            }
        }
        FrameRGBA {
            width: w,
            height: h,
            data,
        }
    }

    fn close(a: [u8; 3], b: [u8; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 24)
    }

    #[test]
    fn maps_every_pixel_to_a_nearby_palette_color() {
        let frame = three_color_frame();
        let q = quantize(&frame, 256).unwrap();

        assert_eq!(q.indices.len(), 128 * 128);
        assert!(q.palette_len() <= 256);
        assert_eq!(q.palette.len() % 3, 0);
        assert!(close(q.color_at(0, 0), [0, 0, 0]));
        assert!(close(q.color_at(100, 100), [255, 255, 255]));
        let [r, g, b] = q.color_at(10, 100);
        assert!(r >= 180 && g <= 80 && b <= 80, "red mapped to {r},{g},{b}");
        assert_eq!(q.indices[0], q.indices[127]);
        assert_ne!(q.color_at(0, 0), q.color_at(100, 100));
    }

    #[test]
    fn rejects_bad_palette_size_and_buffers() {
        let frame = three_color_frame();
        assert!(matches!(quantize(&frame, 1), Err(TrackError::Encoding(_))));
        assert!(matches!(quantize(&frame, 257), Err(TrackError::Encoding(_))));

        let short = FrameRGBA {
            width: 4,
            height: 4,
            data: vec![0; 10],
        };
        assert!(matches!(quantize(&short, 256), Err(TrackError::Encoding(_))));
    }
}
