use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::encode::quantize::PalettedFrame;
use crate::foundation::error::{TrackError, TrackResult};
use crate::pipeline::frames::FrameResult;

/// Writes an ordered frame sequence as one animated GIF.
///
/// Every frame carries its own local palette. The loop count equals the number of frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct GifSequenceEncoder {
    delay_cs: u16,
}

impl GifSequenceEncoder {
    pub fn new(delay_cs: u16) -> Self {
        Self { delay_cs }
    }

    /// Encode `frames` into `out` and hand the writer back.
    pub fn encode<W: Write>(
        &self,
        frames: &[FrameResult<PalettedFrame>],
        out: W,
    ) -> TrackResult<W> {
        let images = check_sequence(frames)?;
        let first = images[0];
        let width = gif_dim(first.width)?;
        let height = gif_dim(first.height)?;

        let mut enc = gif::Encoder::new(out, width, height, &[])
            .map_err(|e| TrackError::encoding(format!("gif header: {e}")))?;
        let loops = u16::try_from(images.len()).unwrap_or(u16::MAX);
        enc.set_repeat(gif::Repeat::Finite(loops))
            .map_err(|e| TrackError::encoding(format!("gif loop extension: {e}")))?;

        for (i, img) in images.iter().enumerate() {
            let frame = gif::Frame {
                width,
                height,
                delay: self.delay_cs,
                palette: Some(img.palette.clone()),
                buffer: Cow::Borrowed(img.indices.as_slice()),
                ..gif::Frame::default()
            };
            enc.write_frame(&frame)
                .map_err(|e| TrackError::encoding(format!("gif frame {i}: {e}")))?;
        }
        Ok(enc.into_inner()?)
    }

    /// Encode to a temporary sibling of `path` and move it into place only on success.
    #[tracing::instrument(skip(self, frames), fields(frames = frames.len()))]
    pub fn write_animation(
        &self,
        frames: &[FrameResult<PalettedFrame>],
        path: &Path,
    ) -> TrackResult<()> {
        check_sequence(frames)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_sibling(path);
        let mut guard = TempFileGuard(Some(tmp_path.clone()));
        let f = std::fs::File::create(&tmp_path)?;
        let mut w = self.encode(frames, std::io::BufWriter::new(f))?;
        w.flush()?;
        drop(w);

        std::fs::rename(&tmp_path, path)?;
        guard.0 = None;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }
}

fn check_sequence(frames: &[FrameResult<PalettedFrame>]) -> TrackResult<Vec<&PalettedFrame>> {
    if frames.is_empty() {
        return Err(TrackError::encoding("cannot encode an empty frame sequence"));
    }
    let mut images: Vec<&PalettedFrame> = Vec::with_capacity(frames.len());
    let mut prev: Option<usize> = None;
    for f in frames {
        if prev.is_some_and(|p| f.index <= p) {
            return Err(TrackError::encoding(format!(
                "frame indices must be strictly ascending (got {} after {})",
                f.index,
                prev.unwrap_or_default()
            )));
        }
        prev = Some(f.index);

        let img = f
            .image
            .as_ref()
            .ok_or_else(|| TrackError::encoding(format!("frame {} has no image", f.index)))?;
        if let Some(first) = images.first().copied() {
            if (img.width, img.height) != (first.width, first.height) {
                return Err(TrackError::encoding(format!(
                    "frame {} is {}x{}, expected {}x{}",
                    f.index, img.width, img.height, first.width, first.height
                )));
            }
        }
        if img.indices.len() != (img.width as usize) * (img.height as usize) {
            return Err(TrackError::encoding(format!(
                "frame {} has {} indices for {}x{} pixels",
                f.index,
                img.indices.len(),
                img.width,
                img.height
            )));
        }
        images.push(img);
    }
    Ok(images)
}

fn gif_dim(v: u32) -> TrackResult<u16> {
    u16::try_from(v).map_err(|_| TrackError::encoding(format!("frame dimension {v} exceeds 65535")))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "animation.gif".to_owned());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, shade: u8) -> PalettedFrame {
        PalettedFrame {
            width,
            height,
            palette: vec![shade, shade, shade, 255, 0, 0],
            indices: vec![0; (width * height) as usize],
        }
    }

    fn seq(n: usize) -> Vec<FrameResult<PalettedFrame>> {
        (0..n)
            .map(|i| FrameResult {
                index: i,
                cutoff: i + 1,
                image: Some(solid(8, 6, (i * 40) as u8)),
            })
            .collect()
    }

    #[test]
    fn encodes_frames_in_order_with_loop_count() {
        let bytes = GifSequenceEncoder::new(3)
            .encode(&seq(4), Vec::new())
            .unwrap();
        assert!(bytes.starts_with(b"GIF89a"));

        let mut opts = gif::DecodeOptions::new();
        opts.set_color_output(gif::ColorOutput::Indexed);
        let mut dec = opts.read_info(bytes.as_slice()).unwrap();
        assert_eq!((dec.width(), dec.height()), (8, 6));

        let mut shades = Vec::new();
        while let Some(frame) = dec.read_next_frame().unwrap() {
            assert_eq!(frame.delay, 3);
            let pal = frame.palette.as_ref().unwrap();
            shades.push(pal[0]);
        }
        assert_eq!(shades, vec![0, 40, 80, 120]);
        assert_eq!(dec.repeat(), gif::Repeat::Finite(4));
    }

    #[test]
    fn rejects_empty_and_incomplete_sequences() {
        let enc = GifSequenceEncoder::default();
        assert!(matches!(
            enc.encode(&[], Vec::new()),
            Err(TrackError::Encoding(_))
        ));

        let mut frames = seq(3);
        frames[1].image = None;
        assert!(matches!(
            enc.encode(&frames, Vec::new()),
            Err(TrackError::Encoding(_))
        ));
    }

    #[test]
    fn rejects_out_of_order_and_mismatched_frames() {
        let enc = GifSequenceEncoder::default();
        let mut frames = seq(3);
        frames.swap(0, 2);
        assert!(matches!(
            enc.encode(&frames, Vec::new()),
            Err(TrackError::Encoding(_))
        ));

        let mut frames = seq(2);
        frames[1].image = Some(solid(9, 6, 0));
        assert!(matches!(
            enc.encode(&frames, Vec::new()),
            Err(TrackError::Encoding(_))
        ));
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        let err = GifSequenceEncoder::default()
            .write_animation(&[], &path)
            .unwrap_err();
        assert!(matches!(err, TrackError::Encoding(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn writes_animation_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim").join("out.gif");
        GifSequenceEncoder::default()
            .write_animation(&seq(2), &path)
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }
}
