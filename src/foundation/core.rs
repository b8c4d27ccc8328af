use crate::foundation::error::{TrackError, TrackResult};

/// Number of target slots recorded per input row.
pub const TARGET_SLOTS: usize = 6;

/// Spatial axis of a tracked position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A 3D position in detector coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Closed interval `[min, max]` on one axis.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    pub fn contains(self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    pub fn span(self) -> f64 {
        self.max - self.min
    }

    pub fn validate(self, what: &str) -> TrackResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(TrackError::validation(format!(
                "{what} range must be finite with min < max (got [{}, {}])",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Half-open frame range `[beg, end)` over timeline sample indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    /// Inclusive range start.
    pub beg: usize,
    /// Exclusive range end.
    pub end: usize,
}

impl FrameRange {
    /// Create a validated range with `beg <= end`.
    pub fn new(beg: usize, end: usize) -> TrackResult<Self> {
        if beg > end {
            return Err(TrackError::validation(format!(
                "frame range start must be <= end (got [{beg}, {end}))"
            )));
        }
        Ok(Self { beg, end })
    }

    pub fn len_frames(self) -> usize {
        self.end.saturating_sub(self.beg)
    }

    pub fn is_empty(self) -> bool {
        self.beg >= self.end
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            beg: 450,
            end: 1600,
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// 20 cm at 96 dpi.
    pub const DEFAULT_SIDE_PX: u32 = 756;

    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::square(Self::DEFAULT_SIDE_PX)
    }
}

/// A rendered frame as straight-alpha RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write the frame as a PNG file.
    pub fn save_png(&self, path: &std::path::Path) -> TrackResult<()> {
        use anyhow::Context as _;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_rejects_inverted_bounds() {
        assert!(FrameRange::new(5, 4).is_err());
        let r = FrameRange::new(3, 3).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.len_frames(), 0);
        assert_eq!(FrameRange::new(450, 1600).unwrap().len_frames(), 1150);
    }

    #[test]
    fn axis_range_contains_is_inclusive_and_rejects_nan() {
        let r = AxisRange::new(-800.0, 800.0);
        assert!(r.contains(-800.0));
        assert!(r.contains(800.0));
        assert!(!r.contains(800.5));
        assert!(!r.contains(f64::NAN));
        assert!(AxisRange::new(1.0, 1.0).validate("x").is_err());
        assert!(AxisRange::new(0.0, f64::INFINITY).validate("x").is_err());
    }

    #[test]
    fn position_projects_by_axis() {
        let p = Position::new(1.0, 2.0, 3.0);
        let got: Vec<f64> = Axis::ALL.iter().map(|a| p.get(*a)).collect();
        assert_eq!(got, vec![1.0, 2.0, 3.0]);
    }
}
