use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::data::decode::{RawRow, RowDecoder};
use crate::data::validate::validate_row;
use crate::foundation::config::{Bounds, DecodeOptions};
use crate::foundation::core::{Position, TARGET_SLOTS};
use crate::foundation::error::{TrackError, TrackResult};

/// One target's state at one time sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub position: Position,
    pub detected: bool,
}

/// Per-target time series, index-aligned across all slots.
///
/// Rows are appended to every slot at once, so all sequences always have the same length and
/// index `i` refers to the same input row in each of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    targets: [Vec<Sample>; TARGET_SLOTS],
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: &RawRow) {
        for (series, target) in self.targets.iter_mut().zip(row.targets.iter()) {
            series.push(Sample {
                time: row.time,
                position: target.position,
                detected: target.detected,
            });
        }
    }

    /// Number of samples per target.
    pub fn len(&self) -> usize {
        self.targets[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics if `slot >= TARGET_SLOTS`.
    pub fn target(&self, slot: usize) -> &[Sample] {
        &self.targets[slot]
    }

    pub fn targets(&self) -> impl Iterator<Item = &[Sample]> {
        self.targets.iter().map(Vec::as_slice)
    }

    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.targets[0].get(index).map(|s| s.time)
    }
}

/// Row accounting of one timeline load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub accepted: usize,
}

/// Validates decoded rows and appends the accepted ones to a [`Timeline`].
pub struct TimelineBuilder<'a> {
    bounds: &'a Bounds,
    timeline: Timeline,
    report: LoadReport,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(bounds: &'a Bounds) -> Self {
        Self {
            bounds,
            timeline: Timeline::new(),
            report: LoadReport::default(),
        }
    }

    /// Feed one decoder item. Row-level failures are logged and skipped; anything else is returned.
    pub fn accept(&mut self, row_index: usize, decoded: TrackResult<RawRow>) -> TrackResult<()> {
        let row = match decoded {
            Ok(row) => row,
            Err(e) if e.is_recoverable() => {
                warn!(row = row_index, "skipping row: {e}");
                self.report.rows_read += 1;
                self.report.malformed += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.report.rows_read += 1;

        if let Err(e) = validate_row(row_index, &row, self.bounds) {
            warn!(row = row_index, "rejecting row: {e}\n{row:#?}");
            self.report.rejected += 1;
            return Ok(());
        }

        self.timeline.push_row(&row);
        self.report.accepted += 1;
        Ok(())
    }

    pub fn finish(self) -> (Timeline, LoadReport) {
        (self.timeline, self.report)
    }
}

/// Decode, validate and demultiplex a trajectory log from any byte source.
pub fn build_timeline<R: Read>(
    reader: R,
    decode: &DecodeOptions,
    bounds: &Bounds,
) -> TrackResult<(Timeline, LoadReport)> {
    decode.validate()?;
    let mut builder = TimelineBuilder::new(bounds);
    for (row, decoded) in RowDecoder::new(reader, decode) {
        builder.accept(row, decoded)?;
    }
    Ok(builder.finish())
}

/// Open `path` and build its [`Timeline`].
#[tracing::instrument(skip(decode, bounds))]
pub fn load_timeline(
    path: &Path,
    decode: &DecodeOptions,
    bounds: &Bounds,
) -> TrackResult<(Timeline, LoadReport)> {
    let f = std::fs::File::open(path).map_err(|e| {
        TrackError::Io(std::io::Error::new(
            e.kind(),
            format!("open input '{}': {e}", path.display()),
        ))
    })?;
    let (timeline, report) = build_timeline(std::io::BufReader::new(f), decode, bounds)?;
    info!(
        malformed = report.malformed,
        rejected = report.rejected,
        "read {} rows",
        report.accepted
    );
    Ok((timeline, report))
}
