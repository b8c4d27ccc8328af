use std::io::Read;

use crate::foundation::config::DecodeOptions;
use crate::foundation::core::{Position, TARGET_SLOTS};
use crate::foundation::error::{TrackError, TrackResult};

/// `time` followed by `x, y, z, detected` for every target slot.
pub const FIELDS_PER_ROW: usize = 1 + 4 * TARGET_SLOTS;

/// One target slot of a decoded input row.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawTarget {
    pub position: Position,
    pub detected: bool,
}

/// One decoded input record, before bounds validation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawRow {
    pub time: f64,
    pub targets: [RawTarget; TARGET_SLOTS],
}

/// Rewrite every `from` byte to `.` in place.
pub fn normalize_decimal_separator(buf: &mut [u8], from: u8) {
    for b in buf.iter_mut() {
        if *b == from {
            *b = b'.';
        }
    }
}

/// Byte stream adapter that normalizes the decimal separator before tokenization.
#[derive(Debug)]
pub struct DecimalSeparatorReader<R> {
    inner: R,
    from: u8,
}

impl<R> DecimalSeparatorReader<R> {
    pub fn new(inner: R, from: u8) -> Self {
        Self { inner, from }
    }
}

impl<R: Read> Read for DecimalSeparatorReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        normalize_decimal_separator(&mut buf[..n], self.from);
        Ok(n)
    }
}

/// Iterator over decoded rows of a trajectory log.
///
/// Yields `(row_index, result)`. Row indices count data records (comments and blank lines are not
/// counted). A `MalformedRecord` error concerns only that row; an `Io` error is fatal and ends the
/// stream.
pub struct RowDecoder<R: Read> {
    records: csv::StringRecordsIntoIter<DecimalSeparatorReader<R>>,
    row: usize,
    done: bool,
}

impl<R: Read> RowDecoder<R> {
    pub fn new(reader: R, opts: &DecodeOptions) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(opts.delimiter)
            .comment(Some(opts.comment))
            .has_headers(false)
            .flexible(true)
            .from_reader(DecimalSeparatorReader::new(reader, opts.decimal_separator))
            .into_records();
        Self {
            records,
            row: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for RowDecoder<R> {
    type Item = (usize, TrackResult<RawRow>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rec = self.records.next()?;
        let row = self.row;
        self.row += 1;

        let res = match rec {
            Ok(record) => parse_record(row, &record),
            Err(e) if e.is_io_error() => {
                self.done = true;
                match e.into_kind() {
                    csv::ErrorKind::Io(io) => Err(TrackError::Io(io)),
                    kind => Err(TrackError::Other(anyhow::anyhow!(
                        "csv reader failed: {kind:?}"
                    ))),
                }
            }
            Err(e) => Err(TrackError::malformed(row, e.to_string())),
        };
        Some((row, res))
    }
}

/// Decode one tokenized record into a [`RawRow`].
pub fn parse_record(row: usize, record: &csv::StringRecord) -> TrackResult<RawRow> {
    let n = record.len();
    let trailing_empty = n == FIELDS_PER_ROW + 1 && record[FIELDS_PER_ROW].trim().is_empty();
    if n != FIELDS_PER_ROW && !trailing_empty {
        return Err(TrackError::malformed(
            row,
            format!("expected {FIELDS_PER_ROW} fields, got {n}"),
        ));
    }

    let time = parse_f64(row, "time", &record[0])?;
    let mut targets = [RawTarget::default(); TARGET_SLOTS];
    for (slot, target) in targets.iter_mut().enumerate() {
        let base = 1 + slot * 4;
        let id = slot + 1;
        let x = parse_f64(row, &format!("x{id}"), &record[base])?;
        let y = parse_f64(row, &format!("y{id}"), &record[base + 1])?;
        let z = parse_f64(row, &format!("z{id}"), &record[base + 2])?;
        let detected = parse_bool(row, &format!("d{id}"), &record[base + 3])?;
        *target = RawTarget {
            position: Position::new(x, y, z),
            detected,
        };
    }
    Ok(RawRow { time, targets })
}

fn parse_f64(row: usize, field: &str, raw: &str) -> TrackResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| TrackError::malformed(row, format!("field {field}: {e} ({raw:?})")))
}

fn parse_bool(row: usize, field: &str, raw: &str) -> TrackResult<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(TrackError::malformed(
            row,
            format!("field {field}: invalid boolean {other:?}"),
        )),
    }
}
