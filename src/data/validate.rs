use crate::data::decode::RawRow;
use crate::foundation::config::Bounds;
use crate::foundation::core::Axis;
use crate::foundation::error::{TrackError, TrackResult};

/// Check that every target of `row` lies inside `bounds`.
///
/// The first offending coordinate is reported; a single bad slot invalidates the whole row.
pub fn validate_row(row_index: usize, row: &RawRow, bounds: &Bounds) -> TrackResult<()> {
    for (slot, target) in row.targets.iter().enumerate() {
        for axis in Axis::ALL {
            let value = target.position.get(axis);
            if !bounds.range(axis).contains(value) {
                return Err(TrackError::OutOfBounds {
                    row: row_index,
                    slot,
                    axis,
                    value,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decode::RawTarget;
    use crate::foundation::core::Position;

    fn row_at(p: Position) -> RawRow {
        RawRow {
            time: 0.0,
            targets: [RawTarget {
                position: p,
                detected: true,
            }; 6],
        }
    }

    #[test]
    fn accepts_points_on_the_boundary() {
        let b = Bounds::default();
        validate_row(0, &row_at(Position::new(-800.0, 800.0, 2400.0)), &b).unwrap();
        validate_row(0, &row_at(Position::new(0.0, 0.0, 5000.0)), &b).unwrap();
    }

    #[test]
    fn one_bad_slot_rejects_the_row() {
        let mut row = row_at(Position::new(0.0, 0.0, 3000.0));
        row.targets[4].position.z = 5000.5;
        let err = validate_row(9, &row, &Bounds::default()).unwrap_err();
        match err {
            TrackError::OutOfBounds {
                row,
                slot,
                axis,
                value,
            } => {
                assert_eq!(row, 9);
                assert_eq!(slot, 4);
                assert_eq!(axis, Axis::Z);
                assert_eq!(value, 5000.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_is_out_of_bounds() {
        let mut row = row_at(Position::new(0.0, 0.0, 3000.0));
        row.targets[0].position.x = f64::NAN;
        assert!(validate_row(0, &row, &Bounds::default()).is_err());
    }
}
