use crate::foundation::core::Axis;

pub type TrackResult<T> = Result<T, TrackError>;

#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    #[error("malformed record at row {row}: {message}")]
    MalformedRecord { row: usize, message: String },

    #[error("row {row} out of bounds: target {slot} {axis} = {value}")]
    OutOfBounds {
        row: usize,
        slot: usize,
        axis: Axis,
        value: f64,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackError {
    pub fn malformed(row: usize, msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
            row,
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Row-level errors are skipped by the loader; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. } | Self::OutOfBounds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            TrackError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            TrackError::encoding("x")
                .to_string()
                .contains("encoding error:")
        );
        assert!(
            TrackError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            TrackError::malformed(7, "bad float")
                .to_string()
                .contains("row 7")
        );
    }

    #[test]
    fn only_row_errors_are_recoverable() {
        assert!(TrackError::malformed(0, "x").is_recoverable());
        assert!(
            TrackError::OutOfBounds {
                row: 1,
                slot: 2,
                axis: Axis::Z,
                value: 9000.0,
            }
            .is_recoverable()
        );
        assert!(!TrackError::render("x").is_recoverable());
        assert!(
            !TrackError::InsufficientData {
                required: 50,
                available: 3,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = TrackError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
