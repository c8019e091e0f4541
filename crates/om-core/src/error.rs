use std::fmt;

/// Failures of grid construction and access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer length does not match the grid dimensions.
    SizeMismatch { expected: usize, actual: usize },
    /// A pixel coordinate lies outside the grid.
    OutOfBounds,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::SizeMismatch { expected, actual } => {
                return write!(f, "grid holds {actual} samples, dimensions need {expected}");
            }
            Self::OutOfBounds => "pixel outside the grid",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}
