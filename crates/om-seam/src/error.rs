use std::path::PathBuf;

use om_io::IoError;
use om_resample::ResampleError;

#[derive(Debug, thiserror::Error)]
pub enum CutlineError {
    #[error("cannot compute cutline, {} is missing", .path.display())]
    MissingInput { path: PathBuf },
    #[error("cannot compute cutline, orthophoto is too small ({width}x{height}px)")]
    TooSmallRaster { width: usize, height: usize },
    #[error("crop area {} is empty, cannot compute cutline", .path.display())]
    EmptyCropArea { path: PathBuf },
    #[error("no polygons inside the crop area, cannot compute cutline")]
    NoPolygonsInCrop,
    #[error("no polygons formed, cannot compute cutline")]
    NoPolygonsFormed,
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    Core(#[from] om_core::Error),
}

impl CutlineError {
    /// True for conditions that skip this image's cutline with a warning.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CutlineError::MissingInput { .. }
                | CutlineError::TooSmallRaster { .. }
                | CutlineError::EmptyCropArea { .. }
                | CutlineError::NoPolygonsInCrop
                | CutlineError::NoPolygonsFormed
        )
    }
}
