//! Raster downscaling for cutline computation on large orthophotos.
//!
//! [`Resampler`] is the collaborator seam: the cutline pipeline only needs one
//! band written at a new path, scaled by a factor in `(0, 1]`. The output is
//! a single-band raster holding the requested band. The built-in
//! [`AreaResampler`] averages every source pixel a destination pixel covers,
//! weighted by the covered fraction.
//!
//! Size policy:
//! - Output size per axis is `max(1, round(dim * scale))`.
//! - The georeferencing transform is rescaled so the raster keeps its map
//!   footprint.

mod area;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use area::{AreaResampler, area_downscale};

#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    #[error("scale factor {0} is outside (0, 1]")]
    InvalidScale(f64),
    #[error("cannot build resampling thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] om_io::IoError),
    #[error(transparent)]
    Core(#[from] om_core::Error),
}

/// Tuning hints forwarded to the resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleHints {
    /// Worker threads; `0` means all available cores.
    pub threads: usize,
    /// Fraction of memory the resampler may use for its block cache.
    pub cache_fraction: f64,
}

impl Default for ResampleHints {
    fn default() -> Self {
        Self {
            threads: 0,
            cache_fraction: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleRequest {
    pub scale: f64,
    /// Source band (1-based); written as band 1 of the output.
    pub band: usize,
    pub hints: ResampleHints,
}

impl ResampleRequest {
    pub fn new(scale: f64, band: usize, hints: ResampleHints) -> Self {
        Self { scale, band, hints }
    }
}

pub trait Resampler {
    /// Writes band `request.band` of `src`, scaled by `request.scale`, to
    /// `dst` as a single-band raster with georeferencing.
    fn resample(
        &self,
        src: &Path,
        dst: &Path,
        request: &ResampleRequest,
    ) -> Result<(), ResampleError>;
}
