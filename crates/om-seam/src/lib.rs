//! Seam-line (cutline) computation for orthophoto mosaicking.
//!
//! Pipeline for one orthophoto:
//! 1. Optional downscale through a [`Resampler`](om_resample::Resampler).
//! 2. Edge mask of one band; [`CostGrid`] is 0 on edges, 1 elsewhere.
//! 3. [`SeamLayout`] places a regular network of candidate lines. Each
//!    orientation first writes its lines as barriers (9999), then routes its
//!    padded seams with [`route`]. Vertical runs before horizontal on the same
//!    grid, so horizontal seams see the vertical barriers.
//! 4. Seams are mapped to pixel centres in map units, simplified and
//!    [`polygonize`]d. An optional crop area keeps only faces it contains.
//! 5. The faces are unioned and the largest component is written as the
//!    cutline.
//!
//! Conditions that skip an image (missing input, raster too small, empty
//! crop, no polygons) are [`CutlineError::is_recoverable`]; the
//! [`run_cutline_stage`] wrapper reports them as warnings.

mod cost;
mod cutline;
mod error;
mod extract;
mod layout;
mod polygonize;
mod route;

pub use cost::{CostGrid, rasterize_line};
pub use cutline::{CutlineConfig, Cutline, MIN_SCALE, compute_cutline, run_cutline_stage};
pub use error::CutlineError;
pub use extract::{largest_component, select_regions};
pub use layout::{CandidateLine, Orientation, SeamLayout};
pub use polygonize::polygonize;
pub use route::{SeamPath, route, route_phase};
