//! Foundational primitives for orthophoto mosaicking.
//!
//! ## Grids
//! [`Image<T>`] is a tightly packed row-major grid used for raster bands,
//! edge masks and cost grids. [`ImageView`] is the borrowed form handed to
//! detectors.
//!
//! ## Georeferencing
//! [`GeoTransform`] follows the GDAL coefficient order. Pixel centres sit at
//! half-integer positions, so pixel `(0, 0)` maps to `apply(0.5, 0.5)`.
//!
//! ## Stage plumbing
//! [`Feedback`] is the explicit progress/cancellation context; [`paths`]
//! derives cache keys for stage outputs and owns scoped temporary files.

mod error;
mod feedback;
mod image;
pub mod paths;
mod transform;

pub use error::Error;
pub use feedback::{Feedback, Level, LogFeedback, MemoryFeedback, NoopFeedback};
pub use image::{Image, ImageView};
pub use paths::{RelatedPath, StageCache, TempArtifact, related_file_path};
pub use transform::GeoTransform;
