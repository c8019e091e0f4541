//! Edge masks for seam routing.
//!
//! Seams routed along real image discontinuities are less visible than seams
//! crossing flat regions, so the cost map marks detected edges as cheap. This
//! crate produces the boolean edge mask; coordinates follow the pixel-centre
//! convention of `om-core`.

pub mod canny;

pub use canny::{EdgeConfig, EdgeDetector, edge_mask};
