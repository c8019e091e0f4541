//! Umbrella crate for the `orthomosaic` workspace.
//!
//! Re-exports the foundational and cutline crates and adds the multi-image
//! [`MosaicPipeline`], which drives external histogram-matching and
//! compositing collaborators around the cutline stage.

mod config;
mod pipeline;

pub use config::{Equalize, MosaicConfig};
pub use pipeline::{
    CollaboratorError, Compositor, HistogramMatcher, MergeInput, MosaicError, MosaicPipeline,
};

pub use om_color;
pub use om_core::*;
pub use om_edge;
pub use om_io;
pub use om_resample;
pub use om_seam::*;
