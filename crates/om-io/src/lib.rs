//! Read/write contracts the cutline core needs from raster and vector stores.
//!
//! Rasters are decoded with the `image` crate; their georeferencing lives in
//! a JSON sidecar named `<stem>.georef.json` next to the pixels. Vector data
//! is GeoJSON with a `name`-style `crs` member.

pub mod raster;
pub mod vector;

use std::path::PathBuf;

pub use raster::{
    RasterBand, RasterMetadata, read_band, read_metadata, sidecar_path, write_band_f32,
    write_band_unit, write_metadata,
};
pub use vector::{CropArea, PolygonLayer, read_crop_area, read_polygon_layer, write_cutline};

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode or encode raster {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} has {count} band(s), band {band} requested")]
    BandOutOfRange {
        path: PathBuf,
        band: usize,
        count: usize,
    },
    #[error("invalid GeoJSON in {path}: {reason}")]
    InvalidGeoJson { path: PathBuf, reason: String },
    #[error(transparent)]
    Core(#[from] om_core::Error),
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub(crate) fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    Ok(())
}
