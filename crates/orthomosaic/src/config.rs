use std::fs;
use std::path::{Path, PathBuf};

use om_color::ColorSpace;
use om_io::IoError;
use om_seam::CutlineConfig;
use serde::{Deserialize, Serialize};

/// Histogram equalization mode applied before cutlines are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equalize {
    #[default]
    Rgb,
    Lch,
    /// Keep original pixels.
    None,
}

impl Equalize {
    pub fn color_space(self) -> Option<ColorSpace> {
        match self {
            Equalize::Rgb => Some(ColorSpace::Rgb),
            Equalize::Lch => Some(ColorSpace::Lch),
            Equalize::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Feathering distance in pixels.
    pub blend_distance: u32,
    pub equalize: Equalize,
    /// Downscale factor for cutline computation; overrides `cutline.scale`.
    pub cutline_scale: f64,
    /// Directory for cached stage outputs. Next to each input when unset.
    pub temp_dir: Option<PathBuf>,
    pub cutline: CutlineConfig,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            blend_distance: 30,
            equalize: Equalize::Rgb,
            cutline_scale: 0.25,
            temp_dir: None,
            cutline: CutlineConfig::default(),
        }
    }
}

impl MosaicConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| IoError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Cutline settings with the mosaic's scale applied.
    pub fn cutline_config(&self) -> CutlineConfig {
        CutlineConfig {
            scale: self.cutline_scale,
            ..self.cutline.clone()
        }
    }
}
