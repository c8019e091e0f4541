//! Raster store.
//!
//! - `read_band`: decode one band (1-based) as `f32` in `[0, 1]` together with
//!   its georeferencing.
//! - `write_band_unit`: write a `[0, 1]` band as 16-bit grayscale plus sidecar.
//! - `write_band_f32`: debug export of an arbitrary float band, normalised over
//!   its finite range.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use om_core::{GeoTransform, Image, RelatedPath, related_file_path};
use serde::{Deserialize, Serialize};

use crate::{IoError, Result, ensure_parent_dir};

/// Georeferencing stored next to a raster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterMetadata {
    pub transform: GeoTransform,
    pub crs: Option<String>,
    pub nodata: Option<f64>,
}

/// One band of a georeferenced raster, loaded once per invocation.
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub image: Image<f32>,
    pub transform: GeoTransform,
    pub crs: Option<String>,
    pub nodata: Option<f64>,
}

impl RasterBand {
    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    pub fn metadata(&self) -> RasterMetadata {
        RasterMetadata {
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }
}

pub fn sidecar_path(raster: &Path) -> PathBuf {
    related_file_path(raster, &RelatedPath::default().with_ext(".georef.json"))
}

/// Missing sidecar means pixel units and no CRS.
pub fn read_metadata(raster: &Path) -> Result<RasterMetadata> {
    let path = sidecar_path(raster);
    if !path.is_file() {
        log::debug!(
            "no georeferencing sidecar for {}, using pixel units",
            raster.display()
        );
        return Ok(RasterMetadata::default());
    }
    let data = fs::read_to_string(&path).map_err(|e| IoError::io(&path, e))?;
    serde_json::from_str(&data).map_err(|source| IoError::Json { path, source })
}

pub fn write_metadata(raster: &Path, meta: &RasterMetadata) -> Result<()> {
    let path = sidecar_path(raster);
    ensure_parent_dir(&path)?;
    let json = serde_json::to_string_pretty(meta).map_err(|source| IoError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|e| IoError::io(&path, e))
}

/// Reads band `band` (1-based) of the raster at `path`.
pub fn read_band(path: &Path, band: usize) -> Result<RasterBand> {
    let img = image::open(path).map_err(|source| IoError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    let color = img.color();
    let count = usize::from(color.channel_count());
    // Gray images expand to RGBA as (g, g, g, a).
    let channel = match (color.has_color(), band) {
        (_, 0) => None,
        (true, b) if b <= count => Some(b - 1),
        (false, 1) => Some(0),
        (false, 2) if color.has_alpha() => Some(3),
        _ => None,
    }
    .ok_or_else(|| IoError::BandOutOfRange {
        path: path.to_path_buf(),
        band,
        count,
    })?;

    let rgba = img.to_rgba32f();
    let (w, h) = (rgba.width() as usize, rgba.height() as usize);
    let data: Vec<f32> = rgba.as_raw().chunks_exact(4).map(|px| px[channel]).collect();
    let image = Image::from_vec(w, h, data)?;

    let meta = read_metadata(path)?;
    Ok(RasterBand {
        image,
        transform: meta.transform,
        crs: meta.crs,
        nodata: meta.nodata,
    })
}

/// Writes a band with values in `[0, 1]` as 16-bit grayscale, with sidecar.
pub fn write_band_unit(image: &Image<f32>, meta: &RasterMetadata, path: &Path) -> Result<()> {
    let data = image
        .data()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16)
        .collect();
    save_luma16(image.width(), image.height(), data, path)?;
    write_metadata(path, meta)
}

/// Debug export of an arbitrary float band (e.g. a cost grid).
///
/// Values are stretched linearly from the finite minimum to the finite maximum;
/// non-finite samples are written as 0.
pub fn write_band_f32(image: &Image<f32>, path: &Path) -> Result<()> {
    let (lo, hi) = image
        .data()
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };

    let data = image
        .data()
        .iter()
        .map(|&v| {
            if v.is_finite() {
                (((v - lo) / span) * f32::from(u16::MAX)).round() as u16
            } else {
                0
            }
        })
        .collect();
    save_luma16(image.width(), image.height(), data, path)
}

fn save_luma16(width: usize, height: usize, data: Vec<u16>, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(width as u32, height as u32, data).ok_or(
            om_core::Error::SizeMismatch {
                expected: width * height,
                actual: 0,
            },
        )?;
    buf.save(path).map_err(|source| IoError::Image {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use om_core::{GeoTransform, Image};

    use super::{
        RasterMetadata, read_band, read_metadata, sidecar_path, write_band_f32, write_band_unit,
        write_metadata,
    };
    use crate::IoError;

    #[test]
    fn sidecar_sits_next_to_raster() {
        let p = sidecar_path(std::path::Path::new("/data/ortho.scaled.png"));
        assert_eq!(p, std::path::PathBuf::from("/data/ortho.scaled.georef.json"));
    }

    #[test]
    fn first_band_of_rgb_is_red_channel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgb.png");
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(1, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 1, Rgb([0, 255, 0]));
        img.save(&path).expect("save");

        let band = read_band(&path, 1).expect("band 1");
        assert_eq!((band.width(), band.height()), (3, 2));
        assert_eq!(band.image.get(1, 0), Some(&1.0));
        assert_eq!(band.image.get(2, 1), Some(&0.0));
        assert_eq!(band.transform, GeoTransform::IDENTITY);
        assert!(band.crs.is_none());

        let green = read_band(&path, 2).expect("band 2");
        assert_eq!(green.image.get(2, 1), Some(&1.0));

        assert!(matches!(
            read_band(&path, 4),
            Err(IoError::BandOutOfRange { band: 4, count: 3, .. })
        ));
    }

    #[test]
    fn unit_band_round_trips_with_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("band.png");
        let data: Vec<f32> = (0..12).map(|i| i as f32 / 11.0).collect();
        let img = Image::from_vec(4, 3, data).expect("valid image");
        let meta = RasterMetadata {
            transform: GeoTransform::north_up(1000.0, 2000.0, 0.25),
            crs: Some("EPSG:32633".into()),
            nodata: Some(0.0),
        };

        write_band_unit(&img, &meta, &path).expect("write");
        let band = read_band(&path, 1).expect("read");
        assert_eq!(band.metadata(), meta);
        for (a, b) in img.data().iter().zip(band.image.data()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn metadata_defaults_when_sidecar_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raster = dir.path().join("a.tif");
        assert_eq!(read_metadata(&raster).expect("default"), RasterMetadata::default());

        let meta = RasterMetadata {
            transform: GeoTransform::north_up(0.0, 10.0, 2.0),
            crs: None,
            nodata: None,
        };
        write_metadata(&raster, &meta).expect("write");
        assert_eq!(read_metadata(&raster).expect("read"), meta);
    }

    #[test]
    fn debug_export_stretches_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("cost.png");
        let img = Image::from_vec(3, 1, vec![0.0f32, 1.0, 9999.0]).expect("valid image");
        write_band_f32(&img, &path).expect("write");

        let back = image::open(&path).expect("open").into_luma16();
        assert_eq!(back.get_pixel(0, 0).0[0], 0);
        assert_eq!(back.get_pixel(2, 0).0[0], u16::MAX);
    }
}
