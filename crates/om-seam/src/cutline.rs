//! Per-orthophoto cutline computation.

use std::fs;
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, Polygon, Simplify};
use om_core::{Feedback, GeoTransform, RelatedPath, TempArtifact, related_file_path};
use om_edge::{EdgeConfig, EdgeDetector};
use om_io::IoError;
use om_resample::{ResampleHints, ResampleRequest, Resampler};
use serde::{Deserialize, Serialize};

use crate::CutlineError;
use crate::cost::CostGrid;
use crate::extract::{largest_component, select_regions};
use crate::layout::{Orientation, SeamLayout};
use crate::polygonize::polygonize;
use crate::route::route_phase;

/// Smallest accepted downscale factor.
pub const MIN_SCALE: f64 = 0.0001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutlineConfig {
    /// Downscale factor applied before routing, clamped to `[MIN_SCALE, 1]`.
    pub scale: f64,
    /// 1-based band the edges are detected on.
    pub band: usize,
    /// Douglas-Peucker tolerance for seams, in map units.
    pub simplify_tolerance: f64,
    pub min_divisions: usize,
    /// Raster pixels per division beyond `min_divisions`.
    pub cell_pixels: usize,
    pub edge: EdgeConfig,
    pub resample: ResampleHints,
    /// Writes the final cost grid as a grayscale image when set.
    pub debug_cost_path: Option<PathBuf>,
}

impl Default for CutlineConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            band: 1,
            simplify_tolerance: 0.05,
            min_divisions: 8,
            cell_pixels: 256,
            edge: EdgeConfig::default(),
            resample: ResampleHints::default(),
            debug_cost_path: None,
        }
    }
}

impl CutlineConfig {
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
}

/// Selected cutline as written to disk.
#[derive(Debug, Clone)]
pub struct Cutline {
    pub polygon: Polygon<f64>,
    pub area: f64,
    pub crs: Option<String>,
    pub path: PathBuf,
}

/// Computes the cutline of `input` and writes it to `destination`.
///
/// A downscaled copy is made next to the input when `cfg.scale < 1` and is
/// removed again on every exit path.
pub fn compute_cutline(
    input: &Path,
    destination: &Path,
    cfg: &CutlineConfig,
    crop: Option<&Path>,
    resampler: &dyn Resampler,
    feedback: &dyn Feedback,
) -> Result<Cutline, CutlineError> {
    for path in std::iter::once(input).chain(crop) {
        if !path.is_file() {
            return Err(CutlineError::MissingInput {
                path: path.to_path_buf(),
            });
        }
    }
    feedback.info(&format!(
        "Computing cutline for {} --> {}",
        input.display(),
        destination.display()
    ));

    let scale = cfg.scale.clamp(MIN_SCALE, 1.0);
    let mut scaled: Option<TempArtifact> = None;
    let (source, band_index) = if scale < 1.0 {
        feedback.info(&format!(
            "Scaling orthophoto {}% to compute cutline",
            scale * 100.0
        ));
        let path = related_file_path(input, &RelatedPath::postfix(".scaled").with_ext(".png"));
        let guard = scaled.insert(
            TempArtifact::new(&path).with_companion(om_io::sidecar_path(&path)),
        );
        let request = ResampleRequest::new(scale, cfg.band, cfg.resample.clone());
        resampler.resample(input, guard.path(), &request)?;
        // The scaled copy holds only the requested band.
        (path, 1)
    } else {
        (input.to_path_buf(), cfg.band)
    };

    let band = om_io::read_band(&source, band_index)?;
    let layout = SeamLayout::new(
        band.width(),
        band.height(),
        cfg.min_divisions,
        cfg.cell_pixels,
    )?;

    let crop_area = match crop {
        Some(path) => {
            let area = om_io::read_crop_area(path)?;
            if area.is_empty() {
                return Err(CutlineError::EmptyCropArea {
                    path: path.to_path_buf(),
                });
            }
            Some(area)
        }
        None => None,
    };

    let edges = EdgeDetector::new().detect(&band.image.as_view(), &cfg.edge);
    let mut grid = CostGrid::from_edges(&edges);
    log::debug!(
        "{}x{} raster, {} divisions, {} edge cells",
        band.width(),
        band.height(),
        layout.divisions(),
        grid.count(CostGrid::EDGE)
    );

    let mut seams = Vec::new();
    for orientation in Orientation::ALL {
        feedback.info(&format!("Computing {orientation} cutlines"));
        for path in route_phase(&mut grid, &layout, orientation)? {
            let line = to_geographic(&path.pixels, &band.transform);
            seams.push(line.simplify(&cfg.simplify_tolerance));
        }
    }

    if let Some(path) = &cfg.debug_cost_path {
        om_io::write_band_f32(grid.as_image(), path)?;
        log::debug!("wrote cost grid to {}", path.display());
    }

    feedback.info("Generating polygons... this could take a bit.");
    let regions = select_regions(polygonize(&seams), crop_area.as_ref())?;

    feedback.info("Merging polygons");
    let (polygon, area) = largest_component(&regions).ok_or(CutlineError::NoPolygonsFormed)?;
    feedback.info(&format!("Largest cutline found: {area} m^2"));

    om_io::write_cutline(destination, &polygon, band.crs.as_deref())?;
    feedback.info(&format!("Wrote {}", destination.display()));

    Ok(Cutline {
        polygon,
        area,
        crs: band.crs,
        path: destination.to_path_buf(),
    })
}

/// Stage wrapper: recoverable conditions become a warning and `None`, other
/// failures are reported as errors. Never aborts the caller.
pub fn run_cutline_stage(
    input: &Path,
    destination: &Path,
    cfg: &CutlineConfig,
    crop: Option<&Path>,
    resampler: &dyn Resampler,
    feedback: &dyn Feedback,
) -> Option<Cutline> {
    match compute_cutline(input, destination, cfg, crop, resampler, feedback) {
        Ok(cutline) => Some(cutline),
        Err(e) if e.is_recoverable() => {
            feedback.warning(&e.to_string());
            None
        }
        Err(e) => {
            feedback.error(&format!("Cutline computation failed: {e}"));
            None
        }
    }
}

/// Pixel path to map coordinates at pixel centres.
fn to_geographic(pixels: &[(usize, usize)], transform: &GeoTransform) -> LineString<f64> {
    pixels
        .iter()
        .map(|&(col, row)| transform.pixel_center(col, row))
        .collect::<Vec<Coord<f64>>>()
        .into()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use geo::{Area, Contains};
    use om_core::{GeoTransform, Image, Level, MemoryFeedback, NoopFeedback};
    use om_io::RasterMetadata;
    use om_resample::AreaResampler;

    use super::{CutlineConfig, compute_cutline, run_cutline_stage};
    use crate::CutlineError;

    fn write_raster(path: &Path, img: &Image<f32>, transform: GeoTransform) {
        let meta = RasterMetadata {
            transform,
            crs: Some("EPSG:32633".into()),
            nodata: None,
        };
        om_io::write_band_unit(img, &meta, path).expect("write raster");
    }

    #[test]
    fn uniform_raster_yields_inner_grid_square() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ortho.png");
        let output = dir.path().join("ortho.cutline.geojson");
        write_raster(&input, &Image::new_fill(64, 64, 0.5), GeoTransform::IDENTITY);

        let cutline = compute_cutline(
            &input,
            &output,
            &CutlineConfig::default(),
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .expect("cutline");

        // Seams run through pixel centres 4.5, 12.5, ..., 60.5 on both axes.
        assert!((cutline.area - 56.0 * 56.0).abs() < 1e-6, "{}", cutline.area);
        assert_eq!(cutline.crs.as_deref(), Some("EPSG:32633"));

        let layer = om_io::read_polygon_layer(&output).expect("read back");
        assert_eq!(layer.features.len(), 1);
        assert_eq!(layer.crs.as_deref(), Some("EPSG:32633"));
        assert!((layer.features[0].unsigned_area() - cutline.area).abs() < 1e-6);
    }

    #[test]
    fn cutline_stays_inside_crop_area() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ortho.png");
        let crop = dir.path().join("crop.geojson");
        let output = dir.path().join("out").join("cutline.geojson");

        let transform = GeoTransform::north_up(1000.0, 2000.0, 0.5);
        write_raster(&input, &Image::new_fill(64, 64, 0.5), transform);
        // Left half of the raster footprint.
        fs::write(
            &crop,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
                "geometry":{"type":"Polygon","coordinates":[[[1000,1968],[1016,1968],[1016,2000],[1000,2000],[1000,1968]]]}}]}"#,
        )
        .expect("write crop");

        let cutline = compute_cutline(
            &input,
            &output,
            &CutlineConfig::default(),
            Some(&crop),
            &AreaResampler,
            &NoopFeedback,
        )
        .expect("cutline");

        let area = om_io::read_crop_area(&crop).expect("crop");
        assert!(area.contains(&cutline.polygon));
        // Three cell columns by seven cell rows of 4 x 4 map units.
        assert!((cutline.area - 3.0 * 7.0 * 16.0).abs() < 1e-6, "{}", cutline.area);
    }

    #[test]
    fn sixteen_pixel_raster_is_too_small() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("tiny.png");
        write_raster(&input, &Image::new_fill(16, 16, 0.5), GeoTransform::IDENTITY);

        let err = compute_cutline(
            &input,
            &dir.path().join("tiny.geojson"),
            &CutlineConfig::default(),
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .unwrap_err();
        assert!(matches!(err, CutlineError::TooSmallRaster { width: 16, height: 16 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_inputs_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ortho.png");
        let output = dir.path().join("cutline.geojson");

        let err = compute_cutline(
            &input,
            &output,
            &CutlineConfig::default(),
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .unwrap_err();
        assert!(matches!(err, CutlineError::MissingInput { .. }));

        write_raster(&input, &Image::new_fill(64, 64, 0.5), GeoTransform::IDENTITY);
        let crop = dir.path().join("nope.geojson");
        let err = compute_cutline(
            &input,
            &output,
            &CutlineConfig::default(),
            Some(&crop),
            &AreaResampler,
            &NoopFeedback,
        )
        .unwrap_err();
        assert!(matches!(err, CutlineError::MissingInput { path } if path == crop));
        assert!(!output.exists());
    }

    #[test]
    fn empty_crop_area_aborts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ortho.png");
        let crop = dir.path().join("crop.geojson");
        write_raster(&input, &Image::new_fill(64, 64, 0.5), GeoTransform::IDENTITY);
        fs::write(&crop, r#"{"type":"FeatureCollection","features":[]}"#).expect("write");

        let err = compute_cutline(
            &input,
            &dir.path().join("c.geojson"),
            &CutlineConfig::default(),
            Some(&crop),
            &AreaResampler,
            &NoopFeedback,
        )
        .unwrap_err();
        assert!(matches!(err, CutlineError::EmptyCropArea { .. }));
    }

    /// Blobs and ripples, so seams bend along slanted edges.
    fn textured(size: usize) -> Image<f32> {
        let mut img = Image::new_fill(size, size, 0.0f32);
        let blobs = [(40.0, 60.0, 18.0), (130.0, 90.0, 30.0), (200.0, 190.0, 24.0)];
        for y in 0..size {
            for (x, v) in img.row_mut(y).iter_mut().enumerate() {
                let (fx, fy) = (x as f32, y as f32);
                let ripple = 0.25 * (fx / 9.0 + fy / 23.0).sin() * (fy / 13.0).cos();
                let inside = blobs
                    .iter()
                    .any(|&(cx, cy, r)| (fx - cx).hypot(fy - cy) < r);
                *v = 0.4 + ripple + if inside { 0.3 } else { 0.0 };
            }
        }
        img
    }

    #[test]
    fn textured_raster_far_from_origin_has_no_holes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("field.png");
        let output = dir.path().join("field.cutline.geojson");
        let transform = GeoTransform::north_up(500_000.0, 4_000_000.0, 0.1);
        write_raster(&input, &textured(256), transform);

        let cutline = compute_cutline(
            &input,
            &output,
            &CutlineConfig::default(),
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .expect("cutline");

        assert!(cutline.area > 0.0);
        assert!(
            cutline.polygon.interiors().is_empty(),
            "{} interior rings",
            cutline.polygon.interiors().len()
        );
        let layer = om_io::read_polygon_layer(&output).expect("read back");
        assert!(layer.features[0].0[0].interiors().is_empty());
    }

    #[test]
    fn downscaling_keeps_the_configured_band() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("rgb.png");
        let mut rgb = image::RgbImage::new(128, 128);
        for px in rgb.pixels_mut() {
            *px = image::Rgb([40, 160, 220]);
        }
        rgb.save(&input).expect("save");

        for scale in [1.0, 0.5] {
            let cfg = CutlineConfig {
                band: 2,
                scale,
                ..CutlineConfig::default()
            };
            let cutline = compute_cutline(
                &input,
                &dir.path().join(format!("rgb.{scale}.geojson")),
                &cfg,
                None,
                &AreaResampler,
                &NoopFeedback,
            )
            .expect("cutline");
            // Identity transform: seams sit at the same map positions either way.
            assert!((cutline.area - 112.0 * 112.0).abs() < 1e-6, "{scale}: {}", cutline.area);
        }
        assert!(!dir.path().join("rgb.scaled.png").exists());
    }

    #[test]
    fn scaled_copy_is_removed_on_success_and_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("ortho.png");
        let scaled = dir.path().join("ortho.scaled.png");
        write_raster(&input, &Image::new_fill(128, 128, 0.5), GeoTransform::IDENTITY);

        let cfg = CutlineConfig {
            scale: 0.5,
            ..CutlineConfig::default()
        };
        let cutline = compute_cutline(
            &input,
            &dir.path().join("ok.geojson"),
            &cfg,
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .expect("cutline");
        // Same footprint as the full-resolution grid: seams at 2x pixel size.
        assert!((cutline.area - 112.0 * 112.0).abs() < 1e-6, "{}", cutline.area);
        assert!(!scaled.exists());

        // At 1/8 scale the 16 px copy is too small; it must still be removed.
        let cfg = CutlineConfig {
            scale: 0.125,
            ..CutlineConfig::default()
        };
        let err = compute_cutline(
            &input,
            &dir.path().join("fail.geojson"),
            &cfg,
            None,
            &AreaResampler,
            &NoopFeedback,
        )
        .unwrap_err();
        assert!(matches!(err, CutlineError::TooSmallRaster { .. }));
        assert!(!scaled.exists());
        assert!(!om_io::sidecar_path(&scaled).exists());
    }

    #[test]
    fn stage_wrapper_warns_instead_of_failing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let feedback = MemoryFeedback::new();
        let out = run_cutline_stage(
            &dir.path().join("absent.png"),
            &dir.path().join("absent.geojson"),
            &CutlineConfig::default(),
            None,
            &AreaResampler,
            &feedback,
        );
        assert!(out.is_none());
        assert_eq!(feedback.count(Level::Warning), 1);
        assert_eq!(feedback.count(Level::Error), 0);
    }

    #[test]
    fn config_loads_partial_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cutline.json");
        fs::write(&path, r#"{"scale": 0.25, "edge": {"smooth_passes": 1}}"#).expect("write");

        let cfg = CutlineConfig::from_json_file(&path).expect("config");
        assert_eq!(cfg.scale, 0.25);
        assert_eq!(cfg.edge.smooth_passes, 1);
        assert_eq!(cfg.min_divisions, 8);
        assert_eq!(cfg.simplify_tolerance, 0.05);
    }
}
