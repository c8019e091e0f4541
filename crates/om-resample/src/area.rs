use std::path::Path;

use om_core::Image;
use om_io::RasterMetadata;
use rayon::prelude::*;

use crate::{ResampleError, ResampleRequest, Resampler};

/// Box-filter downscaler over one band of the source raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaResampler;

impl Resampler for AreaResampler {
    fn resample(
        &self,
        src: &Path,
        dst: &Path,
        request: &ResampleRequest,
    ) -> Result<(), ResampleError> {
        let scale = request.scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(ResampleError::InvalidScale(scale));
        }

        let band = om_io::read_band(src, request.band)?;
        let (dst_w, dst_h) = target_dims(band.width(), band.height(), scale);
        log::debug!(
            "resampling band {} of {} {}x{} -> {}x{} (threads {}, cache fraction {})",
            request.band,
            src.display(),
            band.width(),
            band.height(),
            dst_w,
            dst_h,
            request.hints.threads,
            request.hints.cache_fraction
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(request.hints.threads)
            .build()?;
        let out = pool.install(|| area_downscale(&band.image, dst_w, dst_h))?;

        let fx = band.width() as f64 / dst_w as f64;
        let fy = band.height() as f64 / dst_h as f64;
        let meta = RasterMetadata {
            transform: band.transform.rescaled(fx, fy),
            crs: band.crs,
            nodata: band.nodata,
        };
        om_io::write_band_unit(&out, &meta, dst)?;
        Ok(())
    }
}

fn target_dims(w: usize, h: usize, scale: f64) -> (usize, usize) {
    let dim = |d: usize| ((d as f64 * scale).round() as usize).max(1);
    (dim(w), dim(h))
}

/// Source taps `(index, weight)` for each destination index along one axis.
/// Weights of one destination sample sum to 1.
fn axis_taps(src_n: usize, dst_n: usize) -> Vec<Vec<(usize, f32)>> {
    let ratio = src_n as f64 / dst_n as f64;
    (0..dst_n)
        .map(|i| {
            let start = i as f64 * ratio;
            let end = ((i + 1) as f64 * ratio).min(src_n as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_n);
            (first..last)
                .filter_map(|j| {
                    let overlap = end.min((j + 1) as f64) - start.max(j as f64);
                    (overlap > 0.0).then_some((j, (overlap / ratio) as f32))
                })
                .collect()
        })
        .collect()
}

/// Area-average resize of `src` to `dst_w` x `dst_h`.
///
/// Rows are processed in parallel on the current rayon pool. Upscaling is
/// accepted and degenerates to nearest-neighbour replication.
pub fn area_downscale(
    src: &Image<f32>,
    dst_w: usize,
    dst_h: usize,
) -> Result<Image<f32>, om_core::Error> {
    let (src_w, src_h) = (src.width(), src.height());
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Image::from_vec(dst_w, dst_h, vec![0.0; dst_w * dst_h]);
    }

    let x_taps = axis_taps(src_w, dst_w);
    let y_taps = axis_taps(src_h, dst_h);

    let mut tmp = vec![0.0f32; dst_w * src_h];
    tmp.par_chunks_mut(dst_w).enumerate().for_each(|(y, out)| {
        let row = src.row(y);
        for (o, taps) in out.iter_mut().zip(&x_taps) {
            *o = taps.iter().map(|&(x, wt)| row[x] * wt).sum();
        }
    });

    let mut dst = vec![0.0f32; dst_w * dst_h];
    dst.par_chunks_mut(dst_w)
        .zip(y_taps.par_iter())
        .for_each(|(out, taps)| {
            for &(y, wt) in taps {
                let row = &tmp[y * dst_w..(y + 1) * dst_w];
                for (o, &v) in out.iter_mut().zip(row) {
                    *o += v * wt;
                }
            }
        });

    Image::from_vec(dst_w, dst_h, dst)
}

#[cfg(test)]
mod tests {
    use om_core::{GeoTransform, Image};
    use om_io::RasterMetadata;

    use super::{AreaResampler, area_downscale, axis_taps, target_dims};
    use crate::{ResampleError, ResampleHints, ResampleRequest, Resampler};

    #[test]
    fn taps_cover_each_source_pixel_once() {
        let taps = axis_taps(10, 4);
        assert_eq!(taps.len(), 4);
        for t in &taps {
            let sum: f32 = t.iter().map(|&(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }

        let mut coverage = [0.0f32; 10];
        for t in &taps {
            for &(j, w) in t {
                coverage[j] += w;
            }
        }
        // Every source pixel contributes a total of dst/src = 0.4.
        assert!(coverage.iter().all(|c| (c - 0.4).abs() < 1e-6));
    }

    #[test]
    fn target_dims_round_and_never_vanish() {
        assert_eq!(target_dims(1000, 750, 0.25), (250, 188));
        assert_eq!(target_dims(3, 3, 0.0001), (1, 1));
        assert_eq!(target_dims(64, 32, 1.0), (64, 32));
    }

    #[test]
    fn halving_matches_block_mean() {
        let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let img = Image::from_vec(4, 4, data).expect("valid image");
        let out = area_downscale(&img, 2, 2).expect("downscale");
        assert_eq!(out.data(), &[2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn uniform_image_stays_uniform_at_odd_ratios() {
        let img = Image::new_fill(37, 23, 0.3f32);
        let out = area_downscale(&img, 11, 7).expect("downscale");
        assert!(out.data().iter().all(|v| (v - 0.3).abs() < 1e-5));
    }

    #[test]
    fn resampler_writes_rescaled_raster() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("ortho.png");
        let dst = dir.path().join("ortho.scaled.png");

        let img = Image::new_fill(40, 20, 0.5f32);
        let meta = RasterMetadata {
            transform: GeoTransform::north_up(500.0, 800.0, 0.5),
            crs: Some("EPSG:3857".into()),
            nodata: None,
        };
        om_io::write_band_unit(&img, &meta, &src).expect("write source");

        let hints = ResampleHints {
            threads: 2,
            ..ResampleHints::default()
        };
        let request = ResampleRequest::new(0.25, 1, hints);
        AreaResampler.resample(&src, &dst, &request).expect("resample");

        let band = om_io::read_band(&dst, 1).expect("read scaled");
        assert_eq!((band.width(), band.height()), (10, 5));
        assert_eq!(band.crs.as_deref(), Some("EPSG:3857"));
        assert!((band.transform.pixel_width - 2.0).abs() < 1e-12);
        assert!((band.transform.pixel_height + 2.0).abs() < 1e-12);
        assert!((band.transform.origin_x - 500.0).abs() < 1e-12);
        assert!(band.image.data().iter().all(|v| (v - 0.5).abs() < 1e-3));
    }

    #[test]
    fn requested_band_becomes_first_band_of_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("rgb.png");
        let dst = dir.path().join("rgb.scaled.png");
        let mut rgb = image::RgbImage::new(8, 6);
        for px in rgb.pixels_mut() {
            *px = image::Rgb([0, 255, 0]);
        }
        rgb.save(&src).expect("save");

        let request = ResampleRequest::new(0.5, 2, ResampleHints::default());
        AreaResampler.resample(&src, &dst, &request).expect("resample");

        let band = om_io::read_band(&dst, 1).expect("read scaled");
        assert_eq!((band.width(), band.height()), (4, 3));
        assert!(band.image.data().iter().all(|v| (v - 1.0).abs() < 1e-3));
        assert!(matches!(
            om_io::read_band(&dst, 2),
            Err(om_io::IoError::BandOutOfRange { .. })
        ));
    }

    #[test]
    fn scale_outside_unit_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = ResampleRequest::new(1.5, 1, ResampleHints::default());
        let err = AreaResampler
            .resample(&dir.path().join("a.png"), &dir.path().join("b.png"), &request)
            .unwrap_err();
        assert!(matches!(err, ResampleError::InvalidScale(_)));
    }
}
