use geo::Coord;
use serde::{Deserialize, Serialize};

/// Affine pixel-to-map transform in GDAL coefficient order.
///
/// `[c, a, b, f, d, e]` maps pixel corner coordinates `(col, row)` to
/// `x = c + a*col + b*row`, `y = f + d*col + e*row`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Pixel units are map units, origin at the top-left corner.
    pub const IDENTITY: Self = Self {
        origin_x: 0.0,
        pixel_width: 1.0,
        row_rotation: 0.0,
        origin_y: 0.0,
        col_rotation: 0.0,
        pixel_height: 1.0,
    };

    /// North-up transform with square pixels.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self {
            origin_x,
            pixel_width: pixel_size,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -pixel_size,
        }
    }

    /// Map coordinate of a fractional pixel-corner position.
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + self.pixel_width * col + self.row_rotation * row,
            y: self.origin_y + self.col_rotation * col + self.pixel_height * row,
        }
    }

    /// Map coordinate of the centre of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> Coord<f64> {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Transform for a resampled grid whose pixels cover `fx` x `fy` source
    /// pixels. The map footprint of the raster is unchanged.
    pub fn rescaled(&self, fx: f64, fy: f64) -> Self {
        Self {
            origin_x: self.origin_x,
            pixel_width: self.pixel_width * fx,
            row_rotation: self.row_rotation * fy,
            origin_y: self.origin_y,
            col_rotation: self.col_rotation * fx,
            pixel_height: self.pixel_height * fy,
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }
}

impl From<GeoTransform> for [f64; 6] {
    fn from(t: GeoTransform) -> Self {
        [
            t.origin_x,
            t.pixel_width,
            t.row_rotation,
            t.origin_y,
            t.col_rotation,
            t.pixel_height,
        ]
    }
}
