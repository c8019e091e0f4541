//! Stage-by-stage color transforms.
//!
//! Every function takes a `(3, rows, cols)` stack and returns a new stack of
//! the same shape. Arithmetic is `f64` throughout and the matrix and white
//! point literals are the sRGB/D65 reference values.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::ColorError;

/// sRGB (D65) linear RGB -> XYZ.
pub const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// XYZ -> sRGB (D65) linear RGB.
pub const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// D65 reference white `(Xn, Yn, Zn)`.
pub const D65_WHITE: [f64; 3] = [0.95047, 1.00000, 1.08883];

const DELTA: f64 = 6.0 / 29.0;
const DELTA_SQ: f64 = DELTA * DELTA;
const DELTA_CUBE: f64 = DELTA * DELTA * DELTA;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Rgb,
    Lch,
}

impl ColorSpace {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Lch => "lch",
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorSpace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "lch" => Ok(Self::Lch),
            other => Err(other.to_owned()),
        }
    }
}

fn check_bands(arr: &ArrayView3<'_, f64>) -> Result<(), ColorError> {
    let bands = arr.len_of(Axis(0));
    if bands != 3 {
        return Err(ColorError::InvalidShape { bands });
    }
    Ok(())
}

fn map_pixels(
    arr: &ArrayView3<'_, f64>,
    f: impl Fn([f64; 3]) -> [f64; 3],
) -> Result<Array3<f64>, ColorError> {
    check_bands(arr)?;
    let mut out = Array3::<f64>::zeros(arr.raw_dim());
    Zip::from(out.lanes_mut(Axis(0)))
        .and(arr.lanes(Axis(0)))
        .for_each(|mut o, i| {
            let v = f([i[0], i[1], i[2]]);
            o[0] = v[0];
            o[1] = v[1];
            o[2] = v[2];
        });
    Ok(out)
}

fn mat_mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// sRGB gamma decode of one component.
pub fn srgb_decode(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

/// sRGB gamma encode of one linear component.
pub fn srgb_encode(c: f64) -> f64 {
    if c > 0.0031308 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

fn lab_f(t: f64) -> f64 {
    if t > DELTA_CUBE {
        t.cbrt()
    } else {
        t / (3.0 * DELTA_SQ) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA_SQ * (t - 4.0 / 29.0)
    }
}

/// Maps an angle in degrees into `[0, 360)`.
fn normalize_hue(deg: f64) -> f64 {
    let h = if deg < 0.0 { deg + 360.0 } else { deg };
    if h >= 360.0 { h - 360.0 } else { h }
}

pub fn xyz_px_to_lab(xyz: [f64; 3]) -> [f64; 3] {
    let fx = lab_f(xyz[0] / D65_WHITE[0]);
    let fy = lab_f(xyz[1] / D65_WHITE[1]);
    let fz = lab_f(xyz[2] / D65_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub fn lab_px_to_xyz(lab: [f64; 3]) -> [f64; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = lab[1] / 500.0 + fy;
    let fz = fy - lab[2] / 200.0;
    [
        D65_WHITE[0] * lab_f_inv(fx),
        D65_WHITE[1] * lab_f_inv(fy),
        D65_WHITE[2] * lab_f_inv(fz),
    ]
}

pub fn lab_px_to_lch(lab: [f64; 3]) -> [f64; 3] {
    let c = lab[1].hypot(lab[2]);
    let h = normalize_hue(lab[2].atan2(lab[1]).to_degrees());
    [lab[0], c, h]
}

pub fn lch_px_to_lab(lch: [f64; 3]) -> [f64; 3] {
    let h = lch[2].to_radians();
    [lch[0], lch[1] * h.cos(), lch[1] * h.sin()]
}

/// Gamma-encoded sRGB in `[0, 1]` to linear RGB.
pub fn srgb_to_linear(rgb: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    check_bands(rgb)?;
    Ok(rgb.mapv(srgb_decode))
}

/// Linear RGB to gamma-encoded sRGB (no clamping).
pub fn linear_to_srgb(linear: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    check_bands(linear)?;
    Ok(linear.mapv(srgb_encode))
}

/// Gamma-encoded sRGB to XYZ.
pub fn rgb_to_xyz(rgb: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(rgb, |p| {
        mat_mul(&RGB_TO_XYZ, [srgb_decode(p[0]), srgb_decode(p[1]), srgb_decode(p[2])])
    })
}

/// XYZ to gamma-encoded sRGB, clamped to `[0, 1]`.
pub fn xyz_to_rgb(xyz: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(xyz, |p| {
        let lin = mat_mul(&XYZ_TO_RGB, p);
        [
            srgb_encode(lin[0]).clamp(0.0, 1.0),
            srgb_encode(lin[1]).clamp(0.0, 1.0),
            srgb_encode(lin[2]).clamp(0.0, 1.0),
        ]
    })
}

pub fn xyz_to_lab(xyz: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(xyz, xyz_px_to_lab)
}

pub fn lab_to_xyz(lab: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(lab, lab_px_to_xyz)
}

/// Hue is reported in degrees within `[0, 360)`.
pub fn lab_to_lch(lab: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(lab, lab_px_to_lch)
}

pub fn lch_to_lab(lch: &ArrayView3<'_, f64>) -> Result<Array3<f64>, ColorError> {
    map_pixels(lch, lch_px_to_lab)
}

/// Converts between the supported working spaces.
///
/// `src == dst` returns an independent copy of the input.
pub fn convert(
    arr: &ArrayView3<'_, f64>,
    src: ColorSpace,
    dst: ColorSpace,
) -> Result<Array3<f64>, ColorError> {
    match (src, dst) {
        (ColorSpace::Rgb, ColorSpace::Lch) => {
            let xyz = rgb_to_xyz(arr)?;
            let lab = xyz_to_lab(&xyz.view())?;
            lab_to_lch(&lab.view())
        }
        (ColorSpace::Lch, ColorSpace::Rgb) => {
            let lab = lch_to_lab(arr)?;
            let xyz = lab_to_xyz(&lab.view())?;
            xyz_to_rgb(&xyz.view())
        }
        (ColorSpace::Rgb, ColorSpace::Rgb) | (ColorSpace::Lch, ColorSpace::Lch) => {
            check_bands(arr)?;
            Ok(arr.to_owned())
        }
    }
}

/// String-keyed [`convert`]; names are case-insensitive.
///
/// Equal names are an identity copy. Any pair outside `{rgb, lch}` fails with
/// [`ColorError::UnsupportedConversion`].
pub fn convert_named(
    arr: &ArrayView3<'_, f64>,
    src: &str,
    dst: &str,
) -> Result<Array3<f64>, ColorError> {
    let src = src.to_ascii_lowercase();
    let dst = dst.to_ascii_lowercase();
    if src == dst {
        check_bands(arr)?;
        return Ok(arr.to_owned());
    }

    let unsupported = || ColorError::UnsupportedConversion {
        src: src.clone(),
        dst: dst.clone(),
    };
    let s: ColorSpace = src.parse().map_err(|_| unsupported())?;
    let d: ColorSpace = dst.parse().map_err(|_| unsupported())?;
    convert(arr, s, d)
}
