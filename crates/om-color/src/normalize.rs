//! Integer raster stacks in and out of the working color space.
//!
//! Samples are normalised by the maximum of their integer type before the
//! forward conversion; only the first three bands take part, so an alpha band
//! is ignored.

use ndarray::{Array3, ArrayView3, Axis, s};

use crate::{ColorError, ColorSpace, convert};

fn first_three<T>(arr: &ArrayView3<'_, T>) -> Result<(), ColorError> {
    let bands = arr.len_of(Axis(0));
    if bands < 3 {
        return Err(ColorError::InvalidShape { bands });
    }
    Ok(())
}

/// 8-bit RGB(A) stack to `space`, values of the RGB form in `[0, 1]`.
pub fn forward_u8(arr: &ArrayView3<'_, u8>, space: ColorSpace) -> Result<Array3<f64>, ColorError> {
    first_three(arr)?;
    let rgb = arr
        .slice(s![0..3, .., ..])
        .mapv(|v| f64::from(v) / f64::from(u8::MAX));
    convert(&rgb.view(), ColorSpace::Rgb, space)
}

/// 16-bit RGB(A) stack to `space`.
pub fn forward_u16(
    arr: &ArrayView3<'_, u16>,
    space: ColorSpace,
) -> Result<Array3<f64>, ColorError> {
    first_three(arr)?;
    let rgb = arr
        .slice(s![0..3, .., ..])
        .mapv(|v| f64::from(v) / f64::from(u16::MAX));
    convert(&rgb.view(), ColorSpace::Rgb, space)
}

/// Stack in `space` back to 8-bit RGB. Values are clamped then truncated.
pub fn backward_u8(arr: &ArrayView3<'_, f64>, space: ColorSpace) -> Result<Array3<u8>, ColorError> {
    let rgb = convert(arr, space, ColorSpace::Rgb)?;
    Ok(rgb.mapv(|v| (v.clamp(0.0, 1.0) * 255.0) as u8))
}
