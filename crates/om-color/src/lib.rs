//! Perceptual color-space conversion for exposure normalisation.
//!
//! Stacks are band-ordered `(3, rows, cols)` arrays of `f64`. The chain is
//! sRGB -> linear RGB -> XYZ (D65) -> CIELAB -> LCh(ab) and its inverse.
//! Hue is expressed in degrees within `[0, 360)`.
//!
//! A histogram matcher equalises images in LCh before cutlines are computed;
//! small numeric drift here shows up as visible seams after blending, so all
//! constants are the reference literals and arithmetic stays in `f64`.

mod conversion;
mod normalize;

pub use conversion::{
    ColorSpace, D65_WHITE, RGB_TO_XYZ, XYZ_TO_RGB, convert, convert_named, lab_px_to_lch,
    lab_px_to_xyz, lab_to_lch, lab_to_xyz, lch_px_to_lab, lch_to_lab, linear_to_srgb, rgb_to_xyz,
    srgb_decode, srgb_encode, srgb_to_linear, xyz_px_to_lab, xyz_to_lab, xyz_to_rgb,
};
pub use normalize::{backward_u8, forward_u8, forward_u16};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("unsupported conversion: {src} to {dst}")]
    UnsupportedConversion { src: String, dst: String },
    #[error("expected a 3-band stack, got {bands} bands")]
    InvalidShape { bands: usize },
}
