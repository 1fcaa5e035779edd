use core::ops::{Add, Mul};

use crate::image::ImageView;

/// Texel types that can be blended by filtering (`f32`, `glam::Vec4`).
pub trait Filterable: Copy + Add<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Filterable for T where T: Copy + Add<Output = T> + Mul<f32, Output = T> {}

#[inline]
pub fn clamp_index(i: isize, len: usize) -> usize {
    if i < 0 { 0 } else { (i as usize).min(len - 1) }
}

/// Point fetch with clamp-to-edge addressing.
pub fn fetch_clamped<T: Copy>(img: &ImageView<'_, T>, x: isize, y: isize) -> T {
    assert!(
        img.width() > 0 && img.height() > 0,
        "cannot sample an empty image"
    );
    img.texel(clamp_index(x, img.width()), clamp_index(y, img.height()))
}

/// Bilinear sample with clamp-to-edge addressing.
///
/// Integer coordinates address texel centers, so `(0.5, 0.5)` blends the four
/// texels of the top-left 2x2 block with equal weights.
pub fn sample_bilinear<T: Filterable>(img: &ImageView<'_, T>, x: f32, y: f32) -> T {
    let x0 = x.floor();
    let y0 = y.floor();
    let dx = x - x0;
    let dy = y - y0;
    let x0 = x0 as isize;
    let y0 = y0 as isize;

    let p00 = fetch_clamped(img, x0, y0);
    let p10 = fetch_clamped(img, x0 + 1, y0);
    let p01 = fetch_clamped(img, x0, y0 + 1);
    let p11 = fetch_clamped(img, x0 + 1, y0 + 1);

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}
