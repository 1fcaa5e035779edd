use glam::UVec2;
use mp_core::{Filterable, Image, ImageView, MipRect, Texel, clamp_index, mip_extent};

/// Box mean of the 2x2 block feeding destination texel `(x, y)`.
///
/// Blocks hanging over the right or bottom edge of an odd-sized source reuse
/// the last row/column, so output size is the round-up half of the input.
#[inline]
pub fn box2x2_at<T: Filterable>(src: &ImageView<'_, T>, x: usize, y: usize) -> T {
    let (w, h) = (src.width(), src.height());
    let x0 = (2 * x).min(w - 1);
    let y0 = (2 * y).min(h - 1);
    let x1 = clamp_index(2 * x as isize + 1, w);
    let y1 = clamp_index(2 * y as isize + 1, h);

    (src.texel(x0, y0) + src.texel(x1, y0) + src.texel(x0, y1) + src.texel(x1, y1)) * 0.25
}

/// Minimum depth (`x` component) of the 2x2 block of `src` feeding texel
/// `p` of the next level, clamping reads to `src`'s last texel.
#[inline]
pub fn min2x2_at(atlas: &Image<Texel>, src: &MipRect, p: UVec2) -> f32 {
    let base = src.offset + p * 2;
    let limit = src.limit();
    let lo = base.min(limit);
    let hi = (base + UVec2::ONE).min(limit);

    let fetch = |x: u32, y: u32| atlas.texel(x as usize, y as usize).x;
    fetch(lo.x, lo.y)
        .min(fetch(hi.x, lo.y))
        .min(fetch(lo.x, hi.y))
        .min(fetch(hi.x, hi.y))
}

/// Whole-image 2x2 box downsample with round-up output size.
pub fn downsample2x2_box<T: Filterable + Default>(src: &ImageView<'_, T>) -> Image<T> {
    let extent = mip_extent(UVec2::new(src.width() as u32, src.height() as u32), 1);
    let (dst_w, dst_h) = (extent.x as usize, extent.y as usize);
    let mut dst = Image::new_fill(dst_w, dst_h, T::default());
    if src.width() == 0 || src.height() == 0 {
        return dst;
    }

    if src.width().is_multiple_of(2)
        && src.height().is_multiple_of(2)
        && let Some(src_contig) = src.as_contiguous_slice()
    {
        downsample_contiguous_even(src_contig, src.width(), dst.data_mut(), dst_w);
        return dst;
    }

    for y in 0..dst_h {
        for x in 0..dst_w {
            dst.set(x, y, box2x2_at(src, x, y));
        }
    }
    dst
}

fn downsample_contiguous_even<T: Filterable>(src: &[T], src_w: usize, dst: &mut [T], dst_w: usize) {
    for (y, dst_row) in dst.chunks_exact_mut(dst_w).enumerate() {
        let row0 = &src[(2 * y) * src_w..(2 * y + 1) * src_w];
        let row1 = &src[(2 * y + 1) * src_w..(2 * y + 2) * src_w];
        for (x, out) in dst_row.iter_mut().enumerate() {
            let sx = 2 * x;
            *out = (row0[sx] + row0[sx + 1] + row1[sx] + row1[sx + 1]) * 0.25;
        }
    }
}
