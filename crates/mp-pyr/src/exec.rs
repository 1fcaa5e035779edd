//! CPU execution of recorded commands.
//!
//! Sources are snapshotted per slice before a pass writes, so a pass never
//! observes its own output. Compute kernels walk 8x8 thread groups the way a
//! dispatch would; the Gaussian kernel stages its horizontal pass in a
//! per-group tile with a `radius` apron, mirroring group-shared memory.

use std::ops::Range;

use glam::{IVec2, UVec2, Vec4};
use mp_core::{Error, Image, MipRect, Texel, fetch_clamped, mip_extent, sample_bilinear};

use crate::command::{Axis, Dispatch, Draw, DrawOp, GROUP_SIZE, Kernel, MipTarget};
use crate::conv::convolve_valid;
use crate::device::{Device, TextureId};
use crate::downsample::{box2x2_at, min2x2_at};

pub(crate) fn copy(
    device: &mut Device,
    src: MipTarget,
    dst: MipTarget,
    extent: UVec2,
    slices: Range<u32>,
) -> Result<(), Error> {
    for slice in slices {
        let img = snapshot(device, src, slice, extent)?;
        write_region(device, dst, slice, extent, |p| {
            img.texel(p.x as usize, p.y as usize)
        })?;
    }
    Ok(())
}

pub(crate) fn draw(device: &mut Device, draw: &Draw) -> Result<(), Error> {
    for slice in draw.slices.clone() {
        let src = snapshot(device, draw.src, slice, draw.src_extent)?;
        let view = src.as_view();

        match &draw.op {
            DrawOp::Downsample => {
                write_region(device, draw.dst, slice, draw.viewport, |p| {
                    sample_bilinear(&view, 2.0 * p.x as f32 + 0.5, 2.0 * p.y as f32 + 0.5)
                })?;
            }
            DrawOp::Blur { axis, taps } => {
                write_region(device, draw.dst, slice, draw.viewport, |p| {
                    let (x, y) = (p.x as f32, p.y as f32);
                    taps.iter().fold(Vec4::ZERO, |acc, tap| {
                        let sample = match axis {
                            Axis::Horizontal => sample_bilinear(&view, x + tap.offset, y),
                            Axis::Vertical => sample_bilinear(&view, x, y + tap.offset),
                        };
                        acc + sample * tap.weight
                    })
                })?;
            }
        }
    }
    Ok(())
}

pub(crate) fn dispatch(device: &mut Device, dispatch: &Dispatch) -> Result<(), Error> {
    let groups = dispatch.groups.truncate();
    for layer in 0..dispatch.groups.z {
        let slice = dispatch.base_slice + layer;
        match &dispatch.kernel {
            Kernel::ColorDownsample {
                src,
                src_size,
                dst,
                copy_mip0,
            } => color_downsample(device, groups, slice, *src, *src_size, *dst, *copy_mip0)?,
            Kernel::ColorGaussian {
                src,
                size,
                dst,
                weights,
            } => color_gaussian(device, groups, slice, *src, *size, *dst, weights)?,
            Kernel::DepthDownsample { texture, src, dst } => {
                depth_downsample(device, groups, slice, *texture, src, dst)?
            }
        }
    }
    Ok(())
}

fn color_downsample(
    device: &mut Device,
    groups: UVec2,
    slice: u32,
    src: MipTarget,
    src_size: UVec2,
    dst: TextureId,
    copy_mip0: Option<TextureId>,
) -> Result<(), Error> {
    let source = snapshot(device, src, slice, src_size)?;
    let view = source.as_view();
    let dst_size = mip_extent(src_size, 1);

    let format = device.desc(dst)?.format;
    let level = checked_level_mut(device, MipTarget::new(dst, 0), slice, dst_size)?;
    for_each_thread(groups, dst_size, |p| {
        let v = box2x2_at(&view, p.x as usize, p.y as usize);
        level.set(p.x as usize, p.y as usize, format.quantize(v));
    });

    if let Some(mip0) = copy_mip0 {
        let format = device.desc(mip0)?.format;
        let level = checked_level_mut(device, MipTarget::new(mip0, 0), slice, src_size)?;
        for_each_thread(groups, dst_size, |p| {
            for d in [UVec2::ZERO, UVec2::X, UVec2::Y, UVec2::ONE] {
                let s = p * 2 + d;
                if s.x < src_size.x && s.y < src_size.y {
                    let (x, y) = (s.x as usize, s.y as usize);
                    level.set(x, y, format.quantize(source.texel(x, y)));
                }
            }
        });
    }

    Ok(())
}

fn color_gaussian(
    device: &mut Device,
    groups: UVec2,
    slice: u32,
    src: TextureId,
    size: UVec2,
    dst: MipTarget,
    weights: &[f32],
) -> Result<(), Error> {
    let source = snapshot(device, MipTarget::new(src, 0), slice, size)?;
    let view = source.as_view();
    let radius = (weights.len() / 2) as i32;
    let group = GROUP_SIZE as usize;
    let span = group + 2 * radius as usize;

    let format = device.desc(dst.texture)?.format;
    let level = checked_level_mut(device, dst, slice, size)?;

    let mut row = vec![Vec4::ZERO; span];
    let mut tile = vec![Vec4::ZERO; span * group];
    let mut column = vec![Vec4::ZERO; span];
    let mut out = vec![Vec4::ZERO; group];

    for gy in 0..groups.y {
        for gx in 0..groups.x {
            let origin = IVec2::new((gx * GROUP_SIZE) as i32, (gy * GROUP_SIZE) as i32);

            // Horizontal pass over the tile rows, including the apron rows.
            for j in 0..span {
                let sy = origin.y + j as i32 - radius;
                for (i, texel) in row.iter_mut().enumerate() {
                    let sx = origin.x + i as i32 - radius;
                    *texel = fetch_clamped(&view, sx as isize, sy as isize);
                }
                convolve_valid(&row, weights, &mut tile[j * group..(j + 1) * group]);
            }

            // Vertical pass per tile column.
            for i in 0..group {
                for (j, texel) in column.iter_mut().enumerate() {
                    *texel = tile[j * group + i];
                }
                convolve_valid(&column, weights, &mut out);

                let x = origin.x as u32 + i as u32;
                for (k, &v) in out.iter().enumerate() {
                    let y = origin.y as u32 + k as u32;
                    if x < size.x && y < size.y {
                        level.set(x as usize, y as usize, format.quantize(v));
                    }
                }
            }
        }
    }

    Ok(())
}

fn depth_downsample(
    device: &mut Device,
    groups: UVec2,
    slice: u32,
    texture: TextureId,
    src: &MipRect,
    dst: &MipRect,
) -> Result<(), Error> {
    let format = device.desc(texture)?.format;
    let bounds = src
        .checked_end()
        .zip(dst.checked_end())
        .map(|(a, b)| a.max(b))
        .ok_or(Error::OutOfBounds)?;
    let atlas = checked_level_mut(device, MipTarget::new(texture, 0), slice, bounds)?;

    for_each_thread(groups, dst.size, |p| {
        let depth = min2x2_at(atlas, src, p);
        let at = dst.offset + p;
        atlas.set(
            at.x as usize,
            at.y as usize,
            format.quantize(Vec4::new(depth, 0.0, 0.0, 0.0)),
        );
    });

    Ok(())
}

/// Runs `f` for every thread of a 2D dispatch that lands inside `extent`.
fn for_each_thread(groups: UVec2, extent: UVec2, mut f: impl FnMut(UVec2)) {
    for gy in 0..groups.y {
        for gx in 0..groups.x {
            for ty in 0..GROUP_SIZE {
                for tx in 0..GROUP_SIZE {
                    let p = UVec2::new(gx * GROUP_SIZE + tx, gy * GROUP_SIZE + ty);
                    if p.x < extent.x && p.y < extent.y {
                        f(p);
                    }
                }
            }
        }
    }
}

/// Copies the `extent` region at the origin of one subresource.
fn snapshot(
    device: &Device,
    target: MipTarget,
    slice: u32,
    extent: UVec2,
) -> Result<Image<Texel>, Error> {
    let level = device.read(target.texture, target.mip, slice)?;
    let view = level
        .as_view()
        .subview(0, 0, extent.x as usize, extent.y as usize)?;

    let mut out = Image::new_fill(view.width(), view.height(), Vec4::ZERO);
    out.as_view_mut().copy_from(&view)?;
    Ok(out)
}

fn checked_level_mut(
    device: &mut Device,
    target: MipTarget,
    slice: u32,
    extent: UVec2,
) -> Result<&mut Image<Texel>, Error> {
    let level = device
        .texture_mut(target.texture)?
        .level_mut(target.mip, slice)?;
    if extent.x as usize > level.width() || extent.y as usize > level.height() {
        return Err(Error::OutOfBounds);
    }
    Ok(level)
}

fn write_region(
    device: &mut Device,
    dst: MipTarget,
    slice: u32,
    extent: UVec2,
    mut f: impl FnMut(UVec2) -> Texel,
) -> Result<(), Error> {
    let format = device.desc(dst.texture)?.format;
    let level = checked_level_mut(device, dst, slice, extent)?;
    for y in 0..extent.y {
        for x in 0..extent.x {
            let v = f(UVec2::new(x, y));
            level.set(x as usize, y as usize, format.quantize(v));
        }
    }
    Ok(())
}
