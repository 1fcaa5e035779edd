use std::ops::Range;

use glam::UVec2;
use log::trace;
use mp_core::{Error, TextureDesc, mip_extent};

use crate::command::{CommandBuffer, MipTarget};
use crate::device::{Device, TextureId};
use crate::kernel::{BlurTaps, GaussianKernel1D};
use crate::path::{ColorPassParams, ColorPyramidPath, PathKind, PyramidLevel};
use crate::pool::{ScratchPool, ScratchSlot};

/// Smallest extent (largest axis) a generated level may have.
pub const MIN_LEVEL_SIZE: u32 = 8;

/// Levels below mip 0 for a `base` sized source.
///
/// Level `k + 1` exists while `max(w, h) >> (k + 1) >= 8`; extents are the
/// round-up halves of the previous level.
pub fn pyramid_levels(base: UVec2) -> Vec<PyramidLevel> {
    let longest = base.max_element();
    let mut levels = Vec::new();
    let mut k = 0u32;
    while k < 31 && (longest >> (k + 1)) >= MIN_LEVEL_SIZE {
        levels.push(PyramidLevel {
            src_mip: k,
            dst_mip: k + 1,
            src_size: mip_extent(base, k),
            dst_size: mip_extent(base, k + 1),
        });
        k += 1;
    }
    levels
}

/// Number of populated mips, mip 0 included.
pub fn color_level_count(base: UVec2) -> usize {
    pyramid_levels(base).len() + 1
}

/// Records the color Gaussian pyramid with one [`ColorPyramidPath`].
#[derive(Debug)]
pub struct ColorPyramidBuilder {
    path: Box<dyn ColorPyramidPath>,
    taps: BlurTaps,
    use_texture_array: bool,
}

impl ColorPyramidBuilder {
    pub fn new(path: PathKind, kernel: &GaussianKernel1D, use_texture_array: bool) -> Self {
        Self {
            path: path.strategy(),
            taps: BlurTaps::from(kernel),
            use_texture_array,
        }
    }

    pub fn path_kind(&self) -> PathKind {
        self.path.kind()
    }

    pub fn taps(&self) -> &BlurTaps {
        &self.taps
    }

    /// Records mip 0 plus every generated level of `destination` and returns
    /// the number of populated mips.
    ///
    /// Nothing is recorded when validation fails.
    pub fn render(
        &self,
        device: &mut Device,
        pool: &mut ScratchPool,
        cmd: &mut CommandBuffer,
        base_size: UVec2,
        source: TextureId,
        destination: TextureId,
    ) -> Result<usize, Error> {
        if source == destination {
            return Err(Error::AliasedTextures);
        }
        if base_size.min_element() == 0 {
            return Err(Error::InvalidDescriptor("empty pyramid base size".into()));
        }

        let src_desc = device.desc(source)?.clone();
        let dst_desc = device.desc(destination)?.clone();
        let levels = pyramid_levels(base_size);
        self.validate(&src_desc, &dst_desc, base_size, levels.len() as u32 + 1)?;

        let slice_batches = self.slice_batches(dst_desc.slices);

        if levels.is_empty() {
            trace!(
                "color pyramid {}x{} has no levels, copying mip 0",
                base_size.x, base_size.y
            );
            for slices in slice_batches {
                cmd.copy(
                    MipTarget::new(source, 0),
                    MipTarget::new(destination, 0),
                    base_size,
                    slices,
                );
            }
            return Ok(1);
        }

        let downsample_target = pool.acquire_scratch(
            device,
            ScratchSlot::Downsample,
            dst_desc.format,
            dst_desc.slices,
            base_size,
        )?;
        let blur_target = if self.path.needs_blur_target() {
            Some(pool.acquire_scratch(
                device,
                ScratchSlot::BlurIntermediate,
                dst_desc.format,
                dst_desc.slices,
                base_size,
            )?)
        } else {
            None
        };

        let params = ColorPassParams {
            source,
            destination,
            downsample_target,
            blur_target,
            base_size,
            slice_batches,
            taps: &self.taps,
        };
        self.path.record(cmd, &params, &levels);

        Ok(levels.len() + 1)
    }

    fn validate(
        &self,
        src: &TextureDesc,
        dst: &TextureDesc,
        base_size: UVec2,
        level_count: u32,
    ) -> Result<(), Error> {
        if src.slices != dst.slices {
            return Err(Error::SliceMismatch {
                src_slices: src.slices,
                dst_slices: dst.slices,
            });
        }

        for desc in [src, dst] {
            let extent = desc.extent();
            if extent.cmplt(base_size).any() {
                return Err(Error::ExtentMismatch {
                    needed_w: base_size.x,
                    needed_h: base_size.y,
                    actual_w: extent.x,
                    actual_h: extent.y,
                });
            }
        }

        if dst.mip_count < level_count {
            return Err(Error::MipCountMismatch {
                needed: level_count,
                available: dst.mip_count,
            });
        }

        if dst.format.is_single_channel() {
            return Err(Error::FormatMismatch {
                format: dst.format,
                reason: "color pyramid destination needs four channels",
            });
        }
        if !dst.usage.contains(self.path.destination_usage()) {
            return Err(Error::FormatMismatch {
                format: dst.format,
                reason: "destination usage does not allow writes from this path",
            });
        }

        self.path.check_source(src.format)
    }

    fn slice_batches(&self, slices: u32) -> Vec<Range<u32>> {
        if self.use_texture_array {
            vec![0..slices]
        } else {
            (0..slices).map(|s| s..s + 1).collect()
        }
    }
}
