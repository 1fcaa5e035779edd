use log::trace;
use mp_core::{Error, MipChainLayout, TextureUsage};

use crate::command::{CommandBuffer, Dispatch, Kernel};
use crate::device::{Device, TextureId};

/// Records the packed min-depth pyramid.
///
/// Every level lives in mip 0 of the depth texture at its layout rectangle.
/// Level `i` is the 2x2 minimum of level `i - 1`, with reads clamped to the
/// previous level's last texel. No scratch memory is used.
#[derive(Debug, Clone, Copy)]
pub struct DepthPyramidBuilder {
    use_texture_array: bool,
}

impl DepthPyramidBuilder {
    pub fn new(use_texture_array: bool) -> Self {
        Self { use_texture_array }
    }

    pub fn render(
        &self,
        device: &Device,
        cmd: &mut CommandBuffer,
        texture: TextureId,
        layout: &MipChainLayout,
    ) -> Result<(), Error> {
        let desc = device.desc(texture)?;
        if layout.level_count() <= 1 {
            trace!("depth pyramid has {} level(s), nothing to do", layout.level_count());
            return Ok(());
        }

        if !desc.format.is_single_channel() {
            return Err(Error::FormatMismatch {
                format: desc.format,
                reason: "depth pyramid needs a single-channel texture",
            });
        }
        if !desc.usage.contains(TextureUsage::STORAGE) {
            return Err(Error::FormatMismatch {
                format: desc.format,
                reason: "depth pyramid texture needs storage usage",
            });
        }

        let extent = desc.extent();
        for (i, rect) in layout.levels().iter().enumerate() {
            if rect.size.min_element() == 0 {
                return Err(Error::InvalidLayout(format!("level {i} is empty")));
            }
            let end = rect.checked_end().ok_or(Error::OutOfBounds)?;
            if end.cmpgt(extent).any() {
                return Err(Error::OutOfBounds);
            }
        }

        let batches: Vec<_> = if self.use_texture_array {
            vec![0..desc.slices]
        } else {
            (0..desc.slices).map(|s| s..s + 1).collect()
        };

        for pair in layout.levels().windows(2) {
            let (src, dst) = (pair[0], pair[1]);
            trace!(
                "depth level {}x{}@{:?} -> {}x{}@{:?}",
                src.size.x, src.size.y, src.offset, dst.size.x, dst.size.y, dst.offset
            );
            for slices in &batches {
                cmd.scoped("Depth downsample", |cmd| {
                    cmd.dispatch(Dispatch::over(
                        Kernel::DepthDownsample {
                            texture,
                            src,
                            dst,
                        },
                        dst.size,
                        slices.clone(),
                    ));
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec4};
    use mp_core::{Error, Image, MipChainLayout, MipRect, TextureDesc, TextureFormat, TextureUsage};

    use crate::command::{Command, CommandBuffer};
    use crate::depth::DepthPyramidBuilder;
    use crate::device::{Device, TextureId};

    fn depth_texture(device: &mut Device, size: UVec2, slices: u32) -> TextureId {
        device
            .create_texture(
                TextureDesc::new_2d(
                    "depth",
                    size.x,
                    size.y,
                    TextureFormat::R32Float,
                    TextureUsage::SAMPLED | TextureUsage::STORAGE,
                )
                .with_slices(slices),
            )
            .expect("depth texture")
    }

    fn upload_level0(device: &mut Device, id: TextureId, slice: u32, rect: MipRect, f: impl Fn(u32, u32) -> f32) {
        let atlas = device.desc(id).expect("live").extent();
        let mut img = Image::new_fill(atlas.x as usize, atlas.y as usize, Vec4::ONE);
        for y in 0..rect.size.y {
            for x in 0..rect.size.x {
                let v = Vec4::new(f(x, y), 0.0, 0.0, 0.0);
                img.set((rect.offset.x + x) as usize, (rect.offset.y + y) as usize, v);
            }
        }
        device.write(id, 0, slice, &img).expect("upload");
    }

    fn depth_at(atlas: &Image<Vec4>, rect: &MipRect, x: u32, y: u32) -> f32 {
        let p = rect.offset + UVec2::new(x, y).min(rect.size - UVec2::ONE);
        atlas.texel(p.x as usize, p.y as usize).x
    }

    /// Checks every level against a clamped 2x2 minimum of the level above it.
    fn assert_min_pyramid(atlas: &Image<Vec4>, layout: &MipChainLayout) {
        for pair in layout.levels().windows(2) {
            let (src, dst) = (&pair[0], &pair[1]);
            for y in 0..dst.size.y {
                for x in 0..dst.size.x {
                    let expected = depth_at(atlas, src, 2 * x, 2 * y)
                        .min(depth_at(atlas, src, 2 * x + 1, 2 * y))
                        .min(depth_at(atlas, src, 2 * x, 2 * y + 1))
                        .min(depth_at(atlas, src, 2 * x + 1, 2 * y + 1));
                    assert_eq!(depth_at(atlas, dst, x, y), expected, "texel ({x}, {y}) of {dst:?}");
                }
            }
        }
    }

    fn run(device: &mut Device, texture: TextureId, layout: &MipChainLayout, texture_array: bool) -> usize {
        let mut cmd = CommandBuffer::new("depth pyramid");
        DepthPyramidBuilder::new(texture_array)
            .render(device, &mut cmd, texture, layout)
            .expect("render");
        device.submit(cmd).expect("submit").dispatches
    }

    #[test]
    fn checkerboard_reduces_to_the_near_value() {
        let layout = MipChainLayout::new(vec![
            MipRect::new(0, 0, 64, 64),
            MipRect::new(0, 64, 32, 32),
            MipRect::new(0, 96, 16, 16),
        ]);
        let mut device = Device::new();
        let id = depth_texture(&mut device, UVec2::new(64, 112), 1);
        upload_level0(&mut device, id, 0, layout.levels()[0], |x, y| {
            if (x + y) % 2 == 0 { 0.1 } else { 0.9 }
        });

        assert_eq!(run(&mut device, id, &layout, true), 2);

        let atlas = device.read(id, 0, 0).expect("atlas");
        assert_min_pyramid(atlas, &layout);
        for rect in &layout.levels()[1..] {
            for y in 0..rect.size.y {
                for x in 0..rect.size.x {
                    assert_eq!(depth_at(atlas, rect, x, y), 0.1);
                }
            }
        }
    }

    #[test]
    fn coarse_cells_keep_their_value() {
        let layout = MipChainLayout::packed(UVec2::new(64, 64));
        let mut device = Device::new();
        let id = depth_texture(&mut device, layout.atlas_size(), 1);
        let cell = |x: u32, y: u32| if (x / 8 + y / 8) % 2 == 0 { 0.1 } else { 0.9 };
        upload_level0(&mut device, id, 0, layout.levels()[0], cell);

        run(&mut device, id, &layout, true);

        let atlas = device.read(id, 0, 0).expect("atlas");
        assert_min_pyramid(atlas, &layout);
        let level2 = &layout.levels()[2];
        assert_eq!(depth_at(atlas, level2, 0, 0), 0.1);
        assert_eq!(depth_at(atlas, level2, 2, 0), 0.9);
        let level3 = &layout.levels()[3];
        assert_eq!(depth_at(atlas, level3, 1, 0), 0.9);
        assert_eq!(depth_at(atlas, level3, 1, 1), 0.1);
    }

    #[test]
    fn odd_layouts_clamp_to_the_last_texel() {
        let layout = MipChainLayout::packed(UVec2::new(13, 7));
        let mut device = Device::new();
        let id = depth_texture(&mut device, layout.atlas_size(), 2);
        for slice in 0..2 {
            upload_level0(&mut device, id, slice, layout.levels()[0], |x, y| {
                ((x * 7 + y * 3 + slice * 5) % 11) as f32 / 11.0
            });
        }

        let dispatches = run(&mut device, id, &layout, false);
        assert_eq!(dispatches, 2 * (layout.level_count() - 1));

        for slice in 0..2 {
            assert_min_pyramid(device.read(id, 0, slice).expect("atlas"), &layout);
        }
    }

    #[test]
    fn constant_depth_stays_constant() {
        let layout = MipChainLayout::packed(UVec2::new(40, 24));
        let mut device = Device::new();
        let id = depth_texture(&mut device, layout.atlas_size(), 1);
        upload_level0(&mut device, id, 0, layout.levels()[0], |_, _| 0.5);

        run(&mut device, id, &layout, true);

        let atlas = device.read(id, 0, 0).expect("atlas");
        for rect in layout.levels() {
            for y in 0..rect.size.y {
                for x in 0..rect.size.x {
                    assert_eq!(depth_at(atlas, rect, x, y), 0.5);
                }
            }
        }
    }

    #[test]
    fn single_level_layout_is_a_no_op() {
        let mut device = Device::new();
        let id = depth_texture(&mut device, UVec2::new(8, 8), 1);
        let layout = MipChainLayout::new(vec![MipRect::new(0, 0, 8, 8)]);

        let mut cmd = CommandBuffer::new("noop");
        DepthPyramidBuilder::new(true)
            .render(&device, &mut cmd, id, &layout)
            .expect("no-op");
        assert!(cmd.is_empty());
    }

    #[test]
    fn empty_layout_is_a_no_op() {
        let mut device = Device::new();
        let id = depth_texture(&mut device, UVec2::new(8, 8), 1);

        let mut cmd = CommandBuffer::new("noop");
        DepthPyramidBuilder::new(true)
            .render(&device, &mut cmd, id, &MipChainLayout::default())
            .expect("no-op");
        assert!(cmd.is_empty());
    }

    #[test]
    fn overflowing_rect_is_out_of_bounds() {
        let mut device = Device::new();
        let id = depth_texture(&mut device, UVec2::new(16, 24), 1);
        let layout = MipChainLayout::new(vec![
            MipRect::new(0, 0, 16, 16),
            MipRect::new(u32::MAX, 0, 8, 8),
        ]);

        let mut cmd = CommandBuffer::new("overflow");
        assert_eq!(
            DepthPyramidBuilder::new(true)
                .render(&device, &mut cmd, id, &layout)
                .unwrap_err(),
            Error::OutOfBounds
        );
        assert!(cmd.is_empty());
    }

    #[test]
    fn invalid_targets_are_rejected_before_recording() {
        let mut device = Device::new();
        let layout = MipChainLayout::packed(UVec2::new(16, 16));
        let builder = DepthPyramidBuilder::new(true);
        let mut cmd = CommandBuffer::new("errors");

        let too_small = depth_texture(&mut device, UVec2::new(16, 16), 1);
        assert_eq!(
            builder.render(&device, &mut cmd, too_small, &layout).unwrap_err(),
            Error::OutOfBounds
        );

        let color = device
            .create_texture(TextureDesc::new_2d(
                "color",
                16,
                24,
                TextureFormat::Rgba16Float,
                TextureUsage::STORAGE,
            ))
            .expect("color");
        assert!(matches!(
            builder.render(&device, &mut cmd, color, &layout).unwrap_err(),
            Error::FormatMismatch { .. }
        ));

        let sampled_only = device
            .create_texture(TextureDesc::new_2d(
                "sampled",
                16,
                24,
                TextureFormat::R32Float,
                TextureUsage::SAMPLED,
            ))
            .expect("sampled");
        assert!(matches!(
            builder.render(&device, &mut cmd, sampled_only, &layout).unwrap_err(),
            Error::FormatMismatch { .. }
        ));

        let empty = MipChainLayout::new(vec![MipRect::new(0, 0, 16, 16), MipRect::new(0, 16, 0, 8)]);
        let atlas = depth_texture(&mut device, UVec2::new(16, 24), 1);
        assert!(matches!(
            builder.render(&device, &mut cmd, atlas, &empty).unwrap_err(),
            Error::InvalidLayout(_)
        ));

        assert!(cmd.is_empty());
    }

    #[test]
    fn commands_reference_the_layout_rects() {
        let layout = MipChainLayout::packed(UVec2::new(32, 32));
        let mut device = Device::new();
        let id = depth_texture(&mut device, layout.atlas_size(), 1);

        let mut cmd = CommandBuffer::new("rects");
        DepthPyramidBuilder::new(true)
            .render(&device, &mut cmd, id, &layout)
            .expect("render");

        let scopes = cmd
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::BeginSample("Depth downsample")))
            .count();
        assert_eq!(scopes, layout.level_count() - 1);
    }
}
