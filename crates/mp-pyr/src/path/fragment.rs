use log::trace;
use mp_core::{Error, TextureFormat, TextureUsage};

use crate::command::{Axis, CommandBuffer, Draw, DrawOp, MipTarget};
use crate::path::{ColorPassParams, ColorPyramidPath, PathKind, PyramidLevel};

/// Full-screen draws: blit, bilinear downsample, two linear-tap blur passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentPath;

impl ColorPyramidPath for FragmentPath {
    fn kind(&self) -> PathKind {
        PathKind::Fragment
    }

    fn destination_usage(&self) -> TextureUsage {
        TextureUsage::RENDER_TARGET
    }

    fn needs_blur_target(&self) -> bool {
        true
    }

    fn check_source(&self, format: TextureFormat) -> Result<(), Error> {
        if !format.is_filterable() {
            return Err(Error::FormatMismatch {
                format,
                reason: "fragment path needs a bilinear-filterable source",
            });
        }
        Ok(())
    }

    fn record(&self, cmd: &mut CommandBuffer, params: &ColorPassParams<'_>, levels: &[PyramidLevel]) {
        let destination = params.destination;
        let downsample = MipTarget::new(params.downsample_target, 0);
        let intermediate = MipTarget::new(params.blur_target.unwrap_or(params.downsample_target), 0);

        for slices in &params.slice_batches {
            cmd.copy(
                MipTarget::new(params.source, 0),
                MipTarget::new(destination, 0),
                params.base_size,
                slices.clone(),
            );
        }

        for level in levels {
            trace!(
                "fragment level {} -> {}: {}x{} -> {}x{}",
                level.src_mip,
                level.dst_mip,
                level.src_size.x,
                level.src_size.y,
                level.dst_size.x,
                level.dst_size.y
            );

            for slices in &params.slice_batches {
                let pass = |op, src, src_extent, dst| Draw {
                    op,
                    src,
                    src_extent,
                    dst,
                    viewport: level.dst_size,
                    slices: slices.clone(),
                };

                cmd.scoped("Downsample", |cmd| {
                    cmd.draw(pass(
                        DrawOp::Downsample,
                        MipTarget::new(destination, level.src_mip),
                        level.src_size,
                        downsample,
                    ));
                });
                cmd.scoped("Blur horizontal", |cmd| {
                    cmd.draw(pass(
                        DrawOp::Blur {
                            axis: Axis::Horizontal,
                            taps: params.taps.linear.clone(),
                        },
                        downsample,
                        level.dst_size,
                        intermediate,
                    ));
                });
                cmd.scoped("Blur vertical", |cmd| {
                    cmd.draw(pass(
                        DrawOp::Blur {
                            axis: Axis::Vertical,
                            taps: params.taps.linear.clone(),
                        },
                        intermediate,
                        level.dst_size,
                        MipTarget::new(destination, level.dst_mip),
                    ));
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;
    use slotmap::KeyData;

    use crate::command::{Command, CommandBuffer, DrawOp};
    use crate::device::TextureId;
    use crate::kernel::{BlurTaps, GaussianKernel1D};
    use crate::path::{ColorPassParams, ColorPyramidPath, FragmentPath, PyramidLevel};

    fn id(n: u64) -> TextureId {
        TextureId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn records_blit_then_three_passes_per_level() {
        let taps = BlurTaps::from(&GaussianKernel1D::binomial(5));
        let params = ColorPassParams {
            source: id(1),
            destination: id(2),
            downsample_target: id(3),
            blur_target: Some(id(4)),
            base_size: UVec2::new(16, 16),
            slice_batches: vec![0..1],
            taps: &taps,
        };
        let levels = [PyramidLevel {
            src_mip: 0,
            dst_mip: 1,
            src_size: UVec2::new(16, 16),
            dst_size: UVec2::new(8, 8),
        }];

        let mut cmd = CommandBuffer::new("fragment");
        FragmentPath.record(&mut cmd, &params, &levels);

        let draws: Vec<_> = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Draw(d) => Some(d),
                _ => None,
            })
            .collect();
        assert!(matches!(cmd.commands()[0], Command::Copy { .. }));
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].op, DrawOp::Downsample);
        assert_eq!(draws[0].dst.texture, id(3));
        assert_eq!(draws[1].dst.texture, id(4));
        assert_eq!(draws[2].dst.texture, id(2));
        assert_eq!(draws[2].dst.mip, 1);
        assert!(draws.iter().all(|d| d.viewport == UVec2::new(8, 8)));
    }

    #[test]
    fn rejects_non_filterable_source() {
        assert!(
            FragmentPath
                .check_source(mp_core::TextureFormat::R32Float)
                .is_err()
        );
        assert!(
            FragmentPath
                .check_source(mp_core::TextureFormat::Rgba16Float)
                .is_ok()
        );
    }
}
