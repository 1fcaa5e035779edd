use log::trace;
use mp_core::{Error, TextureFormat, TextureUsage};

use crate::command::{CommandBuffer, Dispatch, Kernel, MipTarget};
use crate::path::{ColorPassParams, ColorPyramidPath, PathKind, PyramidLevel};

/// 8x8 thread-group dispatches. The mip 0 copy rides along with the first
/// downsample, so a pyramid with levels records no separate copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputePath;

impl ColorPyramidPath for ComputePath {
    fn kind(&self) -> PathKind {
        PathKind::Compute
    }

    fn destination_usage(&self) -> TextureUsage {
        TextureUsage::STORAGE
    }

    fn needs_blur_target(&self) -> bool {
        false
    }

    fn check_source(&self, _format: TextureFormat) -> Result<(), Error> {
        Ok(())
    }

    fn record(&self, cmd: &mut CommandBuffer, params: &ColorPassParams<'_>, levels: &[PyramidLevel]) {
        let destination = params.destination;

        for level in levels {
            trace!(
                "compute level {} -> {}: {}x{} -> {}x{}",
                level.src_mip,
                level.dst_mip,
                level.src_size.x,
                level.src_size.y,
                level.dst_size.x,
                level.dst_size.y
            );

            let first = level.src_mip == 0;
            let src = if first {
                MipTarget::new(params.source, 0)
            } else {
                MipTarget::new(destination, level.src_mip)
            };

            for slices in &params.slice_batches {
                cmd.scoped("Downsample", |cmd| {
                    cmd.dispatch(Dispatch::over(
                        Kernel::ColorDownsample {
                            src,
                            src_size: level.src_size,
                            dst: params.downsample_target,
                            copy_mip0: first.then_some(destination),
                        },
                        level.dst_size,
                        slices.clone(),
                    ));
                });
                cmd.scoped("Gaussian", |cmd| {
                    cmd.dispatch(Dispatch::over(
                        Kernel::ColorGaussian {
                            src: params.downsample_target,
                            size: level.dst_size,
                            dst: MipTarget::new(destination, level.dst_mip),
                            weights: params.taps.weights.clone(),
                        },
                        level.dst_size,
                        slices.clone(),
                    ));
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, UVec3};
    use slotmap::KeyData;

    use crate::command::{Command, CommandBuffer, Kernel};
    use crate::device::TextureId;
    use crate::kernel::{BlurTaps, GaussianKernel1D};
    use crate::path::{ColorPassParams, ColorPyramidPath, ComputePath, PyramidLevel};

    fn id(n: u64) -> TextureId {
        TextureId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn first_downsample_carries_the_mip0_copy() {
        let taps = BlurTaps::from(&GaussianKernel1D::binomial(5));
        let params = ColorPassParams {
            source: id(1),
            destination: id(2),
            downsample_target: id(3),
            blur_target: None,
            base_size: UVec2::new(32, 20),
            slice_batches: vec![0..3],
            taps: &taps,
        };
        let levels = [
            PyramidLevel {
                src_mip: 0,
                dst_mip: 1,
                src_size: UVec2::new(32, 20),
                dst_size: UVec2::new(16, 10),
            },
            PyramidLevel {
                src_mip: 1,
                dst_mip: 2,
                src_size: UVec2::new(16, 10),
                dst_size: UVec2::new(8, 5),
            },
        ];

        let mut cmd = CommandBuffer::new("compute");
        ComputePath.record(&mut cmd, &params, &levels);

        let dispatches: Vec<_> = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Dispatch(d) => Some(d),
                _ => None,
            })
            .collect();
        assert!(!cmd.commands().iter().any(|c| matches!(c, Command::Copy { .. })));
        assert_eq!(dispatches.len(), 4);
        assert_eq!(dispatches[0].groups, UVec3::new(2, 2, 3));

        match &dispatches[0].kernel {
            Kernel::ColorDownsample { src, copy_mip0, .. } => {
                assert_eq!(src.texture, id(1));
                assert_eq!(*copy_mip0, Some(id(2)));
            }
            other => panic!("unexpected kernel {other:?}"),
        }
        match &dispatches[2].kernel {
            Kernel::ColorDownsample { src, copy_mip0, .. } => {
                assert_eq!((src.texture, src.mip), (id(2), 1));
                assert_eq!(*copy_mip0, None);
            }
            other => panic!("unexpected kernel {other:?}"),
        }
    }
}
