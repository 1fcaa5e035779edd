use glam::UVec2;
use log::debug;
use mp_core::{Error, MipChainLayout};

use crate::color::ColorPyramidBuilder;
use crate::command::CommandBuffer;
use crate::config::MipGeneratorConfig;
use crate::depth::DepthPyramidBuilder;
use crate::device::{Device, TextureId};
use crate::path::PathKind;
use crate::pool::ScratchPool;

/// Owns both pyramid builders and their scratch textures.
///
/// Construction does all one-time setup (kernel weights, linear taps, path
/// strategy). Call [`MipGenerator::end_frame`] after each submit and
/// [`MipGenerator::release`] before dropping the device to free scratch
/// textures.
#[derive(Debug)]
pub struct MipGenerator {
    config: MipGeneratorConfig,
    depth: DepthPyramidBuilder,
    color: ColorPyramidBuilder,
    pool: ScratchPool,
}

impl MipGenerator {
    pub fn new(config: MipGeneratorConfig) -> Result<Self, Error> {
        let kernel = config.blur.build()?;
        let color = ColorPyramidBuilder::new(config.path_kind(), &kernel, config.use_texture_array);
        debug!(
            "mip generator: {:?} path, {}-tap blur ({} fetches), texture arrays {}",
            config.path_kind(),
            kernel.taps(),
            color.taps().linear.len(),
            config.use_texture_array
        );

        Ok(Self {
            depth: DepthPyramidBuilder::new(config.use_texture_array),
            color,
            pool: ScratchPool::new(),
            config,
        })
    }

    pub fn config(&self) -> &MipGeneratorConfig {
        &self.config
    }

    pub fn path_kind(&self) -> PathKind {
        self.color.path_kind()
    }

    /// Records the packed min-depth pyramid of `depth` in place.
    pub fn render_min_depth_pyramid(
        &self,
        device: &Device,
        cmd: &mut CommandBuffer,
        depth: TextureId,
        layout: &MipChainLayout,
    ) -> Result<(), Error> {
        self.depth.render(device, cmd, depth, layout)
    }

    /// Records the color Gaussian pyramid and returns the populated mip count.
    pub fn render_color_gaussian_pyramid(
        &mut self,
        device: &mut Device,
        cmd: &mut CommandBuffer,
        base_size: UVec2,
        source: TextureId,
        destination: TextureId,
    ) -> Result<usize, Error> {
        self.color
            .render(device, &mut self.pool, cmd, base_size, source, destination)
    }

    /// Frees scratch images replaced while recording the frame just
    /// submitted.
    pub fn end_frame(&mut self, device: &mut Device) {
        self.pool.collect(device);
    }

    pub fn scratch_textures(&self) -> usize {
        self.pool.len()
    }

    pub fn release(&mut self, device: &mut Device) {
        debug!("releasing {} scratch texture(s)", self.pool.len());
        self.pool.release(device);
    }
}
