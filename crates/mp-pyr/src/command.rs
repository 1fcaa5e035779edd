//! Recorded work. Nothing here touches texel data; [`crate::Device::submit`]
//! executes a [`CommandBuffer`] later, strictly in recording order.

use std::ops::Range;
use std::sync::Arc;

use glam::{UVec2, UVec3};
use mp_core::{MipRect, div_round_up};

use crate::device::TextureId;
use crate::kernel::LinearTap;

/// Edge length of a compute thread group.
pub const GROUP_SIZE: u32 = 8;

/// One mip level of one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipTarget {
    pub texture: TextureId,
    pub mip: u32,
}

impl MipTarget {
    pub fn new(texture: TextureId, mip: u32) -> Self {
        Self { texture, mip }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Full-screen fragment work over a `viewport` at the origin of `dst`.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Bilinear fetch at the center of each 2x2 source block.
    Downsample,
    /// Weighted bilinear fetches along one axis.
    Blur { axis: Axis, taps: Arc<[LinearTap]> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub op: DrawOp,
    pub src: MipTarget,
    /// Active region of the source; sampling clamps to its edges.
    pub src_extent: UVec2,
    pub dst: MipTarget,
    pub viewport: UVec2,
    pub slices: Range<u32>,
}

/// Compute kernels. Thread `(x, y)` of the dispatch owns destination texel
/// `(x, y)`; threads past the destination size do nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    /// 2x2 box downsample of `src` into mip 0 of `dst`. With `copy_mip0`, the
    /// block's source texels are also copied into mip 0 of that texture.
    ColorDownsample {
        src: MipTarget,
        src_size: UVec2,
        dst: TextureId,
        copy_mip0: Option<TextureId>,
    },
    /// Separable blur of the `size` region of `src` mip 0 into `dst`.
    ColorGaussian {
        src: TextureId,
        size: UVec2,
        dst: MipTarget,
        weights: Arc<[f32]>,
    },
    /// In-place 2x2 min-reduction between two regions of `texture` mip 0.
    DepthDownsample {
        texture: TextureId,
        src: MipRect,
        dst: MipRect,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub kernel: Kernel,
    /// Thread groups; `z` counts array slices starting at `base_slice`.
    pub groups: UVec3,
    pub base_slice: u32,
}

impl Dispatch {
    /// Covers `extent` with 8x8 groups, one group layer per slice.
    pub fn over(kernel: Kernel, extent: UVec2, slices: Range<u32>) -> Self {
        Self {
            kernel,
            groups: UVec3::new(
                div_round_up(extent.x, GROUP_SIZE),
                div_round_up(extent.y, GROUP_SIZE),
                slices.end.saturating_sub(slices.start),
            ),
            base_slice: slices.start,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginSample(&'static str),
    EndSample,
    /// Texel-exact copy of the `extent` region at the origin.
    Copy {
        src: MipTarget,
        dst: MipTarget,
        extent: UVec2,
        slices: Range<u32>,
    },
    Draw(Draw),
    Dispatch(Dispatch),
}

#[derive(Debug, Default)]
pub struct CommandBuffer {
    label: String,
    commands: Vec<Command>,
    open_samples: usize,
}

impl CommandBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn begin_sample(&mut self, name: &'static str) {
        self.open_samples += 1;
        self.commands.push(Command::BeginSample(name));
    }

    pub fn end_sample(&mut self) {
        debug_assert!(self.open_samples > 0, "end_sample without begin_sample");
        self.open_samples = self.open_samples.saturating_sub(1);
        self.commands.push(Command::EndSample);
    }

    /// Records `f` inside a named profiling scope.
    pub fn scoped(&mut self, name: &'static str, f: impl FnOnce(&mut Self)) {
        self.begin_sample(name);
        f(self);
        self.end_sample();
    }

    pub fn copy(&mut self, src: MipTarget, dst: MipTarget, extent: UVec2, slices: Range<u32>) {
        self.commands.push(Command::Copy {
            src,
            dst,
            extent,
            slices,
        });
    }

    pub fn draw(&mut self, draw: Draw) {
        self.commands.push(Command::Draw(draw));
    }

    pub fn dispatch(&mut self, dispatch: Dispatch) {
        self.commands.push(Command::Dispatch(dispatch));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
