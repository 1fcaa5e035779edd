//! Recording strategies for the color Gaussian pyramid.
//!
//! Both strategies produce the same pyramid; they differ only in how the
//! work is expressed. [`FragmentPath`] records full-screen draws with
//! bilinear fetches, [`ComputePath`] records 8x8 thread-group dispatches.

mod compute;
mod fragment;

use std::fmt::Debug;
use std::ops::Range;

use glam::UVec2;
use mp_core::{Error, TextureFormat, TextureUsage};
use serde::{Deserialize, Serialize};

use crate::command::CommandBuffer;
use crate::device::TextureId;
use crate::kernel::BlurTaps;

pub use compute::ComputePath;
pub use fragment::FragmentPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Fragment,
    Compute,
}

impl PathKind {
    pub fn strategy(self) -> Box<dyn ColorPyramidPath> {
        match self {
            Self::Fragment => Box::new(FragmentPath),
            Self::Compute => Box::new(ComputePath),
        }
    }
}

/// One step of the pyramid: `src_mip` of the destination feeds `dst_mip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLevel {
    pub src_mip: u32,
    pub dst_mip: u32,
    pub src_size: UVec2,
    pub dst_size: UVec2,
}

/// Everything a strategy needs to record one pyramid. Built fresh per call.
#[derive(Debug, Clone)]
pub struct ColorPassParams<'a> {
    pub source: TextureId,
    pub destination: TextureId,
    pub downsample_target: TextureId,
    /// Horizontal blur intermediate; only the fragment path uses one.
    pub blur_target: Option<TextureId>,
    pub base_size: UVec2,
    /// Array-slice ranges, one recorded command per range.
    pub slice_batches: Vec<Range<u32>>,
    pub taps: &'a BlurTaps,
}

pub trait ColorPyramidPath: Debug {
    fn kind(&self) -> PathKind;

    /// Usage the destination texture must carry.
    fn destination_usage(&self) -> TextureUsage;

    fn needs_blur_target(&self) -> bool;

    fn check_source(&self, format: TextureFormat) -> Result<(), Error>;

    /// Records mip 0 plus every level of `levels` into `cmd`. `levels` is
    /// never empty; a pyramid without levels is a plain copy.
    fn record(&self, cmd: &mut CommandBuffer, params: &ColorPassParams<'_>, levels: &[PyramidLevel]);
}
