//! Color Gaussian pyramids and packed depth min-pyramids.
//!
//! Builders never touch texels. They validate their inputs and record work
//! into a [`CommandBuffer`]; [`Device::submit`] executes it later, strictly
//! in recording order, on the CPU.
//!
//! ## Level Rule
//! A color pyramid over a `w x h` source produces level `k + 1` while
//! `max(w, h) >> (k + 1) >= 8`. Level `k` is `ceil(w / 2^k) x ceil(h / 2^k)`.
//! Mip 0 is always a texel-exact copy of the source.
//!
//! ## Filters
//! - Downsample: 2x2 box mean, equivalently a bilinear fetch at the block
//!   center. Odd edges reuse the last row/column.
//! - Blur: separable, horizontal then vertical, clamped to the active level
//!   extent. Default kernel is the 5-tap binomial `[1 4 6 4 1] / 16`.
//! - Depth: 2x2 minimum with reads clamped to the previous level's last
//!   texel.
//!
//! ## Paths
//! [`PathKind::Fragment`] records draws and folds kernel weight pairs into
//! bilinear fetches. [`PathKind::Compute`] records 8x8 thread-group
//! dispatches. Both produce the same pyramid up to float rounding.

mod color;
mod command;
mod config;
mod conv;
mod depth;
mod device;
mod downsample;
mod exec;
mod generator;
mod kernel;
mod path;
mod pool;

pub use color::{ColorPyramidBuilder, MIN_LEVEL_SIZE, color_level_count, pyramid_levels};
pub use command::{
    Axis, Command, CommandBuffer, Dispatch, Draw, DrawOp, GROUP_SIZE, Kernel, MipTarget,
};
pub use config::{BlurKernel, MAX_BINOMIAL_TAPS, MipGeneratorConfig};
pub use conv::convolve_valid;
pub use depth::DepthPyramidBuilder;
pub use device::{Device, SubmitReport, TextureId};
pub use downsample::{box2x2_at, downsample2x2_box, min2x2_at};
pub use generator::MipGenerator;
pub use kernel::{BlurTaps, GaussianKernel1D, LinearTap};
pub use path::{
    ColorPassParams, ColorPyramidPath, ComputePath, FragmentPath, PathKind, PyramidLevel,
};
pub use pool::{ScratchPool, ScratchSlot};
