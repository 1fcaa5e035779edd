//! Foundational primitives for mip-pyramid generation.
//!
//! ## Images and Views
//! Images use element stride (not byte stride). `stride` is the distance, in
//! texels, between adjacent row starts and may be greater than `width`, which
//! lets a view cover the active viewport of a larger scratch image or one
//! level of a packed atlas.
//!
//! ## Textures
//! A [`Texture`] holds `mip_count` levels of `slices` images each. Texels are
//! stored as `Vec4`; single-channel formats keep their value in `x`. Every
//! write into a texture goes through [`TextureFormat::quantize`].
//!
//! ## Sampling Coordinates
//! Integer coordinates refer to texel centers. Bilinear sampling uses the
//! floor-based 2x2 neighborhood with clamp-to-edge addressing, so a fetch at
//! `(2x + 0.5, 2y + 0.5)` is the box mean of one 2x2 block.

mod error;
mod image;
mod layout;
mod sample;
mod texture;

pub use error::Error;
pub use image::{Image, ImageView, ImageViewMut};
pub use layout::{MipChainLayout, MipRect};
pub use sample::{Filterable, clamp_index, fetch_clamped, sample_bilinear};
pub use texture::{
    Ownership, Texel, Texture, TextureDesc, TextureFormat, TextureUsage, div_round_up,
    full_mip_count, mip_extent,
};

pub use glam::{UVec2, Vec4};
