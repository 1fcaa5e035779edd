use bitflags::bitflags;
use glam::{UVec2, Vec4};
use half::f16;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::image::Image;

/// Texel storage for every format. Single-channel formats live in `x`.
pub type Texel = Vec4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    R16Float,
    R32Float,
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
}

impl TextureFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::R16Float | Self::R32Float => 1,
            Self::Rgba8Unorm | Self::Rgba16Float | Self::Rgba32Float => 4,
        }
    }

    pub fn is_single_channel(self) -> bool {
        self.channels() == 1
    }

    /// Whether the format can be read through a linear (bilinear) sampler.
    pub fn is_filterable(self) -> bool {
        !matches!(self, Self::R32Float)
    }

    /// Rounds a texel to what the format can store.
    pub fn quantize(self, t: Texel) -> Texel {
        match self {
            Self::R32Float => Vec4::new(t.x, 0.0, 0.0, 0.0),
            Self::R16Float => Vec4::new(to_half(t.x), 0.0, 0.0, 0.0),
            Self::Rgba32Float => t,
            Self::Rgba16Float => Vec4::new(to_half(t.x), to_half(t.y), to_half(t.z), to_half(t.w)),
            Self::Rgba8Unorm => (t.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round() / 255.0,
        }
    }
}

#[inline]
fn to_half(v: f32) -> f32 {
    f16::from_f32(v).to_f32()
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1;
        /// Random-access writes from compute dispatches.
        const STORAGE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Caller,
    Pool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Array slices; `1` for a plain 2D texture.
    pub slices: u32,
    pub mip_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDesc {
    pub fn new_2d(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            slices: 1,
            mip_count: 1,
            format,
            usage,
        }
    }

    pub fn with_slices(mut self, slices: u32) -> Self {
        self.slices = slices;
        self
    }

    pub fn with_mips(mut self, mip_count: u32) -> Self {
        self.mip_count = mip_count;
        self
    }

    /// Allocates every mip down to 1x1.
    pub fn with_full_mip_chain(mut self) -> Self {
        self.mip_count = full_mip_count(self.width, self.height);
        self
    }

    pub fn extent(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn mip_extent(&self, mip: u32) -> UVec2 {
        mip_extent(self.extent(), mip)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDescriptor(format!(
                "{}: zero extent {}x{}",
                self.label, self.width, self.height
            )));
        }
        if self.slices == 0 {
            return Err(Error::InvalidDescriptor(format!(
                "{}: zero array slices",
                self.label
            )));
        }
        let max_mips = full_mip_count(self.width, self.height);
        if self.mip_count == 0 || self.mip_count > max_mips {
            return Err(Error::InvalidDescriptor(format!(
                "{}: mip count {} outside 1..={max_mips}",
                self.label, self.mip_count
            )));
        }
        Ok(())
    }
}

/// Extent of mip `level`, halving with round-up and never below 1.
pub fn mip_extent(base: UVec2, level: u32) -> UVec2 {
    let round_up = |n: u32| {
        if level >= 32 {
            return 1;
        }
        let step = 1u64 << level;
        ((u64::from(n) + step - 1) >> level).max(1) as u32
    };
    UVec2::new(round_up(base.x), round_up(base.y))
}

/// Number of mips in a complete chain ending at 1x1.
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1);
    32 - max_dim.leading_zeros()
}

#[inline]
pub fn div_round_up(n: u32, d: u32) -> u32 {
    n.div_ceil(d)
}

/// Texture storage: `mip_count` levels, each holding `slices` images.
#[derive(Debug, Clone)]
pub struct Texture {
    desc: TextureDesc,
    ownership: Ownership,
    levels: Vec<Vec<Image<Texel>>>,
}

impl Texture {
    pub fn new(desc: TextureDesc, ownership: Ownership) -> Result<Self, Error> {
        desc.validate()?;

        let levels = (0..desc.mip_count)
            .map(|mip| {
                let e = desc.mip_extent(mip);
                (0..desc.slices)
                    .map(|_| Image::new_fill(e.x as usize, e.y as usize, Vec4::ZERO))
                    .collect()
            })
            .collect();

        Ok(Self {
            desc,
            ownership,
            levels,
        })
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn level(&self, mip: u32, slice: u32) -> Result<&Image<Texel>, Error> {
        self.check_subresource(mip, slice)?;
        Ok(&self.levels[mip as usize][slice as usize])
    }

    pub fn level_mut(&mut self, mip: u32, slice: u32) -> Result<&mut Image<Texel>, Error> {
        self.check_subresource(mip, slice)?;
        Ok(&mut self.levels[mip as usize][slice as usize])
    }

    /// Replaces one subresource, quantizing every texel to the texture format.
    pub fn upload(&mut self, mip: u32, slice: u32, image: &Image<Texel>) -> Result<(), Error> {
        let format = self.desc.format;
        let level = self.level_mut(mip, slice)?;
        if level.width() != image.width() || level.height() != image.height() {
            return Err(Error::ExtentMismatch {
                needed_w: level.width() as u32,
                needed_h: level.height() as u32,
                actual_w: image.width() as u32,
                actual_h: image.height() as u32,
            });
        }
        for (dst, &src) in level.data_mut().iter_mut().zip(image.data()) {
            *dst = format.quantize(src);
        }
        Ok(())
    }

    fn check_subresource(&self, mip: u32, slice: u32) -> Result<(), Error> {
        if mip >= self.desc.mip_count {
            return Err(Error::MipOutOfRange {
                mip,
                count: self.desc.mip_count,
            });
        }
        if slice >= self.desc.slices {
            return Err(Error::SliceOutOfRange {
                slice,
                count: self.desc.slices,
            });
        }
        Ok(())
    }
}
