use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::texture::mip_extent;

/// One level of a packed mip chain: a rectangle inside the atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MipRect {
    pub offset: UVec2,
    pub size: UVec2,
}

impl MipRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            offset: UVec2::new(x, y),
            size: UVec2::new(width, height),
        }
    }

    /// One past the last texel on each axis, saturating at `u32::MAX`.
    pub fn end(&self) -> UVec2 {
        self.offset.saturating_add(self.size)
    }

    /// One past the last texel, or `None` when `offset + size` overflows.
    pub fn checked_end(&self) -> Option<UVec2> {
        Some(UVec2::new(
            self.offset.x.checked_add(self.size.x)?,
            self.offset.y.checked_add(self.size.y)?,
        ))
    }

    /// Last addressable texel (inclusive).
    pub fn limit(&self) -> UVec2 {
        self.end().saturating_sub(UVec2::ONE)
    }

    fn overlaps(&self, other: &Self) -> bool {
        let a_end = self.end();
        let b_end = other.end();
        self.offset.x < b_end.x
            && other.offset.x < a_end.x
            && self.offset.y < b_end.y
            && other.offset.y < a_end.y
    }
}

/// Placement of every depth-pyramid level inside a single atlas image.
///
/// Level 0 covers the full source region. Each following level is the
/// round-up half of its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MipChainLayout {
    levels: Vec<MipRect>,
}

impl MipChainLayout {
    pub fn new(levels: Vec<MipRect>) -> Self {
        Self { levels }
    }

    /// Standard packing down to 1x1: level 1 sits below level 0, then levels
    /// alternate between "right of" (even) and "below" (odd) their
    /// predecessor.
    pub fn packed(base: UVec2) -> Self {
        let base = base.max(UVec2::ONE);
        let mut levels = vec![MipRect {
            offset: UVec2::ZERO,
            size: base,
        }];

        let mut mip = 0u32;
        let mut size = base;
        while size.x > 1 || size.y > 1 {
            mip += 1;
            size = mip_extent(base, mip);

            let prev = levels[levels.len() - 1];
            let offset = if mip & 1 == 1 {
                UVec2::new(prev.offset.x, prev.end().y)
            } else {
                UVec2::new(prev.end().x, prev.offset.y)
            };
            levels.push(MipRect { offset, size });
        }

        Self { levels }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, i: usize) -> Option<&MipRect> {
        self.levels.get(i)
    }

    pub fn levels(&self) -> &[MipRect] {
        &self.levels
    }

    /// Smallest extent that holds every level.
    pub fn atlas_size(&self) -> UVec2 {
        self.levels
            .iter()
            .fold(UVec2::ZERO, |acc, rect| acc.max(rect.end()))
    }

    /// Checks the chain invariants. Builders do not call this; it exists for
    /// callers that assemble layouts by hand.
    pub fn validate(&self) -> Result<(), Error> {
        let Some(first) = self.levels.first() else {
            return Err(Error::InvalidLayout("no levels".into()));
        };
        if first.size.x == 0 || first.size.y == 0 {
            return Err(Error::InvalidLayout("level 0 has zero extent".into()));
        }

        for (i, rect) in self.levels.iter().enumerate() {
            if rect.checked_end().is_none() {
                return Err(Error::InvalidLayout(format!(
                    "level {i} extends past the addressable range"
                )));
            }
            if i == 0 {
                continue;
            }
            let expected = mip_extent(first.size, i as u32);
            if rect.size != expected {
                return Err(Error::InvalidLayout(format!(
                    "level {i} is {}x{}, expected {}x{}",
                    rect.size.x, rect.size.y, expected.x, expected.y
                )));
            }
        }

        for (i, a) in self.levels.iter().enumerate() {
            for (j, b) in self.levels.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(Error::InvalidLayout(format!(
                        "levels {i} and {j} overlap"
                    )));
                }
            }
        }

        Ok(())
    }
}
