use glam::UVec2;
use log::{debug, warn};
use mp_core::{Error, TextureDesc, TextureFormat, TextureUsage, mip_extent};

use crate::device::{Device, TextureId};

/// The two scratch images a color pyramid needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchSlot {
    /// Target of the per-level downsample.
    Downsample,
    /// Output of the horizontal blur, input of the vertical blur.
    BlurIntermediate,
}

impl ScratchSlot {
    fn label(self) -> &'static str {
        match self {
            Self::Downsample => "Temporary Downsampled Pyramid",
            Self::BlurIntermediate => "Temp Gaussian Pyramid Target",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScratchEntry {
    slot: ScratchSlot,
    format: TextureFormat,
    slices: u32,
    size: UVec2,
    id: TextureId,
}

/// Half-resolution scratch textures reused across frames.
///
/// Each slot holds one live image. Its size tracks the largest viewport seen
/// so far, so a smaller frame reuses the existing allocation. A larger
/// viewport, or a new format or slice count, replaces it. The replaced image
/// may still be referenced by commands recorded earlier in the same frame, so
/// it is retired instead of destroyed and freed by [`ScratchPool::collect`]
/// once that frame has been submitted.
#[derive(Debug, Default)]
pub struct ScratchPool {
    entries: Vec<ScratchEntry>,
    retired: Vec<TextureId>,
    reference: UVec2,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_scratch(
        &mut self,
        device: &mut Device,
        slot: ScratchSlot,
        format: TextureFormat,
        slices: u32,
        viewport: UVec2,
    ) -> Result<TextureId, Error> {
        self.reference = self.reference.max(viewport);
        let needed = mip_extent(self.reference, 1);

        if let Some(pos) = self.entries.iter().position(|e| e.slot == slot) {
            let entry = self.entries[pos];
            let alive = device.texture(entry.id).is_ok();
            if alive
                && entry.format == format
                && entry.slices == slices
                && entry.size.cmpge(needed).all()
            {
                return Ok(entry.id);
            }

            warn!(
                "recreating {:?} scratch: {}x{}x{} {:?} -> {}x{}x{} {:?}",
                slot,
                entry.size.x,
                entry.size.y,
                entry.slices,
                entry.format,
                needed.x,
                needed.y,
                slices,
                format
            );
            if alive {
                self.retired.push(entry.id);
            }
            self.entries.swap_remove(pos);
        }

        let desc = TextureDesc::new_2d(
            slot.label(),
            needed.x,
            needed.y,
            format,
            TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::RENDER_TARGET,
        )
        .with_slices(slices);
        let id = device.create_pool_texture(desc)?;
        debug!(
            "allocated {:?} scratch {}x{}x{} {:?}",
            slot, needed.x, needed.y, slices, format
        );

        self.entries.push(ScratchEntry {
            slot,
            format,
            slices,
            size: needed,
            id,
        });
        Ok(id)
    }

    /// Destroys scratch images replaced since the last collection.
    ///
    /// Call after the command buffers recorded against them were submitted.
    pub fn collect(&mut self, device: &mut Device) {
        if !self.retired.is_empty() {
            debug!("destroying {} retired scratch texture(s)", self.retired.len());
        }
        for id in self.retired.drain(..) {
            let _ = device.destroy_texture(id);
        }
    }

    /// Destroys every scratch texture, retired ones included. The pool can be
    /// reused afterwards.
    pub fn release(&mut self, device: &mut Device) {
        self.collect(device);
        for entry in self.entries.drain(..) {
            // Already gone if the device was torn down out of order.
            let _ = device.destroy_texture(entry.id);
        }
        self.reference = UVec2::ZERO;
    }

    /// Live scratch images, one per slot at most.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaced images waiting for [`ScratchPool::collect`].
    pub fn retired(&self) -> usize {
        self.retired.len()
    }

    /// Largest viewport the scratch images are sized for.
    pub fn reference_size(&self) -> UVec2 {
        self.reference
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;
    use mp_core::{Ownership, TextureFormat};

    use crate::device::Device;
    use crate::pool::{ScratchPool, ScratchSlot};

    #[test]
    fn scratch_is_reused_across_frames() {
        let mut device = Device::new();
        let mut pool = ScratchPool::new();

        let a = pool
            .acquire_scratch(
                &mut device,
                ScratchSlot::Downsample,
                TextureFormat::Rgba16Float,
                1,
                UVec2::new(64, 48),
            )
            .expect("scratch");
        let desc = device.desc(a).expect("live");
        assert_eq!((desc.width, desc.height), (32, 24));
        assert_eq!(
            device.texture(a).expect("live").ownership(),
            Ownership::Pool
        );

        let b = pool
            .acquire_scratch(
                &mut device,
                ScratchSlot::Downsample,
                TextureFormat::Rgba16Float,
                1,
                UVec2::new(33, 17),
            )
            .expect("scratch");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.reference_size(), UVec2::new(64, 48));
    }

    #[test]
    fn larger_viewport_retires_the_old_image_until_collect() {
        let mut device = Device::new();
        let mut pool = ScratchPool::new();

        let small = pool
            .acquire_scratch(
                &mut device,
                ScratchSlot::BlurIntermediate,
                TextureFormat::Rgba16Float,
                1,
                UVec2::new(16, 16),
            )
            .expect("scratch");
        let large = pool
            .acquire_scratch(
                &mut device,
                ScratchSlot::BlurIntermediate,
                TextureFormat::Rgba16Float,
                1,
                UVec2::new(17, 40),
            )
            .expect("scratch");

        assert_ne!(small, large);
        assert!(device.texture(small).is_ok());
        assert_eq!((pool.len(), pool.retired()), (1, 1));
        let desc = device.desc(large).expect("live");
        assert_eq!((desc.width, desc.height), (9, 20));

        pool.collect(&mut device);
        assert!(device.texture(small).is_err());
        assert_eq!(pool.retired(), 0);
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn format_change_replaces_the_slot_image() {
        let mut device = Device::new();
        let mut pool = ScratchPool::new();
        let size = UVec2::new(32, 32);

        let half = pool
            .acquire_scratch(&mut device, ScratchSlot::Downsample, TextureFormat::Rgba16Float, 1, size)
            .expect("scratch");
        let full = pool
            .acquire_scratch(&mut device, ScratchSlot::Downsample, TextureFormat::Rgba32Float, 1, size)
            .expect("scratch");
        let layered = pool
            .acquire_scratch(&mut device, ScratchSlot::Downsample, TextureFormat::Rgba32Float, 3, size)
            .expect("scratch");

        assert!(half != full && full != layered);
        assert_eq!((pool.len(), pool.retired()), (1, 2));
        assert_eq!(device.desc(layered).expect("live").slices, 3);

        pool.release(&mut device);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(pool.retired(), 0);
    }

    #[test]
    fn slots_are_separate_and_release_destroys_all() {
        let mut device = Device::new();
        let mut pool = ScratchPool::new();
        let size = UVec2::new(32, 32);

        for slot in [ScratchSlot::Downsample, ScratchSlot::BlurIntermediate] {
            pool.acquire_scratch(&mut device, slot, TextureFormat::Rgba16Float, 2, size)
                .expect("scratch");
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(device.live_textures(), 2);

        pool.release(&mut device);
        assert!(pool.is_empty());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(pool.reference_size(), UVec2::ZERO);
    }
}
