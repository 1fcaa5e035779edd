use log::trace;
use mp_core::{Error, Image, Ownership, Texel, Texture, TextureDesc};
use slotmap::{SlotMap, new_key_type};

use crate::command::{Command, CommandBuffer};
use crate::exec;

new_key_type! {
    /// Generational texture handle; stale after [`Device::destroy_texture`].
    pub struct TextureId;
}

/// Counters for one [`Device::submit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub copies: usize,
    pub draws: usize,
    pub dispatches: usize,
    pub thread_groups: u64,
    pub samples: usize,
}

/// CPU stand-in for the host graphics device.
///
/// Owns every texture and executes recorded command buffers in FIFO order.
#[derive(Debug, Default)]
pub struct Device {
    textures: SlotMap<TextureId, Texture>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureId, Error> {
        self.insert(desc, Ownership::Caller)
    }

    pub(crate) fn create_pool_texture(&mut self, desc: TextureDesc) -> Result<TextureId, Error> {
        self.insert(desc, Ownership::Pool)
    }

    fn insert(&mut self, desc: TextureDesc, ownership: Ownership) -> Result<TextureId, Error> {
        let texture = Texture::new(desc, ownership)?;
        Ok(self.textures.insert(texture))
    }

    pub fn destroy_texture(&mut self, id: TextureId) -> Result<(), Error> {
        self.textures
            .remove(id)
            .map(|_| ())
            .ok_or(Error::UnknownTexture)
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture, Error> {
        self.textures.get(id).ok_or(Error::UnknownTexture)
    }

    pub(crate) fn texture_mut(&mut self, id: TextureId) -> Result<&mut Texture, Error> {
        self.textures.get_mut(id).ok_or(Error::UnknownTexture)
    }

    pub fn desc(&self, id: TextureId) -> Result<&TextureDesc, Error> {
        self.texture(id).map(Texture::desc)
    }

    pub fn read(&self, id: TextureId, mip: u32, slice: u32) -> Result<&Image<Texel>, Error> {
        self.texture(id)?.level(mip, slice)
    }

    /// Uploads one subresource; texels are quantized to the texture format.
    pub fn write(
        &mut self,
        id: TextureId,
        mip: u32,
        slice: u32,
        image: &Image<Texel>,
    ) -> Result<(), Error> {
        self.texture_mut(id)?.upload(mip, slice, image)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Executes every command of `cmd` in order.
    ///
    /// Commands before a failing one have already run; there is no rollback.
    pub fn submit(&mut self, cmd: CommandBuffer) -> Result<SubmitReport, Error> {
        let label = cmd.label().to_owned();
        let mut report = SubmitReport::default();
        let mut scopes: Vec<&'static str> = Vec::new();

        for command in cmd.into_commands() {
            match command {
                Command::BeginSample(name) => {
                    trace!("[{label}] begin {name}");
                    scopes.push(name);
                    report.samples += 1;
                }
                Command::EndSample => {
                    if let Some(name) = scopes.pop() {
                        trace!("[{label}] end {name}");
                    }
                }
                Command::Copy {
                    src,
                    dst,
                    extent,
                    slices,
                } => {
                    exec::copy(self, src, dst, extent, slices)?;
                    report.copies += 1;
                }
                Command::Draw(draw) => {
                    exec::draw(self, &draw)?;
                    report.draws += 1;
                }
                Command::Dispatch(dispatch) => {
                    exec::dispatch(self, &dispatch)?;
                    report.dispatches += 1;
                    report.thread_groups += u64::from(dispatch.groups.x)
                        * u64::from(dispatch.groups.y)
                        * u64::from(dispatch.groups.z);
                }
            }
        }

        Ok(report)
    }
}
