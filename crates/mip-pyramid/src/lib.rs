//! Umbrella crate for the `mip-pyramid` workspace.
//!
//! Re-exports the texture model from `mp-core` and the pyramid builders,
//! command recording and CPU device from `mp-pyr`.

pub use mp_core::*;
pub use mp_pyr::*;
