//! Asset loading
//!
//! Everything a manifest references gets decoded here, once, at load time:
//! images become RGBA8 textures, OBJ text becomes flat position/normal
//! storage data, and sounds are decode-checked and kept as raw bytes for
//! per-trigger playback.

pub mod audio;
pub mod obj;
pub mod texture;
