//! wgslbox engine host
//!
//! Runs games written as a single WGSL file (plus optional assets): the
//! dialect preprocessor's manifest becomes GPU textures, model buffers and
//! the shared host block, and the frame scheduler drives one compute pass
//! and one render pass per frame while shuttling input, OSC parameters,
//! audio triggers and dynamic texture frames between the OS and the shader.
//!
//! The crate is windowing-agnostic: an embedder owns the surface and the
//! event loop, feeds [`input::InputState`] and calls [`Engine::frame`] with
//! a target view. See `examples/player` for a complete winit-based host.

pub mod assets;
pub mod bindings;
pub mod engine;
pub mod error;
pub mod frames;
pub mod host_block;
pub mod input;
pub mod osc;

pub use engine::{Engine, FrameProviders, DEBUG_SHADER_ENV, DEPTH_FORMAT};
pub use error::EngineError;
pub use frames::{FrameSource, PlaybackCommand, PlaybackStatus, VideoFrame};
pub use input::{InputSnapshot, InputState};
pub use osc::{osc_channel, OscBank, OscQueue, OscSender};

pub use wgslbox_dialect as dialect;
pub use wgslbox_dialect::{GameBundle, GameManifest, GameSource};
