//! The program manifest
//!
//! The preprocessor's structured output: everything the host needs to
//! allocate GPU resources and agree with the generated shader about
//! bindings and byte offsets. Binding numbers are a pure function of the
//! ordered asset lists, so the same game always gets the same plan.

use crate::layout::HostLayout;
use serde::Serialize;

/// Compiled description of one game
#[derive(Debug, Clone, Serialize)]
pub struct GameManifest {
    /// Window title from `@set_title`, or the default
    pub title: String,
    /// Framebuffer width from `@set_size`, or 800
    pub width: u32,
    /// Framebuffer height from `@set_size`, or 600
    pub height: u32,
    /// Static texture paths; position is the texture's slot index
    pub textures: Vec<String>,
    /// Video asset paths, bound after the static textures
    pub videos: Vec<String>,
    /// Camera device indices (sorted), bound after the videos
    pub cameras: Vec<u32>,
    /// Sound asset paths; position is the audio counter index
    pub sounds: Vec<String>,
    /// OBJ model paths; model `i` owns group 2 bindings `1+2i` and `2+2i`
    pub models: Vec<String>,
    /// OSC parameter names; position is the slot index
    pub osc_params: Vec<String>,
    /// Bytes reserved for the user state in the host block (>= 16)
    pub game_state_size: usize,
    /// Alignment of the user state struct (4, 8 or 16)
    pub game_state_alignment: usize,
    /// The rewritten, standard-WGSL shader source
    pub generated_wgsl: String,
}

impl GameManifest {
    /// Group 0 binding index of static texture `i`
    ///
    /// Binding 0 is always the sampler, so user textures start at 1.
    pub fn texture_binding(&self, index: usize) -> u32 {
        1 + index as u32
    }

    /// Group 0 binding index of video texture `i`
    pub fn video_binding(&self, index: usize) -> u32 {
        1 + (self.textures.len() + index) as u32
    }

    /// Group 0 binding index of camera texture `i`
    pub fn camera_binding(&self, index: usize) -> u32 {
        1 + (self.textures.len() + self.videos.len() + index) as u32
    }

    /// Total number of group 0 bindings, sampler included
    pub fn group0_binding_count(&self) -> usize {
        1 + self.textures.len() + self.videos.len() + self.cameras.len()
    }

    /// Region offsets of the host block this manifest implies
    pub fn host_layout(&self) -> HostLayout {
        HostLayout::new(self.game_state_size, self.sounds.len())
    }
}
