//! The host block
//!
//! One storage buffer shared between the host and every shader stage. The
//! CPU side writes three regions between frames — the volatile prefix
//! (buttons, timing, mouse), the OSC slots and the raw key state — and
//! resets the audio counters after reading them back. All offsets come from
//! [`HostLayout`]; nothing here may invent its own.

use crate::input::InputSnapshot;
use wgpu::util::DeviceExt;
use wgslbox_dialect::keys::{KEY_COUNT, OSC_SLOT_COUNT};
use wgslbox_dialect::layout::{self, HostLayout};
use wgslbox_dialect::GameManifest;

/// The shared storage buffer plus its resolved layout
pub struct HostBlock {
    /// Region offsets for this game
    pub layout: HostLayout,
    /// The GPU buffer
    pub buffer: wgpu::Buffer,
}

impl HostBlock {
    /// Creates the buffer with its initial contents
    pub fn new(device: &wgpu::Device, manifest: &GameManifest) -> Self {
        let layout = manifest.host_layout();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Host Block"),
            contents: &Self::initial_contents(manifest),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        });
        Self { layout, buffer }
    }

    /// Initial buffer contents: zeros, plus the screen-center convenience
    ///
    /// The first two state floats are seeded with the framebuffer center so
    /// a player-position shader shows something sensible on frame one.
    /// Well-written games initialize their own state and never rely on it.
    pub fn initial_contents(manifest: &GameManifest) -> Vec<u8> {
        let layout = manifest.host_layout();
        let mut contents = vec![0u8; layout.total_size];

        let center_x = (manifest.width as f32 / 2.0).to_le_bytes();
        let center_y = (manifest.height as f32 / 2.0).to_le_bytes();
        contents[layout::STATE_OFFSET..layout::STATE_OFFSET + 4].copy_from_slice(&center_x);
        contents[layout::STATE_OFFSET + 4..layout::STATE_OFFSET + 8].copy_from_slice(&center_y);

        contents
    }

    /// Uploads the volatile prefix in one write
    pub fn write_prefix(&self, queue: &wgpu::Queue, snapshot: &InputSnapshot, time: f32, delta_time: f32, width: f32, height: f32) {
        let mut prefix = [0u8; layout::PREFIX_SIZE];
        prefix[..48].copy_from_slice(bytemuck::cast_slice(&snapshot.buttons));
        prefix[layout::TIME_OFFSET..layout::TIME_OFFSET + 4].copy_from_slice(&time.to_le_bytes());
        prefix[layout::DELTA_TIME_OFFSET..layout::DELTA_TIME_OFFSET + 4].copy_from_slice(&delta_time.to_le_bytes());
        prefix[layout::SCREEN_WIDTH_OFFSET..layout::SCREEN_WIDTH_OFFSET + 4].copy_from_slice(&width.to_le_bytes());
        prefix[layout::SCREEN_HEIGHT_OFFSET..layout::SCREEN_HEIGHT_OFFSET + 4].copy_from_slice(&height.to_le_bytes());
        prefix[layout::MOUSE_OFFSET..layout::MOUSE_OFFSET + 16].copy_from_slice(bytemuck::cast_slice(&snapshot.mouse));

        queue.write_buffer(&self.buffer, 0, &prefix);
    }

    /// Uploads the OSC slot region
    pub fn write_osc(&self, queue: &wgpu::Queue, values: &[f32; OSC_SLOT_COUNT]) {
        queue.write_buffer(&self.buffer, self.layout.osc_offset as u64, bytemuck::cast_slice(values));
    }

    /// Uploads the raw key state region
    pub fn write_keys(&self, queue: &wgpu::Queue, keys: &[u32; KEY_COUNT]) {
        queue.write_buffer(&self.buffer, self.layout.keys_offset as u64, bytemuck::cast_slice(keys));
    }

    /// Zeros the audio counter region
    ///
    /// Called after a readback so each trigger fires once.
    pub fn reset_audio(&self, queue: &wgpu::Queue) {
        if self.layout.sound_count > 0 {
            queue.write_buffer(&self.buffer, self.layout.audio_offset as u64, &vec![0u8; self.layout.audio_size()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(state_size: usize, sounds: usize) -> GameManifest {
        GameManifest {
            title: "t".to_string(),
            width: 800,
            height: 600,
            textures: Vec::new(),
            videos: Vec::new(),
            cameras: Vec::new(),
            sounds: (0..sounds).map(|i| format!("s{i}.ogg")).collect(),
            models: Vec::new(),
            osc_params: Vec::new(),
            game_state_size: state_size,
            game_state_alignment: 4,
            generated_wgsl: String::new(),
        }
    }

    #[test]
    fn test_initial_contents_length_matches_layout() {
        let m = manifest(24, 1);
        let contents = HostBlock::initial_contents(&m);
        assert_eq!(contents.len(), m.host_layout().total_size);
        assert_eq!(contents.len() % 16, 0);
    }

    #[test]
    fn test_initial_contents_seed_screen_center() {
        let contents = HostBlock::initial_contents(&manifest(16, 0));
        let x = f32::from_le_bytes(contents[80..84].try_into().unwrap());
        let y = f32::from_le_bytes(contents[84..88].try_into().unwrap());
        assert_eq!(x, 400.0);
        assert_eq!(y, 300.0);
    }

    #[test]
    fn test_prefix_region_is_exactly_eighty_bytes() {
        // The prefix write must stop where the state begins.
        assert_eq!(layout::PREFIX_SIZE, 80);
        assert_eq!(layout::MOUSE_OFFSET + 16, layout::STATE_OFFSET);
    }
}
