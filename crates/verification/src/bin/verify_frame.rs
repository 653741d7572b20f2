//! End-to-end frame verification
//!
//! Loads a small game through the full engine (preprocessor, assets,
//! pipelines, host block) and runs real frames against an offscreen target:
//!
//! 1. with the right dpad button held, `update` must set
//!    `state.player_vel.x` to 200 and the CPU must read exactly that back;
//! 2. holding the A button must raise the game's audio trigger counter;
//! 3. after the host consumes the readback, the counter region must be
//!    zeroed again.
//!
//! Exits non-zero on the first failed check.

use std::collections::HashMap;
use wgslbox::{Engine, FrameProviders, GameBundle, GameSource, InputState};
use wgslbox_dialect::layout::STATE_OFFSET;
use wgslbox_verification::wgpu_helpers;

const GAME: &str = r#"
@set_title("Frame Probe")
@set_size(800, 600)

struct GameState {
    player_pos: vec2f,
    player_vel: vec2f,
    at_edge: u32,
}

@compute @workgroup_size(1)
fn update() {
    @engine.state.player_vel = vec2f(0.0, 0.0);
    if @engine.buttons[BTN_RIGHT] == 1 {
        @engine.state.player_vel.x = 200.0;
    }
    @engine.state.player_pos += @engine.state.player_vel * @engine.delta_time;
    if @engine.buttons[BTN_A] == 1 {
        @sound("blip.wav").play();
    }
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4f {
    var corners = array<vec2f, 3>(
        vec2f(-1.0, -1.0),
        vec2f(3.0, -1.0),
        vec2f(-1.0, 3.0),
    );
    return vec4f(corners[index], 0.0, 1.0);
}

@fragment
fn fs_render() -> @location(0) vec4f {
    let uv = @engine.state.player_pos / vec2f(@engine.screen_width, @engine.screen_height);
    return vec4f(uv, 0.0, 1.0);
}
"#;

/// A short 16-bit PCM mono WAV, enough for the decode check
fn wav_bytes() -> Vec<u8> {
    let rate: u32 = 8000;
    let count = (rate / 20) as usize;

    let mut data = Vec::with_capacity(44 + count * 2);
    data.extend_from_slice(b"RIFF");
    data.extend_from_slice(&(36 + count as u32 * 2).to_le_bytes());
    data.extend_from_slice(b"WAVE");
    data.extend_from_slice(b"fmt ");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes()); // PCM
    data.extend_from_slice(&1u16.to_le_bytes()); // mono
    data.extend_from_slice(&rate.to_le_bytes());
    data.extend_from_slice(&(rate * 2).to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes()); // block align
    data.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    data.extend_from_slice(b"data");
    data.extend_from_slice(&(count as u32 * 2).to_le_bytes());
    for i in 0..count {
        let sample = (8000.0 * (i as f32 * 0.35).sin()) as i16;
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (device, queue) = wgpu_helpers::create_headless_device()?;

    let mut files = HashMap::new();
    files.insert("main.wgsl".to_string(), GAME.as_bytes().to_vec());
    files.insert("blip.wav".to_string(), wav_bytes());
    let bundle = GameBundle {
        source: GameSource::Archive(files),
        entry: "main.wgsl".to_string(),
    };

    let mut engine = Engine::new(&device, &queue, wgpu::TextureFormat::Rgba8UnormSrgb, &bundle, FrameProviders::default())?;
    let layout = engine.host_layout();

    let target = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: 800,
                height: 600,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut input = InputState::new();
    let mut failures = 0usize;
    let mut check = |name: &str, ok: bool, detail: String| {
        if ok {
            println!("PASS {name}");
        } else {
            failures += 1;
            println!("FAIL {name}: {detail}");
        }
    };

    // Frame 1: right held. update must write the velocity this same frame.
    input.handle_key("ArrowRight", true);
    engine.frame(&target, &input.snapshot());
    device.poll(wgpu::PollType::Wait)?;

    let bytes = wgpu_helpers::read_buffer(&device, &queue, engine.host_buffer(), layout.total_size as u64)?;
    let vel_x = read_f32(&bytes, STATE_OFFSET + 8);
    check("velocity written by update", vel_x == 200.0, format!("vel.x = {vel_x}"));
    let pos_x = read_f32(&bytes, STATE_OFFSET);
    check("position seeded at screen center", pos_x >= 400.0, format!("pos.x = {pos_x}"));

    // Frame 2: A held. The shader increments its trigger counter.
    input.handle_key("ArrowRight", false);
    input.handle_key("KeyZ", true);
    engine.frame(&target, &input.snapshot());
    device.poll(wgpu::PollType::Wait)?;

    let bytes = wgpu_helpers::read_buffer(&device, &queue, engine.host_buffer(), layout.total_size as u64)?;
    let counter = read_u32(&bytes, layout.audio_offset);
    check("audio trigger counted", counter >= 1, format!("audio[0] = {counter}"));

    // Frame 3: A released. The host consumes the readback and zeros the
    // counter region before this frame's update runs.
    input.handle_key("KeyZ", false);
    engine.frame(&target, &input.snapshot());
    device.poll(wgpu::PollType::Wait)?;

    let bytes = wgpu_helpers::read_buffer(&device, &queue, engine.host_buffer(), layout.total_size as u64)?;
    let counter = read_u32(&bytes, layout.audio_offset);
    check("audio counter reset after read", counter == 0, format!("audio[0] = {counter}"));

    // Sanity on the fixed prefix: screen size must round-trip.
    let width = read_f32(&bytes, wgslbox_dialect::layout::SCREEN_WIDTH_OFFSET);
    check("screen width uploaded", width == 800.0, format!("screen_width = {width}"));

    if failures > 0 {
        println!("{failures} checks failed");
        std::process::exit(1);
    }
    println!("all checks passed");
    Ok(())
}
