//! Host-block layout probing
//!
//! The one invariant everything else leans on: the byte offsets the layout
//! calculator hands the host must equal the offsets the WGSL compiler
//! assigns to the generated `GameEngineHost` struct. The probe checks it
//! end to end — a synthetic game goes through the real preprocessor, its
//! `update` entry point writes a distinct sentinel into every host-block
//! field, and the CPU reads the buffer back and compares each sentinel at
//! the offset the calculator predicted.

use crate::wgpu_helpers;
use std::collections::HashMap;
use std::fmt::Write as _;
use wgslbox::bindings::BindingPlan;
use wgslbox_dialect::keys::{KEY_COUNT, OSC_SLOT_COUNT};
use wgslbox_dialect::layout::{self, FieldType, StateLayout};
use wgslbox_dialect::{GameManifest, GameSource, Preprocessor};

/// One sentinel: where it must land and which bytes it must be
#[derive(Debug)]
pub struct Expectation {
    /// Human-readable field description for mismatch reports
    pub label: String,
    /// Absolute byte offset in the host block
    pub offset: usize,
    /// Expected little-endian bytes
    pub bytes: Vec<u8>,
}

/// A compiled probe: the manifest plus every expected sentinel
pub struct LayoutProbe {
    /// Manifest produced by the real preprocessor
    pub manifest: GameManifest,
    /// Sentinels in ascending offset order
    pub expectations: Vec<Expectation>,
}

impl LayoutProbe {
    /// Builds a probe for a GameState body (or none) and a sound count
    pub fn build(state_body: Option<&str>, sound_count: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let state = match state_body {
            Some(body) => StateLayout::parse(body)?,
            None => StateLayout::sentinel(),
        };

        let mut game = String::new();
        if let Some(body) = state_body {
            let _ = writeln!(game, "struct GameState {{ {body} }}");
        }

        let mut expectations = Vec::new();
        let _ = writeln!(game, "@compute @workgroup_size(1) fn update() {{");

        // Register the requested number of sounds; the bare form is an
        // expression, so a read is enough to claim the counter slots.
        for index in 0..sound_count {
            let _ = writeln!(game, "    let _claimed{index} = @sound(\"probe{index}.ogg\");");
        }

        // Volatile prefix sentinels.
        push_write(&mut game, &mut expectations, "@engine.buttons[0]", FieldType::I32, layout::BUTTONS_OFFSET, 1001);
        push_write(&mut game, &mut expectations, "@engine.buttons[11]", FieldType::I32, layout::BUTTONS_OFFSET + 44, 1012);
        push_write(&mut game, &mut expectations, "@engine.time", FieldType::F32, layout::TIME_OFFSET, 111);
        push_write(&mut game, &mut expectations, "@engine.delta_time", FieldType::F32, layout::DELTA_TIME_OFFSET, 112);
        push_write(&mut game, &mut expectations, "@engine.screen_width", FieldType::F32, layout::SCREEN_WIDTH_OFFSET, 113);
        push_write(&mut game, &mut expectations, "@engine.screen_height", FieldType::F32, layout::SCREEN_HEIGHT_OFFSET, 114);
        push_write(&mut game, &mut expectations, "@engine.mouse", FieldType::Vec4f, layout::MOUSE_OFFSET, 120);

        // One sentinel per state field; arrays get their first and last
        // element so the stride is checked too.
        for (index, field) in state.fields.iter().enumerate() {
            let seed = 200 + index as u32 * 10;
            let base = layout::STATE_OFFSET + field.offset;
            match field.count {
                None => push_write(&mut game, &mut expectations, &format!("@engine.state.{}", field.name), field.ty, base, seed),
                Some(count) => {
                    push_write(&mut game, &mut expectations, &format!("@engine.state.{}[0]", field.name), field.ty, base, seed);
                    if count > 1 {
                        let last = count as usize - 1;
                        push_write(
                            &mut game,
                            &mut expectations,
                            &format!("@engine.state.{}[{last}]", field.name),
                            field.ty,
                            base + field.ty.array_stride() * last,
                            seed + 1,
                        );
                    }
                }
            }
        }

        let host = layout::HostLayout::new(state.padded_size, sound_count);
        for index in 0..sound_count {
            push_write(
                &mut game,
                &mut expectations,
                &format!("@engine.audio[{index}]"),
                FieldType::U32,
                host.audio_offset + 4 * index,
                3000 + index as u32,
            );
        }

        push_write(&mut game, &mut expectations, "@engine.osc[0]", FieldType::F32, host.osc_offset, 130);
        push_write(
            &mut game,
            &mut expectations,
            &format!("@engine.osc[{}]", OSC_SLOT_COUNT - 1),
            FieldType::F32,
            host.osc_offset + 4 * (OSC_SLOT_COUNT - 1),
            131,
        );
        push_write(&mut game, &mut expectations, "@engine.keys[0]", FieldType::U32, host.keys_offset, 140);
        push_write(
            &mut game,
            &mut expectations,
            &format!("@engine.keys[{}]", KEY_COUNT - 1),
            FieldType::U32,
            host.keys_offset + 4 * (KEY_COUNT - 1),
            141,
        );

        game.push_str("}\n");

        // A probe is still a complete game; give it the render entries.
        game.push_str(
            "@vertex fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4f {\n    return vec4f(0.0, 0.0, 0.0, 1.0);\n}\n",
        );
        game.push_str("@fragment fn fs_render() -> @location(0) vec4f {\n    return vec4f(@engine.time, 0.0, 0.0, 1.0);\n}\n");

        let mut files = HashMap::new();
        files.insert("main.wgsl".to_string(), game.clone().into_bytes());
        let source = GameSource::Archive(files);
        let mut preprocessor = Preprocessor::new(&source);
        preprocessor.mark_imported("main.wgsl");
        let manifest = preprocessor.preprocess(&game)?;

        // Internal consistency: the manifest must agree with the layout the
        // expectations were derived from.
        if manifest.game_state_size != state.padded_size {
            return Err(format!("manifest state size {} != calculator state size {}", manifest.game_state_size, state.padded_size).into());
        }
        if manifest.sounds.len() != sound_count {
            return Err(format!("manifest registered {} sounds, expected {sound_count}", manifest.sounds.len()).into());
        }

        Ok(Self { manifest, expectations })
    }

    /// Runs the probe's `update` once and compares every sentinel
    ///
    /// Returns the list of mismatches; empty means the layouts agree.
    pub fn run(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let host_layout = self.manifest.host_layout();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Layout Probe Shader"),
            source: wgpu::ShaderSource::Wgsl(self.manifest.generated_wgsl.clone().into()),
        });

        let plan = BindingPlan::for_manifest(&self.manifest);
        let layouts = plan.create_layouts(device);

        let host_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Probe Host Block"),
            size: host_layout.total_size as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Probe Sampler"),
            ..Default::default()
        });
        let bind_group0 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Probe Bind Group 0"),
            layout: &layouts.group0,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&sampler),
            }],
        });
        let bind_group1 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Probe Bind Group 1"),
            layout: &layouts.group1,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: host_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Probe Pipeline Layout"),
            bind_group_layouts: &[&layouts.group0, &layouts.group1],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Probe Update Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("update"),
            compilation_options: Default::default(),
            cache: None,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Probe Encoder") });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Probe Update Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group0, &[]);
            pass.set_bind_group(1, &bind_group1, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = wgpu_helpers::read_buffer(device, queue, &host_buffer, host_layout.total_size as u64)?;

        let mut mismatches = Vec::new();
        for expectation in &self.expectations {
            let got = &bytes[expectation.offset..expectation.offset + expectation.bytes.len()];
            if got != expectation.bytes {
                mismatches.push(format!(
                    "{} at offset {}: expected {:02x?}, got {:02x?}",
                    expectation.label, expectation.offset, expectation.bytes, got
                ));
            }
        }
        Ok(mismatches)
    }
}

/// Emits one sentinel write into the probe source and records its bytes
fn push_write(game: &mut String, expectations: &mut Vec<Expectation>, target: &str, ty: FieldType, offset: usize, seed: u32) {
    let (literal, bytes) = sentinel_for(ty, seed);
    let _ = writeln!(game, "    {target} = {literal};");
    expectations.push(Expectation {
        label: target.to_string(),
        offset,
        bytes,
    });
}

/// Produces a WGSL literal and its little-endian bytes for a field type
fn sentinel_for(ty: FieldType, seed: u32) -> (String, Vec<u8>) {
    match ty {
        FieldType::U32 => (format!("{seed}u"), seed.to_le_bytes().to_vec()),
        FieldType::I32 => {
            let value = -(seed as i32);
            (format!("{value}"), value.to_le_bytes().to_vec())
        }
        FieldType::F32 => {
            let value = seed as f32 + 0.5;
            (format!("{value:.1}"), value.to_le_bytes().to_vec())
        }
        FieldType::Vec2f => {
            let values = [seed as f32 + 0.5, seed as f32 + 1.5];
            (
                format!("vec2f({:.1}, {:.1})", values[0], values[1]),
                values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            )
        }
        FieldType::Vec3f => {
            let values = [seed as f32 + 0.5, seed as f32 + 1.5, seed as f32 + 2.5];
            (
                format!("vec3f({:.1}, {:.1}, {:.1})", values[0], values[1], values[2]),
                values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            )
        }
        FieldType::Vec4f => {
            let values = [seed as f32 + 0.5, seed as f32 + 1.5, seed as f32 + 2.5, seed as f32 + 3.5];
            (
                format!("vec4f({:.1}, {:.1}, {:.1}, {:.1})", values[0], values[1], values[2], values[3]),
                values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_source_compiles_through_preprocessor() {
        let probe = LayoutProbe::build(Some("player_pos: vec2f, player_vel: vec2f, at_edge: u32"), 1).unwrap();
        assert_eq!(probe.manifest.game_state_size, 24);
        assert!(probe.manifest.generated_wgsl.contains("_engine.state.player_pos"));
        assert!(probe.manifest.generated_wgsl.contains("_engine.time = 111.5;"));
        assert!(probe.manifest.generated_wgsl.contains("let _claimed0 = _engine.audio[0];"));
    }

    #[test]
    fn test_expectation_offsets_for_bob_state() {
        let probe = LayoutProbe::build(Some("player_pos: vec2f, player_vel: vec2f, at_edge: u32"), 1).unwrap();

        let find = |label: &str| probe.expectations.iter().find(|e| e.label == label).map(|e| e.offset);
        assert_eq!(find("@engine.state.player_pos"), Some(80));
        assert_eq!(find("@engine.state.player_vel"), Some(88));
        assert_eq!(find("@engine.state.at_edge"), Some(96));
        assert_eq!(find("@engine.audio[0]"), Some(104));
        assert_eq!(find("@engine.osc[0]"), Some(108));
        assert_eq!(find("@engine.keys[0]"), Some(364));
    }

    #[test]
    fn test_array_expectations_check_stride() {
        let probe = LayoutProbe::build(Some("snake_x: array<i32, 400>"), 0).unwrap();
        let find = |label: &str| probe.expectations.iter().find(|e| e.label == label).map(|e| e.offset);
        assert_eq!(find("@engine.state.snake_x[0]"), Some(80));
        assert_eq!(find("@engine.state.snake_x[399]"), Some(80 + 399 * 4));
    }

    #[test]
    fn test_probe_without_state() {
        let probe = LayoutProbe::build(None, 0).unwrap();
        assert_eq!(probe.manifest.game_state_size, 16);
        let find = |label: &str| probe.expectations.iter().find(|e| e.label == label).map(|e| e.offset);
        assert_eq!(find("@engine.osc[0]"), Some(96));
    }
}
