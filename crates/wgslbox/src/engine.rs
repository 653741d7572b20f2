//! The engine host
//!
//! Owns every GPU resource a loaded game needs and drives the per-frame
//! schedule: input snapshot upload, one `update` compute dispatch, one
//! render pass, and the asynchronous audio trigger readback. All byte
//! offsets and binding numbers come from the manifest, so the shader and
//! the host always agree on where things live.
//!
//! Reload is a rebuild: drop the engine, construct a new one from the same
//! bundle. Nothing in here survives a reload on purpose.

use crate::assets::audio::AudioBank;
use crate::assets::obj;
use crate::assets::texture;
use crate::bindings::BindingPlan;
use crate::error::EngineError;
use crate::frames::{AnimationSource, FrameSource, PlaybackCommand, PlaybackStatus, StaticSource};
use crate::host_block::HostBlock;
use crate::input::InputSnapshot;
use crate::osc::{osc_channel, OscBank, OscQueue, OscSender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use wgslbox_dialect::{preprocess_game, GameBundle, GameManifest};

/// Delta time ceiling; keeps physics sane across debugger stops and stalls
const MAX_DELTA_TIME: f32 = 0.1;

/// Depth buffer format: 24-bit depth, no stencil
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Environment variable that dumps the generated WGSL and manifest to disk
pub const DEBUG_SHADER_ENV: &str = "WGSLBOX_DEBUG_SHADER";

// Audio readback states; only one mapping is ever in flight.
const READBACK_IDLE: u8 = 0;
const READBACK_PENDING: u8 = 1;
const READBACK_READY: u8 = 2;
const READBACK_FAILED: u8 = 3;

/// Embedder hooks for opening dynamic frame sources
///
/// The engine decodes GIF videos itself and has no camera capture; an
/// embedder that can demux MP4/WebM or open capture devices plugs in here.
/// Returning `None` falls back to the built-in behavior.
#[derive(Default)]
pub struct FrameProviders {
    /// Called with each video's path and bytes
    #[allow(clippy::type_complexity)]
    pub video: Option<Box<dyn FnMut(&str, &[u8]) -> Option<Box<dyn FrameSource>>>>,
    /// Called with each camera's device index
    #[allow(clippy::type_complexity)]
    pub camera: Option<Box<dyn FnMut(u32) -> Option<Box<dyn FrameSource>>>>,
}

/// A texture rewritten from a frame source as frames arrive
struct DynamicTexture {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
    source: Box<dyn FrameSource>,
}

/// Geometry buffers for one loaded model
struct GpuModel {
    positions: wgpu::Buffer,
    normals: wgpu::Buffer,
    vertex_count: u32,
}

/// A loaded game bound to a device, ready to produce frames
pub struct Engine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    manifest: GameManifest,

    host_block: HostBlock,
    compute_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,
    bind_group0: wgpu::BindGroup,
    bind_group1: wgpu::BindGroup,
    bind_group2: Option<wgpu::BindGroup>,

    // Kept alive for the bind groups that reference them.
    _static_textures: Vec<wgpu::Texture>,
    _models: Vec<GpuModel>,
    dynamic_textures: Vec<DynamicTexture>,
    draw_vertex_count: u32,

    audio: Option<AudioBank>,
    audio_staging: wgpu::Buffer,
    readback_state: Arc<AtomicU8>,

    osc_bank: OscBank,
    osc_queue: OscQueue,
    osc_sender: OscSender,

    depth_view: wgpu::TextureView,
    surface_size: (u32, u32),
    started: Instant,
    last_frame: Instant,
}

impl Engine {
    /// Loads a game bundle onto a device
    ///
    /// Preprocesses the dialect, validates the generated WGSL, decodes all
    /// referenced assets, and builds every pipeline and bind group. Any
    /// required asset that fails aborts the load with its path.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, surface_format: wgpu::TextureFormat, bundle: &GameBundle, mut providers: FrameProviders) -> Result<Self, EngineError> {
        let manifest = preprocess_game(bundle)?;
        maybe_dump_shader(&manifest);
        validate_wgsl(&manifest.generated_wgsl)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Game Shader"),
            source: wgpu::ShaderSource::Wgsl(manifest.generated_wgsl.clone().into()),
        });

        // Static textures, in slot order.
        let sampler = texture::create_engine_sampler(device);
        let mut static_textures = Vec::with_capacity(manifest.textures.len());
        for path in &manifest.textures {
            let bytes = bundle.source.read_bytes(path)?;
            static_textures.push(texture::load_texture(device, queue, &bytes, path)?);
        }

        // Dynamic textures: videos first, then cameras, matching the header.
        let mut dynamic_textures = Vec::new();
        for path in &manifest.videos {
            let source = open_video_source(bundle, path, &mut providers);
            dynamic_textures.push(DynamicTexture::new(device, source, &format!("video {path}")));
        }
        for &index in &manifest.cameras {
            let source = open_camera_source(index, &mut providers);
            dynamic_textures.push(DynamicTexture::new(device, source, &format!("camera {index}")));
        }

        // Models, expanded to flat position/normal buffers.
        let mut models = Vec::with_capacity(manifest.models.len());
        for path in &manifest.models {
            let text = bundle.source.read_text(path)?;
            let mesh = obj::parse_obj(&text).map_err(|e| EngineError::ObjParse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            tracing::info!("loaded model {path}: {} vertices", mesh.vertex_count());
            models.push(GpuModel {
                positions: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Model Positions {path}")),
                    contents: mesh.position_bytes(),
                    usage: wgpu::BufferUsages::STORAGE,
                }),
                normals: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Model Normals {path}")),
                    contents: mesh.normal_bytes(),
                    usage: wgpu::BufferUsages::STORAGE,
                }),
                vertex_count: mesh.vertex_count(),
            });
        }
        let draw_vertex_count = models.first().map_or(3, |model| model.vertex_count);

        // Sounds: decode-checked now, triggered from readbacks later.
        let audio = if manifest.sounds.is_empty() {
            None
        } else {
            let mut sounds = Vec::with_capacity(manifest.sounds.len());
            for path in &manifest.sounds {
                sounds.push((path.clone(), bundle.source.read_bytes(path)?));
            }
            Some(AudioBank::new(sounds)?)
        };

        let host_block = HostBlock::new(device, &manifest);
        let audio_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Audio Readback Buffer"),
            size: host_block.layout.audio_size().max(4) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Bind groups, in the fixed plan order.
        let plan = BindingPlan::for_manifest(&manifest);
        let layouts = plan.create_layouts(device);

        let static_views: Vec<wgpu::TextureView> = static_textures.iter().map(|t| t.create_view(&wgpu::TextureViewDescriptor::default())).collect();
        let dynamic_views: Vec<wgpu::TextureView> = dynamic_textures.iter().map(|t| t.texture.create_view(&wgpu::TextureViewDescriptor::default())).collect();

        let mut group0_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&sampler),
        }];
        for (offset, view) in static_views.iter().chain(dynamic_views.iter()).enumerate() {
            group0_entries.push(wgpu::BindGroupEntry {
                binding: 1 + offset as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        let bind_group0 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Textures Bind Group"),
            layout: &layouts.group0,
            entries: &group0_entries,
        });

        let bind_group1 = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Host Block Bind Group"),
            layout: &layouts.group1,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: host_block.buffer.as_entire_binding(),
            }],
        });

        let bind_group2 = layouts.group2.as_ref().map(|layout| {
            let mut entries = Vec::with_capacity(models.len() * 2);
            for (index, model) in models.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1 + index as u32 * 2,
                    resource: model.positions.as_entire_binding(),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: 2 + index as u32 * 2,
                    resource: model.normals.as_entire_binding(),
                });
            }
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Model Buffers Bind Group"),
                layout,
                entries: &entries,
            })
        });

        // Pipelines. Compute sees groups 0 and 1; render sees all present.
        let compute_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Compute Pipeline Layout"),
            bind_group_layouts: &[&layouts.group0, &layouts.group1],
            push_constant_ranges: &[],
        });
        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Update Pipeline"),
            layout: Some(&compute_layout),
            module: &shader,
            entry_point: Some("update"),
            compilation_options: Default::default(),
            cache: None,
        });

        let mut render_groups = vec![&layouts.group0, &layouts.group1];
        if let Some(group2) = &layouts.group2 {
            render_groups.push(group2);
        }
        let render_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &render_groups,
            push_constant_ranges: &[],
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_render"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(device, manifest.width, manifest.height);
        let (osc_sender, osc_queue) = osc_channel();
        let osc_bank = OscBank::new(manifest.osc_params.clone());
        let now = Instant::now();

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            surface_size: (manifest.width, manifest.height),
            manifest,
            host_block,
            compute_pipeline,
            render_pipeline,
            bind_group0,
            bind_group1,
            bind_group2,
            _static_textures: static_textures,
            _models: models,
            dynamic_textures,
            draw_vertex_count,
            audio,
            audio_staging,
            readback_state: Arc::new(AtomicU8::new(READBACK_IDLE)),
            osc_bank,
            osc_queue,
            osc_sender,
            depth_view,
            started: now,
            last_frame: now,
        })
    }

    /// The compiled manifest of the loaded game
    pub fn manifest(&self) -> &GameManifest {
        &self.manifest
    }

    /// The shared host storage buffer
    ///
    /// Exposed for tooling and verification readbacks; the engine stays the
    /// only writer between frames.
    pub fn host_buffer(&self) -> &wgpu::Buffer {
        &self.host_block.buffer
    }

    /// Region offsets of the loaded game's host block
    pub fn host_layout(&self) -> wgslbox_dialect::layout::HostLayout {
        self.host_block.layout
    }

    /// Tracks the framebuffer size; recreates the depth buffer to match
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.surface_size {
            return;
        }
        self.surface_size = (width, height);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// A cloneable handle for background OSC producers
    pub fn osc_sender(&self) -> OscSender {
        self.osc_sender.clone()
    }

    /// Applies one OSC update immediately (the embedder-facing control)
    pub fn set_osc(&mut self, address: &str, value: f32) -> bool {
        self.osc_bank.apply(address, value)
    }

    /// Sends a playback control to video `index` (manifest order)
    pub fn video_control(&mut self, index: usize, command: PlaybackCommand) -> bool {
        if index >= self.manifest.videos.len() {
            return false;
        }
        self.dynamic_textures[index].source.control(command);
        true
    }

    /// Queries playback status of video `index` (manifest order)
    pub fn video_status(&self, index: usize) -> Option<PlaybackStatus> {
        if index >= self.manifest.videos.len() {
            return None;
        }
        Some(self.dynamic_textures[index].source.status())
    }

    /// Runs one full frame into `target`
    ///
    /// Steps, in contract order: finish any completed audio readback, drain
    /// OSC, upload fresh dynamic frames, upload the host block regions,
    /// dispatch `update`, snapshot the audio counters, render, submit, and
    /// start the next readback if none is in flight.
    pub fn frame(&mut self, target: &wgpu::TextureView, input: &InputSnapshot) {
        let now = Instant::now();
        let delta_time = (now - self.last_frame).as_secs_f32().min(MAX_DELTA_TIME);
        self.last_frame = now;
        let time = (now - self.started).as_secs_f32();

        // Pump map callbacks queued by earlier frames, then act on them.
        let _ = self.device.poll(wgpu::PollType::Poll);
        self.finish_audio_readback();

        self.osc_bank.drain(&self.osc_queue);

        for dynamic in &mut self.dynamic_textures {
            if let Some(frame) = dynamic.source.poll_frame() {
                let expected = 4 * dynamic.width as usize * dynamic.height as usize;
                if frame.data.len() == expected {
                    texture::write_rgba(&self.queue, &dynamic.texture, dynamic.width, dynamic.height, &frame.data);
                } else {
                    tracing::warn!("dropping dynamic frame: {} bytes, texture needs {expected}", frame.data.len());
                }
            }
        }

        let (width, height) = self.surface_size;
        let snapshot_keys = &input.keys;
        self.host_block.write_prefix(&self.queue, input, time, delta_time, width as f32, height as f32);
        self.host_block.write_osc(&self.queue, self.osc_bank.values());
        self.host_block.write_keys(&self.queue, snapshot_keys);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Update Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.compute_pipeline);
            compute_pass.set_bind_group(0, &self.bind_group0, &[]);
            compute_pass.set_bind_group(1, &self.bind_group1, &[]);
            compute_pass.dispatch_workgroups(1, 1, 1);
        }

        // Snapshot the counters after update, before anything resets them.
        // Skipped while a mapping is pending; counters only grow, so a
        // trigger is delayed a frame at worst, never lost.
        let start_readback = self.host_block.layout.sound_count > 0 && self.readback_state.load(Ordering::Acquire) == READBACK_IDLE;
        if start_readback {
            encoder.copy_buffer_to_buffer(
                &self.host_block.buffer,
                self.host_block.layout.audio_offset as u64,
                &self.audio_staging,
                0,
                self.host_block.layout.audio_size() as u64,
            );
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.bind_group0, &[]);
            render_pass.set_bind_group(1, &self.bind_group1, &[]);
            if let Some(bind_group2) = &self.bind_group2 {
                render_pass.set_bind_group(2, bind_group2, &[]);
            }
            render_pass.draw(0..self.draw_vertex_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        if start_readback {
            self.readback_state.store(READBACK_PENDING, Ordering::Release);
            let state = self.readback_state.clone();
            self.audio_staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                state.store(if result.is_ok() { READBACK_READY } else { READBACK_FAILED }, Ordering::Release);
            });
        }
    }

    /// Consumes a completed audio readback: play triggers, zero counters
    fn finish_audio_readback(&mut self) {
        match self.readback_state.load(Ordering::Acquire) {
            READBACK_READY => {
                let counters: Vec<u32> = {
                    let view = self.audio_staging.slice(..).get_mapped_range();
                    bytemuck::cast_slice(&view[..self.host_block.layout.audio_size()]).to_vec()
                };
                self.audio_staging.unmap();
                self.readback_state.store(READBACK_IDLE, Ordering::Release);

                let mut any_triggered = false;
                for (index, &counter) in counters.iter().enumerate() {
                    if counter > 0 {
                        any_triggered = true;
                        if let Some(audio) = &self.audio {
                            audio.play(index);
                        }
                    }
                }
                if any_triggered {
                    self.host_block.reset_audio(&self.queue);
                }
            }
            READBACK_FAILED => {
                tracing::warn!("audio readback mapping failed, retrying next frame");
                self.readback_state.store(READBACK_IDLE, Ordering::Release);
            }
            _ => {}
        }
    }
}

impl DynamicTexture {
    fn new(device: &wgpu::Device, source: Box<dyn FrameSource>, label: &str) -> Self {
        let (width, height) = source.size();
        Self {
            texture: texture::create_rgba_texture(device, width, height, label),
            width,
            height,
            source,
        }
    }
}

/// Opens a video source: embedder hook, then built-in GIF, then black
fn open_video_source(bundle: &GameBundle, path: &str, providers: &mut FrameProviders) -> Box<dyn FrameSource> {
    let bytes = match bundle.source.read_bytes(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("video {path} unavailable, using black texture: {e}");
            return Box::new(StaticSource::black());
        }
    };

    if let Some(provider) = providers.video.as_mut() {
        if let Some(source) = provider(path, &bytes) {
            return source;
        }
    }

    if path.to_ascii_lowercase().ends_with(".gif") {
        match AnimationSource::from_gif(&bytes, path) {
            Ok(source) => return Box::new(source),
            Err(e) => tracing::warn!("video {path} failed to decode, using black texture: {e}"),
        }
    } else {
        tracing::warn!("video {path}: container not supported without an embedder provider, using black texture");
    }

    Box::new(StaticSource::black())
}

/// Opens a camera source: embedder hook, else the black fallback
fn open_camera_source(index: u32, providers: &mut FrameProviders) -> Box<dyn FrameSource> {
    if let Some(provider) = providers.camera.as_mut() {
        if let Some(source) = provider(index) {
            return source;
        }
    }
    tracing::warn!("camera {index} cannot be opened, using black texture");
    Box::new(StaticSource::black())
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Validates generated WGSL before it reaches the device
///
/// A rejected shader aborts the load with the validator's message; the
/// source itself is obtainable via [`DEBUG_SHADER_ENV`].
fn validate_wgsl(source: &str) -> Result<(), EngineError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| EngineError::ShaderCompile {
        message: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    validator.validate(&module).map_err(|e| EngineError::ShaderCompile {
        message: e.emit_to_string(source),
    })?;

    Ok(())
}

/// Writes the generated WGSL and manifest next to the working directory
/// when [`DEBUG_SHADER_ENV`] is set
fn maybe_dump_shader(manifest: &GameManifest) {
    if std::env::var(DEBUG_SHADER_ENV).map_or(true, |v| v.is_empty() || v == "0") {
        return;
    }

    if let Err(e) = std::fs::write("wgslbox_shader_dump.wgsl", &manifest.generated_wgsl) {
        tracing::warn!("failed to write shader dump: {e}");
    }
    match serde_json::to_string_pretty(manifest) {
        Ok(json) => {
            if let Err(e) = std::fs::write("wgslbox_manifest_dump.json", json) {
                tracing::warn!("failed to write manifest dump: {e}");
            }
        }
        Err(e) => tracing::warn!("failed to serialize manifest dump: {e}"),
    }
    tracing::info!("wrote wgslbox_shader_dump.wgsl and wgslbox_manifest_dump.json");
}
