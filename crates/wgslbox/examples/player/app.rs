//! Window and event plumbing for the player
//!
//! Translates winit events into the engine's input snapshot, owns the
//! surface, and drives one engine frame per redraw. The engine itself never
//! sees winit types; key events cross the boundary as key code names.

use std::path::PathBuf;
use std::sync::Arc;
use wgslbox::{Engine, FrameProviders, GameBundle, InputState};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

/// Top-level application state
pub struct PlayerApp {
    /// Path the game was opened from; reload re-reads it
    game_path: PathBuf,
    /// Current keyboard modifiers, for player chords like Ctrl+R
    modifiers: ModifiersState,
    /// Everything that needs a live window
    context: Option<PlayerContext>,
}

/// GPU context, engine and input for one open window
struct PlayerContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    engine: Engine,
    input: InputState,
}

impl PlayerApp {
    pub fn new(game_path: PathBuf) -> Self {
        Self {
            game_path,
            modifiers: ModifiersState::default(),
            context: None,
        }
    }
}

impl PlayerContext {
    /// Creates the window, the GPU context and the engine
    fn new(event_loop: &ActiveEventLoop, game_path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let window = Arc::new(event_loop.create_window(Window::default_attributes().with_title("wgslbox"))?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))?;

        // Device loss and validation failures land here once instead of
        // panicking mid-frame.
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!("wgpu error: {error}");
        }));

        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_capabilities.formats.iter().find(|f| f.is_srgb()).copied().unwrap_or(surface_capabilities.formats[0]);

        let bundle = GameBundle::open(game_path)?;
        let engine = Engine::new(&device, &queue, surface_format, &bundle, FrameProviders::default())?;

        let (width, height) = (engine.manifest().width, engine.manifest().height);
        window.set_title(&engine.manifest().title);
        let _ = window.request_inner_size(PhysicalSize::new(width, height));

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!("loaded game: {} ({}x{})", engine.manifest().title, width, height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            engine,
            input: InputState::new(),
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.engine.resize(new_size.width, new_size.height);
    }

    /// Reloads the game from disk; keeps the old engine on failure
    fn reload(&mut self, game_path: &PathBuf) {
        let rebuilt = GameBundle::open(game_path).map_err(Into::into).and_then(|bundle| {
            Engine::new(&self.device, &self.queue, self.config.format, &bundle, FrameProviders::default()).map_err(Box::<dyn std::error::Error>::from)
        });
        match rebuilt {
            Ok(engine) => {
                self.window.set_title(&engine.manifest().title);
                self.engine = engine;
                self.engine.resize(self.config.width, self.config.height);
                tracing::info!("reloaded game");
            }
            Err(e) => tracing::error!("reload failed, keeping previous game: {e}"),
        }
    }

    /// Renders one frame; reconfigures or bails on surface loss
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => {
                tracing::warn!("skipping frame: {e}");
                return;
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.engine.frame(&view, &self.input.snapshot());
        frame.present();
    }
}

impl ApplicationHandler for PlayerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }
        match PlayerContext::new(event_loop, &self.game_path) {
            Ok(context) => self.context = Some(context),
            Err(e) => {
                tracing::error!("failed to load {}: {e}", self.game_path.display());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(context) = self.context.as_mut() else { return };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::ModifiersChanged(new_modifiers) => {
                self.modifiers = new_modifiers.state();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                match code {
                    KeyCode::Escape if pressed => event_loop.exit(),
                    KeyCode::KeyR if pressed && self.modifiers.control_key() => {
                        context.reload(&self.game_path);
                    }
                    _ => context.input.handle_key(&format!("{code:?}"), pressed),
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                context.input.handle_cursor_moved(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                context.input.handle_mouse_button(state == ElementState::Pressed);
            }

            WindowEvent::Resized(new_size) => context.resize(new_size),

            WindowEvent::RedrawRequested => context.redraw(event_loop),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(context) = &self.context {
            context.window.request_redraw();
        }
    }
}
