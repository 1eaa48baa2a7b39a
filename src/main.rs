//! `weblook [FILE]...`: open each WebP file in its own window.
//!
//! Files that cannot be read or decoded are logged and skipped. The viewer
//! exits when its last window is closed; Escape closes the window that has
//! keyboard focus.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use weblook::gpu::{BoundImage, GpuContext, GpuError, ImageTexture, QuadRenderer};
use weblook::{BitstreamFeatures, ContainerFormat, DecodeDescriptor, Decoder, WindowRegistry};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Debug, Error)]
enum OpenError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a WebP file")]
    NotWebp,

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("cannot create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("weblook=info"))
        .init();

    let paths: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("usage: weblook <FILE>...");
        return ExitCode::FAILURE;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("cannot start event loop: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(paths);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop failed: {err}");
        return ExitCode::FAILURE;
    }
    if app.opened == 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Device and renderer, created with the first window's surface.
struct Gpu {
    ctx: GpuContext,
    renderer: QuadRenderer,
}

struct ImageWindow {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    image: BoundImage,
    _texture: ImageTexture,
}

struct App {
    pending: Vec<PathBuf>,
    opened: usize,
    gpu: Option<Gpu>,
    windows: WindowRegistry<WindowId, ImageWindow>,
}

impl App {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            pending: paths,
            opened: 0,
            gpu: None,
            windows: WindowRegistry::new(),
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop, path: &Path) -> Result<(), OpenError> {
        let data = fs::read(path)?;
        if ContainerFormat::detect(&data).is_none() && !ContainerFormat::is_webp_path(path) {
            return Err(OpenError::NotWebp);
        }
        let features = BitstreamFeatures::probe(&data)
            .map_err(|err| OpenError::Decode(err.error().to_string()))?;

        let title = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => path.to_string_lossy(),
        };
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title(title)
                    .with_inner_size(PhysicalSize::new(features.width, features.height)),
            )?,
        );

        let (gpu, surface) = gpu_and_surface(&mut self.gpu, &window)?;
        let size = window.inner_size();
        let config =
            gpu.ctx
                .configure_surface(&surface, gpu.renderer.format(), size.width, size.height)?;
        if config.format != gpu.renderer.format() {
            return Err(GpuError::Surface(format!(
                "window cannot present {:?}",
                gpu.renderer.format()
            ))
            .into());
        }

        let texture = Decoder::new()
            .try_decode(&data, DecodeDescriptor::natural, |image| {
                ImageTexture::upload(&gpu.ctx, &image)
            })
            .map_err(|err| OpenError::Decode(err.error().to_string()))??;
        let image = gpu.renderer.bind(&gpu.ctx, &texture);

        log::info!(
            "opened {} ({}x{}, {:?})",
            path.display(),
            texture.width(),
            texture.height(),
            features.format
        );
        window.request_redraw();
        self.windows.insert(
            window.id(),
            ImageWindow {
                window,
                surface,
                config,
                image,
                _texture: texture,
            },
        );
        Ok(())
    }

    fn close(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        if self.windows.remove(&id).is_some() {
            log::debug!("window closed, {} left", self.windows.len());
        }
        if self.windows.is_empty() {
            event_loop.exit();
        }
    }
}

/// The shared device, created on first use against `window`'s surface, and
/// a surface for `window`.
fn gpu_and_surface<'g>(
    slot: &'g mut Option<Gpu>,
    window: &Arc<Window>,
) -> Result<(&'g Gpu, wgpu::Surface<'static>), OpenError> {
    if slot.is_none() {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|err| GpuError::Surface(err.to_string()))?;
        let ctx = GpuContext::with_instance(instance, Some(&surface))?;
        let format = ctx
            .preferred_surface_format(&surface)
            .ok_or_else(|| GpuError::Surface("surface reports no formats".into()))?;
        let renderer = QuadRenderer::new(&ctx, format)?;
        log::debug!("rendering to {format:?} surfaces");
        let gpu: &Gpu = slot.insert(Gpu { ctx, renderer });
        return Ok((gpu, surface));
    }
    match slot {
        Some(gpu) => {
            let gpu: &Gpu = gpu;
            let surface = gpu.ctx.create_surface(window.clone())?;
            Ok((gpu, surface))
        }
        None => Err(GpuError::NoAdapter.into()),
    }
}

fn redraw(gpu: &Gpu, entry: &ImageWindow) {
    let frame = match entry.surface.get_current_texture() {
        Ok(frame) => frame,
        Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
            entry.surface.configure(gpu.ctx.device(), &entry.config);
            entry.window.request_redraw();
            return;
        }
        Err(err) => {
            log::error!("cannot acquire frame: {err}");
            return;
        }
    };
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    gpu.renderer.draw(&gpu.ctx, &view, &entry.image);
    entry.window.pre_present_notify();
    frame.present();
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.pending.is_empty() {
            return;
        }
        for path in std::mem::take(&mut self.pending) {
            match self.open(event_loop, &path) {
                Ok(()) => self.opened += 1,
                Err(err) => log::error!("{}: {err}", path.display()),
            }
        }
        if self.windows.is_empty() {
            log::error!("no images to show");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.close(event_loop, window_id),
            WindowEvent::Resized(size) => {
                let (Some(gpu), Some(entry)) = (&self.gpu, self.windows.get_mut(&window_id))
                else {
                    return;
                };
                if size.width > 0 && size.height > 0 {
                    entry.config.width = size.width;
                    entry.config.height = size.height;
                    entry.surface.configure(gpu.ctx.device(), &entry.config);
                    entry.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(gpu), Some(entry)) = (&self.gpu, self.windows.get(&window_id)) {
                    redraw(gpu, entry);
                }
            }
            _ => {}
        }
    }
}
