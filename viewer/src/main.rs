//! Shows a baked font atlas and a line of text in a window. Escape quits.
mod render_device;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use boxworld_geometry::{Color, Point};
use boxworld_renderer::{
    BakeConfig, FontAtlas, QuadBatchRenderer, RendererConfig, WgpuBackend,
};
use clap::Parser;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use render_device::RenderDevice;

const TEXT: &[u8] = b"Hello World!\nThis is a test";

#[derive(Parser, Debug)]
#[command(name = "boxworld-viewer", about = "Renders a baked BoxWorld font")]
struct Cli {
    /// A bake configuration, its font section is baked at startup.
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = BakeConfig::load(&cli.config)?;
    let font = config
        .font
        .bake()
        .with_context(|| format!("Baking {}", config.font.path.display()))?;

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer {
        font,
        renderer_config: config.renderer,
        active: None,
        result: Ok(()),
    };
    event_loop.run_app(&mut viewer)?;
    viewer.result
}

struct Viewer {
    font: FontAtlas,
    renderer_config: RendererConfig,
    active: Option<Active>,
    result: Result<()>,
}

/// The surface is declared before the window so it is dropped first.
struct Active {
    surface: wgpu::Surface<'static>,
    window: Arc<Window>,
    device: RenderDevice,
    renderer: QuadBatchRenderer<WgpuBackend>,
}

impl Viewer {
    fn activate(&mut self, event_loop: &ActiveEventLoop) -> Result<Active> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("BoxWorld")
                    .with_inner_size(LogicalSize::new(640, 480)),
            )?,
        );

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;
        let device = futures::executor::block_on(RenderDevice::for_surface(&instance, &surface))?;

        let size = window.inner_size();
        surface.configure(
            &device.device,
            &device.surface_config(size.width, size.height),
        );

        let backend = WgpuBackend::new(
            device.device.clone(),
            device.queue.clone(),
            device.surface_format,
            &self.renderer_config,
        );
        let renderer =
            QuadBatchRenderer::with_config(backend, self.font.texture(), &self.renderer_config)?;

        Ok(Active {
            surface,
            window,
            device,
            renderer,
        })
    }

    fn render(&mut self) -> Result<()> {
        let Some(active) = &mut self.active else {
            return Ok(());
        };

        let frame = active
            .surface
            .get_current_texture()
            .context("Acquiring the next surface texture")?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (width, height) = (frame.texture.width(), frame.texture.height());

        let renderer = &mut active.renderer;
        renderer.backend_mut().set_target(view);
        renderer
            .backend_mut()
            .clear(self.renderer_config.clear_color);

        renderer.begin(width, height);

        let texture = self.font.texture();
        renderer.submit_quad(
            Point::ZERO,
            Point::ZERO,
            Point::new(texture.width() as f64, texture.height() as f64),
            Point::new(1.0, 1.0),
            Color::WHITE,
        );
        self.font
            .render_utf8(renderer, Point::new(0.0, 384.0), TEXT, Color::WHITE);

        renderer.end();
        renderer.backend_mut().take_target();

        active.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:?}");
        self.result = Err(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.active.is_some() {
            return;
        }

        match self.activate(event_loop) {
            Ok(active) => {
                info!("Viewer ready");
                active.window.request_redraw();
                self.active = Some(active);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(active) = &self.active {
                    active.surface.configure(
                        &active.device.device,
                        &active.device.surface_config(size.width, size.height),
                    );
                    active.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(event_loop, e);
                } else if let Some(active) = &self.active {
                    active.window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
