use anyhow::{Context, Result};
use log::info;

#[derive(Debug, Clone)]
pub struct RenderDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub alpha_mode: wgpu::CompositeAlphaMode,
}

impl RenderDevice {
    pub async fn for_surface(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'static>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::None,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .context("GPU Adapter not found")?;

        info!("GPU Adapter backend: {:?}", adapter.get_info().backend);
        let surface_caps = surface.get_capabilities(&adapter);
        // Colors are specified in linear rgb space.
        let surface_format = *surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or(surface_caps.formats.first())
            .context("Surface is incompatible with the adapter")?;
        info!("- Surface format: {surface_format:?}");

        let alpha_mode = *surface_caps
            .alpha_modes
            .first()
            .context("Surface has no alpha modes")?;
        info!("- Selected alpha mode: {alpha_mode:?}");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                label: None,
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("Requesting device")?;

        info!(
            "- Max texture dimension: {}",
            device.limits().max_texture_dimension_2d
        );

        Ok(Self {
            device,
            queue,
            surface_format,
            alpha_mode,
        })
    }

    pub fn surface_config(&self, width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: self.alpha_mode,
            view_formats: Vec::new(),
        }
    }
}
