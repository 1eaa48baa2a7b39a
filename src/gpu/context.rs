use thiserror::Error;

/// Errors from device setup, texture upload and rendering.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GpuError {
    #[error("no compatible graphics adapter")]
    NoAdapter,

    #[error("failed to open graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to build render pipeline: {0}")]
    Pipeline(String),

    #[error("failed to create texture: {0}")]
    TextureCreation(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("texture read-back failed: {0}")]
    ReadBack(String),
}

/// Adapter, device and queue shared by every texture and renderer.
///
/// Owns the `wgpu::Instance` so that surfaces for additional windows can be
/// created against the same adapter.
pub struct GpuContext {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Headless context on the default backends.
    pub fn new() -> Result<Self, GpuError> {
        Self::with_instance(wgpu::Instance::default(), None)
    }

    /// Open a device on `instance`, preferring an adapter that can present
    /// to `compatible_surface`.
    pub fn with_instance(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::debug!("using {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("weblook"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
            },
            None,
        ))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Largest texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Create a surface for a window on this context's instance.
    pub fn create_surface(
        &self,
        target: impl Into<wgpu::SurfaceTarget<'static>>,
    ) -> Result<wgpu::Surface<'static>, GpuError> {
        self.instance
            .create_surface(target)
            .map_err(|err| GpuError::Surface(err.to_string()))
    }

    /// Configure `surface` at `width`×`height` with `format`, falling back
    /// to the surface's preferred format if `format` is unsupported.
    pub fn configure_surface(
        &self,
        surface: &wgpu::Surface<'_>,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<wgpu::SurfaceConfiguration, GpuError> {
        let mut config = surface
            .get_default_config(&self.adapter, width.max(1), height.max(1))
            .ok_or_else(|| GpuError::Surface("adapter cannot present to this surface".into()))?;
        let caps = surface.get_capabilities(&self.adapter);
        if caps.formats.contains(&format) {
            config.format = format;
        } else {
            log::warn!("surface does not support {format:?}, using {:?}", config.format);
        }
        surface.configure(&self.device, &config);
        Ok(config)
    }

    /// Pick the format to render into `surface`: a non-sRGB format when the
    /// surface offers one, since decoded rows already carry sRGB values.
    pub fn preferred_surface_format(
        &self,
        surface: &wgpu::Surface<'_>,
    ) -> Option<wgpu::TextureFormat> {
        let caps = surface.get_capabilities(&self.adapter);
        caps.formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
    }
}

impl core::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter.get_info().name)
            .finish_non_exhaustive()
    }
}
