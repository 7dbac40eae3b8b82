mod light_culling;

pub use light_culling::{CullUniforms, LightCullingInit, LightCullingProgram};

use crate::error::{RenderError, RenderResult};

/// Holds common WGPU references to simplify function signatures.
pub struct GpuComputeContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

pub trait GpuComputeProgram: Sized {
    /// Data required to build the pipeline and its buffers
    type InitData;

    /// Data required to record one dispatch
    type DispatchData<'a>
    where
        Self: 'a;

    /// Compiles the shader and creates the pipeline. Validation failures are
    /// reported as initialization errors.
    fn new(ctx: &GpuComputeContext, init_data: &Self::InitData) -> RenderResult<Self>;

    /// Encodes the compute pass.
    fn record<'a>(&'a self, encoder: &mut wgpu::CommandEncoder, data: Self::DispatchData<'a>);
}

/// Headless device for compute work.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuDevice {
    pub fn request() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::Initialization(format!("no suitable GPU adapter: {err}")))?;

        log::info!("Using GPU adapter {:?}", adapter.get_info().name);

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
                .map_err(|err| RenderError::Initialization(format!("device request failed: {err}")))?;

        Ok(Self { device, queue })
    }

    pub fn context(&self) -> GpuComputeContext<'_> {
        GpuComputeContext {
            device: &self.device,
            queue: &self.queue,
        }
    }
}

/// Runs `create` inside a validation error scope.
pub(crate) fn with_validation<T>(
    device: &wgpu::Device,
    what: &str,
    create: impl FnOnce() -> T,
) -> RenderResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::Initialization(format!("{what}: {err}"))),
        None => Ok(value),
    }
}
