use bytemuck::{Pod, Zeroable};
use lumen_core::CameraMatrices;
use lumen_lights::{LightSnapshot, POINT_LIGHT_SIZE};
use wgpu::util::DeviceExt;

use crate::{
    depth::DepthBuffer,
    error::{RenderError, RenderResult},
    gpu::{GpuComputeContext, GpuComputeProgram, with_validation},
    tile_grid::TileGrid,
    visible_indices::VisibleLightIndexBuffer,
};

/// Matches `CullUniforms` in light_culling.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CullUniforms {
    pub inverse_projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub viewport: [u32; 2],
    pub tiles_x: u32,
    pub light_count: u32,
    pub max_lights_per_tile: u32,
    pub _padding: [u32; 3],
}

const CULL_UNIFORMS_SIZE: usize = 160;
const _: () = assert!(std::mem::size_of::<CullUniforms>() == CULL_UNIFORMS_SIZE);

impl CullUniforms {
    pub fn new(
        camera: &CameraMatrices,
        grid: &TileGrid,
        light_count: u32,
        max_lights_per_tile: u32,
    ) -> Self {
        Self {
            inverse_projection: camera.inverse_projection.to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            viewport: [grid.width(), grid.height()],
            tiles_x: grid.tiles_x(),
            light_count,
            max_lights_per_tile,
            _padding: [0; 3],
        }
    }
}

pub struct LightCullingInit {
    pub grid: TileGrid,
    pub max_lights: usize,
    pub max_lights_per_tile: usize,
}

/// Buffers sized by the viewport.
struct ViewportBuffers {
    grid: TileGrid,
    depth: wgpu::Buffer,
    visible_indices: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Compute version of the light culler: one workgroup per tile.
pub struct LightCullingProgram {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    lights: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    viewport: ViewportBuffers,
    max_lights: usize,
    max_lights_per_tile: usize,
    light_count: u32,
    // version of the light list on the GPU
    uploaded: Option<(u64, u64)>,
}

impl GpuComputeProgram for LightCullingProgram {
    type InitData = LightCullingInit;
    type DispatchData<'a> = ();

    fn new(ctx: &GpuComputeContext, init: &Self::InitData) -> RenderResult<Self> {
        if init.max_lights == 0 || init.max_lights_per_tile == 0 {
            return Err(RenderError::Configuration(
                "light culling needs a positive light capacity".into(),
            ));
        }

        let shader = with_validation(ctx.device, "light culling shader", || {
            ctx.device
                .create_shader_module(wgpu::include_wgsl!("light_culling.wgsl"))
        })?;

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Light Culling Bind Group Layout"),
                entries: &[
                    storage(0, true),  // lights
                    storage(1, true),  // depth
                    storage(2, false), // visible indices
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Light Culling Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = with_validation(ctx.device, "light culling pipeline", || {
            ctx.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("Light Culling Pipeline"),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some("cs_main"),
                    compilation_options: Default::default(),
                    cache: None,
                })
        })?;

        let lights = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Light Buffer"),
            size: (init.max_lights * POINT_LIGHT_SIZE) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniforms = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Culling Uniforms"),
                contents: bytemuck::bytes_of(&CullUniforms::zeroed()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let viewport = ViewportBuffers::new(
            ctx.device,
            &layout,
            &lights,
            &uniforms,
            init.grid,
            init.max_lights_per_tile,
        )?;

        Ok(Self {
            pipeline,
            layout,
            lights,
            uniforms,
            viewport,
            max_lights: init.max_lights,
            max_lights_per_tile: init.max_lights_per_tile,
            light_count: 0,
            uploaded: None,
        })
    }

    fn record<'a>(&'a self, encoder: &mut wgpu::CommandEncoder, _data: Self::DispatchData<'a>) {
        let grid = &self.viewport.grid;
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Light Culling Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.viewport.bind_group, &[]);
        pass.dispatch_workgroups(grid.tiles_x(), grid.tiles_y(), 1);
    }
}

impl LightCullingProgram {
    /// Reallocates the depth and index buffers for a new viewport. The old
    /// buffers stay bound when the new size is rejected.
    pub fn resize(&mut self, device: &wgpu::Device, grid: TileGrid) -> RenderResult<()> {
        if grid == self.viewport.grid {
            return Ok(());
        }
        self.viewport = ViewportBuffers::new(
            device,
            &self.layout,
            &self.lights,
            &self.uniforms,
            grid,
            self.max_lights_per_tile,
        )?;
        Ok(())
    }

    /// Uploads this frame's inputs.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        camera: &CameraMatrices,
        depth: &DepthBuffer,
        lights: &LightSnapshot,
    ) -> RenderResult<()> {
        let grid = &self.viewport.grid;
        depth.ensure_matches(grid)?;
        if lights.count() > self.max_lights {
            return Err(RenderError::Configuration(format!(
                "{} lights exceed the GPU light buffer ({})",
                lights.count(),
                self.max_lights
            )));
        }

        let version = lights.version();
        if self.uploaded != Some(version) {
            if lights.count() > 0 {
                queue.write_buffer(&self.lights, 0, bytemuck::cast_slice(lights.point_lights()));
            }
            self.light_count = lights.count() as u32;
            self.uploaded = Some(version);
        }

        queue.write_buffer(&self.viewport.depth, 0, bytemuck::cast_slice(depth.data()));
        let uniforms = CullUniforms::new(
            camera,
            grid,
            self.light_count,
            self.max_lights_per_tile as u32,
        );
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
        Ok(())
    }

    /// Per-tile index lists, for binding in a shading pass.
    pub fn visible_indices(&self) -> &wgpu::Buffer {
        &self.viewport.visible_indices
    }

    pub fn grid(&self) -> &TileGrid {
        &self.viewport.grid
    }

    /// Records and submits one culling dispatch on its own encoder.
    pub fn dispatch(&self, ctx: &GpuComputeContext) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Light Culling Encoder"),
            });
        self.record(&mut encoder, ());
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Copies the index lists back to the CPU. Blocks until the GPU is done,
    /// so only use it for debugging and comparisons.
    pub fn read_visible_indices(
        &self,
        ctx: &GpuComputeContext,
    ) -> RenderResult<VisibleLightIndexBuffer> {
        let size = self.viewport.visible_indices.size();
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Visible Light Indices Readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Visible Light Indices Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.viewport.visible_indices, 0, &staging, 0, size);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let mapped = loop {
            ctx.device
                .poll(wgpu::PollType::Poll)
                .map_err(|err| RenderError::Initialization(format!("device poll failed: {err}")))?;
            match receiver.try_recv() {
                Ok(result) => break result,
                Err(std::sync::mpsc::TryRecvError::Empty) => std::thread::yield_now(),
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    return Err(RenderError::Initialization(
                        "readback callback dropped".into(),
                    ));
                }
            }
        };
        mapped.map_err(|err| RenderError::Initialization(format!("readback failed: {err}")))?;

        let view = slice.get_mapped_range();
        let data = bytemuck::cast_slice::<u8, i32>(&view).to_vec();
        drop(view);
        staging.unmap();
        Ok(VisibleLightIndexBuffer::from_raw(self.max_lights_per_tile, data))
    }
}

impl ViewportBuffers {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        lights: &wgpu::Buffer,
        uniforms: &wgpu::Buffer,
        grid: TileGrid,
        max_lights_per_tile: usize,
    ) -> RenderResult<Self> {
        let index_len = grid.visible_index_len(max_lights_per_tile)?;
        let depth = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Culling Depth Buffer"),
            size: (grid.width() as u64) * (grid.height() as u64) * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let visible_indices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Visible Light Indices"),
            size: index_len as u64 * 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Culling Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lights.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: depth.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: visible_indices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        });

        log::info!(
            "GPU culling buffers sized for {}x{} tiles",
            grid.tiles_x(),
            grid.tiles_y()
        );

        Ok(Self {
            grid,
            depth,
            visible_indices,
            bind_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn uniforms_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<CullUniforms>(), 160);
        assert_eq!(std::mem::offset_of!(CullUniforms, viewport), 128);
        assert_eq!(std::mem::offset_of!(CullUniforms, max_lights_per_tile), 144);
    }

    #[test]
    fn uniforms_carry_grid_and_camera() {
        let grid = TileGrid::new(1920, 1080).unwrap();
        let camera = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 5.0, 5.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 1000.0),
        );
        let uniforms = CullUniforms::new(&camera, &grid, 4, 1024);
        assert_eq!(uniforms.viewport, [1920, 1080]);
        assert_eq!(uniforms.tiles_x, 120);
        assert_eq!(uniforms.light_count, 4);
        assert_eq!(uniforms.inverse_projection, camera.inverse_projection.to_cols_array_2d());
    }
}
