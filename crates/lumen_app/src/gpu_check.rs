use lumen_core::CameraMatrices;
use lumen_lights::LightSnapshot;
use lumen_renderer::{
    DepthBuffer, RenderResult, TileGrid, VisibleLightIndexBuffer,
    gpu::{GpuComputeProgram, GpuDevice, LightCullingInit, LightCullingProgram},
};

/// Runs the compute culler on the same inputs as the CPU pass and reports
/// tiles whose light sets differ.
pub struct GpuCullCheck {
    device: GpuDevice,
    program: LightCullingProgram,
}

impl GpuCullCheck {
    pub fn new(grid: TileGrid, max_lights: usize, max_lights_per_tile: usize) -> RenderResult<Self> {
        let device = GpuDevice::request()?;
        let program = LightCullingProgram::new(
            &device.context(),
            &LightCullingInit {
                grid,
                max_lights,
                max_lights_per_tile,
            },
        )?;
        Ok(Self { device, program })
    }

    /// Number of tiles where the GPU list differs from `cpu`.
    pub fn compare(
        &mut self,
        grid: &TileGrid,
        camera: &CameraMatrices,
        depth: &DepthBuffer,
        lights: &LightSnapshot,
        cpu: &VisibleLightIndexBuffer,
    ) -> RenderResult<usize> {
        self.program.resize(&self.device.device, *grid)?;
        self.program
            .prepare(&self.device.queue, camera, depth, lights)?;

        self.program.dispatch(&self.device.context());

        let gpu = self.program.read_visible_indices(&self.device.context())?;
        // GPU append order is unordered, so compare sets
        let mismatched = (0..grid.tile_count())
            .filter(|&tile| {
                let mut a: Vec<usize> = cpu.tile_lights(tile).collect();
                let mut b: Vec<usize> = gpu.tile_lights(tile).collect();
                a.sort_unstable();
                b.sort_unstable();
                a != b
            })
            .count();
        Ok(mismatched)
    }
}
