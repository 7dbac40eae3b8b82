use std::time::{Duration, Instant};

use lumen_core::{CameraMatrices, LumenConfig, RenderMode};
use lumen_lights::LightStore;

use crate::{
    culling::{CullStats, LightCuller},
    depth::{DepthBuffer, DepthProvider},
    error::{RenderError, RenderResult},
    shading::{ColorBuffer, ShadingStage, SurfaceBuffer, SurfaceProvider},
    tile_grid::TileGrid,
    visible_indices::VisibleLightIndexBuffer,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub depth: Duration,
    pub cull: Duration,
    pub shade: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.depth + self.cull + self.shade
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub light_count: usize,
    pub light_generation: u64,
    pub mode: RenderMode,
    pub cull: CullStats,
    pub timings: StageTimings,
}

/// Everything sized by the viewport.
struct FrameTargets {
    grid: TileGrid,
    depth: DepthBuffer,
    surfaces: SurfaceBuffer,
    visible: VisibleLightIndexBuffer,
    color: ColorBuffer,
    frame: u64,
}

impl FrameTargets {
    fn new(grid: TileGrid, max_lights_per_tile: usize) -> RenderResult<Self> {
        Ok(Self {
            visible: VisibleLightIndexBuffer::new(&grid, max_lights_per_tile)?,
            depth: DepthBuffer::new(grid.width(), grid.height()),
            surfaces: SurfaceBuffer::new(grid.width(), grid.height()),
            color: ColorBuffer::new(grid.width(), grid.height()),
            grid,
            frame: 0,
        })
    }

    /// All or nothing: a rejected size leaves every buffer as it was.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let mut grid = self.grid;
        grid.resize(width, height)?;
        self.visible.resize(&grid)?;
        self.grid = grid;
        self.depth.resize(width, height);
        self.surfaces.resize(width, height);
        self.color.resize(width, height);
        Ok(())
    }
}

enum FrameState {
    Uninitialized,
    Running(Box<FrameTargets>),
    ShutDown,
}

/// Runs depth, culling and shading in order, each stage finishing before
/// the next one starts.
pub struct FrameRenderer {
    state: FrameState,
    culler: LightCuller,
    shading: ShadingStage,
}

impl FrameRenderer {
    pub fn new(max_lights_per_tile: usize, shading: ShadingStage) -> Self {
        Self {
            state: FrameState::Uninitialized,
            culler: LightCuller::new(max_lights_per_tile),
            shading,
        }
    }

    pub fn from_config(config: &LumenConfig) -> Self {
        Self::new(
            config.culling.max_lights_per_tile,
            ShadingStage::from_config(&config.shading),
        )
    }

    /// Allocates the viewport-sized buffers. Calling it again on a running
    /// renderer is a resize.
    pub fn initialize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        match &mut self.state {
            FrameState::Uninitialized => {
                if self.culler.max_lights_per_tile() == 0 {
                    return Err(RenderError::Configuration(
                        "max_lights_per_tile must be positive".into(),
                    ));
                }
                let grid = TileGrid::new(width, height)?;
                let targets = FrameTargets::new(grid, self.culler.max_lights_per_tile())?;
                log::info!(
                    "Renderer initialized: {width}x{height}, {} tiles, {} lights per tile",
                    grid.tile_count(),
                    self.culler.max_lights_per_tile()
                );
                self.state = FrameState::Running(Box::new(targets));
                Ok(())
            }
            FrameState::Running(targets) => targets.resize(width, height),
            FrameState::ShutDown => Err(RenderError::NotRunning),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        match &mut self.state {
            FrameState::Running(targets) => {
                if (width, height) == (targets.grid.width(), targets.grid.height()) {
                    return Ok(());
                }
                targets.resize(width, height)
            }
            _ => Err(RenderError::NotRunning),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, FrameState::Running(_))
    }

    pub fn shading(&self) -> &ShadingStage {
        &self.shading
    }

    /// Renders one frame against a snapshot of `lights` taken up front.
    pub fn render_frame<S>(
        &mut self,
        camera: &CameraMatrices,
        scene: &S,
        lights: &LightStore,
        mode: RenderMode,
    ) -> RenderResult<FrameReport>
    where
        S: DepthProvider + SurfaceProvider,
    {
        let FrameState::Running(targets) = &mut self.state else {
            return Err(RenderError::NotRunning);
        };
        let snapshot = lights.snapshot();
        let mut timings = StageTimings::default();

        let start = Instant::now();
        scene.render_depth(camera, &mut targets.depth);
        timings.depth = start.elapsed();

        let start = Instant::now();
        let cull = self
            .culler
            .cull(&targets.grid, camera, &targets.depth, &snapshot, &mut targets.visible)
            .inspect_err(|err| log::error!("Light culling aborted: {err}"))?;
        timings.cull = start.elapsed();

        let start = Instant::now();
        scene.render_surfaces(camera, &mut targets.surfaces);
        self.shading
            .shade(
                &targets.grid,
                &targets.surfaces,
                &targets.visible,
                &snapshot,
                mode,
                &mut targets.color,
            )
            .inspect_err(|err| log::error!("Shading aborted: {err}"))?;
        timings.shade = start.elapsed();

        targets.frame += 1;
        let report = FrameReport {
            frame: targets.frame,
            light_count: snapshot.count(),
            light_generation: snapshot.generation(),
            mode,
            cull,
            timings,
        };
        log::debug!(
            "Frame {}: {} lights, {} visible entries (max {} in a tile), {:?}",
            report.frame,
            report.light_count,
            cull.total_visible,
            cull.max_in_tile,
            timings.total()
        );
        Ok(report)
    }

    pub fn grid(&self) -> Option<&TileGrid> {
        self.targets().map(|targets| &targets.grid)
    }

    pub fn depth(&self) -> Option<&DepthBuffer> {
        self.targets().map(|targets| &targets.depth)
    }

    pub fn visible_lights(&self) -> Option<&VisibleLightIndexBuffer> {
        self.targets().map(|targets| &targets.visible)
    }

    pub fn color(&self) -> Option<&ColorBuffer> {
        self.targets().map(|targets| &targets.color)
    }

    /// Releases the frame buffers. The renderer cannot be restarted.
    pub fn shutdown(&mut self) {
        if let FrameState::Running(targets) = &self.state {
            log::info!("Renderer shut down after {} frames", targets.frame);
        }
        self.state = FrameState::ShutDown;
    }

    fn targets(&self) -> Option<&FrameTargets> {
        match &self.state {
            FrameState::Running(targets) => Some(targets),
            _ => None,
        }
    }
}
