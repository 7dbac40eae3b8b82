use lumen_core::{Camera, CameraMatrices, RenderMode, config::ViewportConfig};
use lumen_lights::LightStore;
use lumen_renderer::{
    DepthProvider, FrameRenderer, FrameReport, RenderError, RenderResult, SurfaceProvider,
};

/// Applies a window resize. A size the renderer rejects leaves the viewport,
/// camera and frame buffers as they were.
pub fn apply_resize(
    renderer: &mut FrameRenderer,
    camera: &mut Camera,
    viewport: &mut ViewportConfig,
    width: u32,
    height: u32,
) -> RenderResult<bool> {
    match renderer.resize(width, height) {
        Ok(()) => {
            *viewport = ViewportConfig { width, height };
            camera.set_viewport(width, height);
            Ok(true)
        }
        Err(RenderError::Configuration(reason)) => {
            log::warn!(
                "Ignoring resize to {width}x{height}, keeping {}x{}: {reason}",
                viewport.width,
                viewport.height
            );
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Renders one frame. A configuration error skips the frame; anything else
/// ends the run.
pub fn render_or_skip<S>(
    renderer: &mut FrameRenderer,
    camera: &CameraMatrices,
    scene: &S,
    lights: &LightStore,
    mode: RenderMode,
) -> RenderResult<Option<FrameReport>>
where
    S: DepthProvider + SurfaceProvider,
{
    match renderer.render_frame(camera, scene, lights, mode) {
        Ok(report) => Ok(Some(report)),
        Err(RenderError::Configuration(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
