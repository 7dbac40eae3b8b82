use std::{path::PathBuf, process::ExitCode, sync::Arc};

use lumen_core::{
    ConfigError, LumenConfig, RenderModeFlag,
    logging::{LoggingConfig, init_logging},
    time::{FrameStats, Time},
};
use lumen_input::{EventDispatcher, event_channel};
use lumen_lights::{DirectionalLight, LightStore};
use lumen_renderer::{FrameRenderer, RaycastScene, RenderError};
use thiserror::Error;

#[cfg(feature = "gpu")]
mod gpu_check;
mod output;
mod script;
mod session;

const USAGE: &str = "usage: lumen [CONFIG.json] [--frames N] [--out DIR]";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}\n{USAGE}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("failed to start the io runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("{0}")]
    Output(String),
}

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    frames: u64,
    out_dir: PathBuf,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, AppError> {
        let mut parsed = Args {
            config: None,
            frames: 120,
            out_dir: PathBuf::from("."),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| AppError::Usage("--frames needs a value".into()))?;
                    parsed.frames = value
                        .parse()
                        .map_err(|_| AppError::Usage(format!("invalid frame count {value:?}")))?;
                }
                "--out" => {
                    let value = args
                        .next()
                        .ok_or_else(|| AppError::Usage("--out needs a directory".into()))?;
                    parsed.out_dir = PathBuf::from(value);
                }
                flag if flag.starts_with("--") => {
                    return Err(AppError::Usage(format!("unknown flag {flag}")));
                }
                path if parsed.config.is_none() => parsed.config = Some(PathBuf::from(path)),
                extra => return Err(AppError::Usage(format!("unexpected argument {extra:?}"))),
            }
        }
        Ok(parsed)
    }
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let result = Args::parse(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => LumenConfig::load(path)?,
        None => {
            let config = LumenConfig::default();
            config.validate()?;
            config
        }
    };
    log::info!(
        "Viewport {}x{}, {} configured lights, capacity {} ({} per tile)",
        config.viewport.width,
        config.viewport.height,
        config.lights.point.len(),
        config.culling.max_lights,
        config.culling.max_lights_per_tile
    );

    let store = Arc::new(LightStore::new(config.culling.max_lights));
    for light in &config.lights.point {
        store.add_request(&(*light).into()).map_err(RenderError::from)?;
    }
    if let Some(sun) = config.lights.directional {
        store.set_directional_light(Some(DirectionalLight::new(
            sun.direction,
            sun.color,
            sun.brightness,
        )));
    }
    let mode = Arc::new(RenderModeFlag::new(config.shading.initial_mode));

    // Culling and shading fan out over the global rayon pool.
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .thread_name(|index| format!("lumen-worker-{index}"))
        .build_global()
    {
        log::debug!("Keeping the existing rayon pool: {err}");
    }

    // Producers live on the io runtime, the frame loop on this thread.
    let io_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("lumen-io")
        .build()?;
    let (sender, receiver) = event_channel();
    let mut dispatcher = EventDispatcher::new(receiver, Arc::clone(&store), Arc::clone(&mode));
    io_runtime.spawn(script::play(sender, script::demo_script()));

    let mut viewport = config.viewport;
    let mut camera = config.camera.camera(viewport);
    let camera_transform = config.camera.transform();
    let scene = RaycastScene::demo();

    let mut renderer = FrameRenderer::from_config(&config);
    renderer.initialize(viewport.width, viewport.height)?;

    #[cfg(feature = "gpu")]
    let mut gpu_check = renderer
        .grid()
        .copied()
        .map(|grid| {
            gpu_check::GpuCullCheck::new(
                grid,
                config.culling.max_lights,
                config.culling.max_lights_per_tile,
            )
        })
        .transpose()
        .inspect_err(|err| log::warn!("GPU culling unavailable: {err}"))
        .ok()
        .flatten();

    let mut time = Time::default();
    let mut stats = FrameStats::default();

    for _ in 0..args.frames {
        let events = dispatcher.pump(camera_transform.translation);
        if let Some((width, height)) = events.resized {
            session::apply_resize(&mut renderer, &mut camera, &mut viewport, width, height)?;
        }
        if events.shutdown {
            log::info!("Shutdown requested");
            break;
        }

        let matrices = camera.matrices(&camera_transform);
        let Some(report) =
            session::render_or_skip(&mut renderer, &matrices, &scene, &store, mode.get())?
        else {
            continue;
        };

        #[cfg(feature = "gpu")]
        if let (Some(check), Some(grid), Some(depth), Some(visible)) = (
            gpu_check.as_mut(),
            renderer.grid(),
            renderer.depth(),
            renderer.visible_lights(),
        ) {
            let snapshot = store.snapshot();
            // only comparable when no light arrived since the frame's snapshot
            if snapshot.generation() == report.light_generation {
                match check.compare(grid, &matrices, depth, &snapshot, visible) {
                    Ok(0) => {}
                    Ok(tiles) => log::warn!("GPU culling differs in {tiles} tiles"),
                    Err(err) => log::warn!("GPU culling check failed: {err}"),
                }
            }
        }

        time.update();
        stats.record(time.delta());
        if stats.frames() % lumen_core::time::AVERAGED_FRAMES as u64 == 0 {
            if let Some((seconds, fps)) = stats.average() {
                log::info!(
                    "{:.2} ms/frame ({fps:.1} fps), {} lights, {} tile entries, mode {:?}",
                    seconds * 1000.0,
                    report.light_count,
                    report.cull.total_visible,
                    report.mode
                );
            }
        }
    }

    std::fs::create_dir_all(&args.out_dir)
        .map_err(|err| AppError::Output(format!("cannot create {:?}: {err}", args.out_dir)))?;
    if let Some(color) = renderer.color() {
        output::save_color(color, &output::frame_path(&args.out_dir, "frame"))?;
    }
    if let Some(depth) = renderer.depth() {
        output::save_depth(
            depth,
            config.camera.near,
            config.camera.far,
            &output::frame_path(&args.out_dir, "depth"),
        )?;
    }

    renderer.shutdown();
    io_runtime.shutdown_background();
    log::info!(
        "Finished at {}x{} with {} lights",
        viewport.width,
        viewport.height,
        store.len()
    );
    Ok(())
}
