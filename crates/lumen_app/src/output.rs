use std::path::{Path, PathBuf};

use image::{GrayImage, RgbaImage};
use lumen_renderer::{ColorBuffer, DepthBuffer};

use crate::AppError;

/// Writes the shaded frame as an RGBA PNG.
pub fn save_color(color: &ColorBuffer, path: &Path) -> Result<(), AppError> {
    let image = RgbaImage::from_raw(color.width(), color.height(), color.to_rgba8())
        .ok_or_else(|| AppError::Output(format!("color buffer does not fit {path:?}")))?;
    image.save(path)?;
    log::info!("Wrote {path:?}");
    Ok(())
}

/// Linearized depth as grayscale; cleared pixels come out white.
pub fn save_depth(depth: &DepthBuffer, near: f32, far: f32, path: &Path) -> Result<(), AppError> {
    let pixels = depth
        .linearized(near, far)
        .into_iter()
        .map(|d| (d.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let image = GrayImage::from_raw(depth.width(), depth.height(), pixels)
        .ok_or_else(|| AppError::Output(format!("depth buffer does not fit {path:?}")))?;
    image.save(path)?;
    log::info!("Wrote {path:?}");
    Ok(())
}

pub fn frame_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.png"))
}
