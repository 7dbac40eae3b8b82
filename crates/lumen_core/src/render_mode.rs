use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Final composition selected by the shading stage. Culling ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RenderMode {
    #[default]
    Lit = 0,
    LightHeatmap = 1,
    Normals = 2,
    Uvs = 3,
    Albedo = 4,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown render mode {0} (expected 0..=4)")]
pub struct InvalidRenderMode(pub u32);

impl RenderMode {
    pub const ALL: [RenderMode; 5] = [
        RenderMode::Lit,
        RenderMode::LightHeatmap,
        RenderMode::Normals,
        RenderMode::Uvs,
        RenderMode::Albedo,
    ];
}

impl TryFrom<u32> for RenderMode {
    type Error = InvalidRenderMode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(InvalidRenderMode(value))
    }
}

impl From<RenderMode> for u32 {
    fn from(mode: RenderMode) -> Self {
        mode as u32
    }
}

/// Render-mode switch shared between the input side and the render thread.
#[derive(Debug, Default)]
pub struct RenderModeFlag(AtomicU32);

impl RenderModeFlag {
    pub fn new(mode: RenderMode) -> Self {
        Self(AtomicU32::new(mode.into()))
    }

    pub fn get(&self) -> RenderMode {
        // only valid values are ever stored
        RenderMode::try_from(self.0.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set(&self, mode: RenderMode) {
        self.0.store(mode.into(), Ordering::Release);
    }

    /// Sets the mode from a raw integer; unknown values leave it unchanged.
    pub fn set_raw(&self, raw: u32) -> Result<RenderMode, InvalidRenderMode> {
        let mode = RenderMode::try_from(raw)?;
        self.set(mode);
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_map_to_modes() {
        assert_eq!(RenderMode::try_from(0), Ok(RenderMode::Lit));
        assert_eq!(RenderMode::try_from(1), Ok(RenderMode::LightHeatmap));
        assert_eq!(RenderMode::try_from(4), Ok(RenderMode::Albedo));
        assert_eq!(RenderMode::try_from(5), Err(InvalidRenderMode(5)));
    }

    #[test]
    fn invalid_raw_value_keeps_previous_mode() {
        let flag = RenderModeFlag::new(RenderMode::Normals);
        assert!(flag.set_raw(9).is_err());
        assert_eq!(flag.get(), RenderMode::Normals);

        assert_eq!(flag.set_raw(3), Ok(RenderMode::Uvs));
        assert_eq!(flag.get(), RenderMode::Uvs);
    }
}
