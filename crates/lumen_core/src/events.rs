use glam::Vec3;
pub use winit::keyboard::KeyCode;

use crate::render_mode::RenderMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn pressed(key: KeyCode) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
        }
    }

    pub fn released(key: KeyCode) -> Self {
        Self {
            key,
            state: KeyState::Released,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseEvent {
    Moved { x: f32, y: f32 },
    Button { button: u16, state: KeyState },
}

/// Asks the light store for one more point light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightAddRequest {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl LightAddRequest {
    /// White light, intensity 1, radius 10: what the "add light" key spawns.
    pub fn white_at(position: Vec3) -> Self {
        Self {
            position,
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
        }
    }
}

/// Everything producers can send to the render side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    LightAdd(LightAddRequest),
    RenderMode(RenderMode),
    Resized { width: u32, height: u32 },
    Shutdown,
}
