pub use glam;

pub mod camera;
pub mod config;
pub mod events;
pub mod logging;
pub mod render_mode;
pub mod time;
pub mod transform;

pub use camera::{Camera, CameraMatrices};
pub use config::{ConfigError, LumenConfig};
pub use events::{EngineEvent, KeyCode, KeyEvent, KeyState, LightAddRequest, MouseEvent};
pub use render_mode::{RenderMode, RenderModeFlag};
pub use transform::Transform;
