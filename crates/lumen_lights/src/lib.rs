mod light;
mod store;

pub use light::{DirectionalLight, POINT_LIGHT_SIZE, PointLight};
pub use store::{LightError, LightSnapshot, LightStore};
