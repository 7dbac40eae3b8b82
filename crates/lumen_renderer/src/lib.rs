pub mod culling;
pub mod depth;
pub mod error;
pub mod frame;
pub mod frustum;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod raycast;
pub mod shading;
pub mod tile_grid;
pub mod visible_indices;

pub use culling::{CullStats, LightCuller, cull_tile};
pub use depth::{CLEAR_DEPTH, DepthBuffer, DepthProvider};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameRenderer, FrameReport, StageTimings};
pub use frustum::{Plane, TileFrustum};
pub use raycast::{Cuboid, GroundPlane, RaycastScene};
pub use shading::{ColorBuffer, ShadingStage, Surface, SurfaceBuffer, SurfaceProvider};
pub use tile_grid::{TILE_SIZE, TileGrid, TileRect};
pub use visible_indices::{SENTINEL, VisibleLightIndexBuffer};
