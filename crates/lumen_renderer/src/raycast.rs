//! CPU stand-in for the geometry pass: ray casts a scene of axis-aligned
//! boxes over a ground plane and produces the depth buffer and surfaces the
//! culling and shading stages consume.

use glam::{Vec2, Vec3, Vec4};
use lumen_core::CameraMatrices;
use rayon::prelude::*;

use crate::{
    depth::{CLEAR_DEPTH, DepthBuffer, DepthProvider},
    shading::{Surface, SurfaceBuffer, SurfaceProvider},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub albedo: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
    pub albedo: Vec3,
    /// World units per texture repeat
    pub uv_scale: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Hit {
    distance: f32,
    surface: Surface,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaycastScene {
    ground: Option<GroundPlane>,
    cuboids: Vec<Cuboid>,
}

impl RaycastScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ground at y = 0 with a 10 x 10 grid of unit cubes floating above it.
    pub fn demo() -> Self {
        let mut scene = Self::new().with_ground(GroundPlane {
            height: 0.0,
            albedo: Vec3::splat(0.8),
            uv_scale: 4.0,
        });
        for x in 0..10 {
            for z in 0..10 {
                scene = scene.with_cuboid(Cuboid {
                    center: Vec3::new(4.0 * x as f32, 5.0, 4.0 * z as f32),
                    half_extents: Vec3::ONE,
                    albedo: Vec3::new(0.9, 0.6, 0.3),
                });
            }
        }
        scene
    }

    pub fn with_ground(mut self, ground: GroundPlane) -> Self {
        self.ground = Some(ground);
        self
    }

    pub fn with_cuboid(mut self, cuboid: Cuboid) -> Self {
        self.cuboids.push(cuboid);
        self
    }

    pub fn cuboids(&self) -> &[Cuboid] {
        &self.cuboids
    }

    /// Closest surface through the center of a pixel, with its NDC depth.
    pub fn trace_pixel(
        &self,
        camera: &CameraMatrices,
        viewport: (u32, u32),
        x: u32,
        y: u32,
    ) -> Option<(f32, Surface)> {
        let ndc_x = 2.0 * (x as f32 + 0.5) / viewport.0 as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * (y as f32 + 0.5) / viewport.1 as f32;
        let unproject = |depth: f32| {
            let world = camera.inverse_view_projection * Vec4::new(ndc_x, ndc_y, depth, 1.0);
            world.truncate() / world.w
        };

        let origin = unproject(0.0);
        let direction = (unproject(1.0) - origin).try_normalize()?;
        let hit = self.closest_hit(origin, direction)?;

        let clip = camera.view_projection() * hit.surface.world_position.extend(1.0);
        let depth = clip.z / clip.w;
        (0.0..CLEAR_DEPTH).contains(&depth).then_some((depth, hit.surface))
    }

    fn closest_hit(&self, origin: Vec3, direction: Vec3) -> Option<Hit> {
        let ground = self
            .ground
            .and_then(|ground| intersect_ground(&ground, origin, direction));
        self.cuboids
            .iter()
            .filter_map(|cuboid| intersect_cuboid(cuboid, origin, direction))
            .chain(ground)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn intersect_ground(ground: &GroundPlane, origin: Vec3, direction: Vec3) -> Option<Hit> {
    if direction.y.abs() < f32::EPSILON {
        return None;
    }
    let distance = (ground.height - origin.y) / direction.y;
    if distance <= 0.0 {
        return None;
    }
    let position = origin + direction * distance;
    let normal = if origin.y >= ground.height { Vec3::Y } else { Vec3::NEG_Y };
    Some(Hit {
        distance,
        surface: Surface {
            world_position: position,
            normal,
            uv: Vec2::new(position.x, position.z) / ground.uv_scale,
            albedo: ground.albedo,
        },
    })
}

// Slab test; the entry face gives the normal.
fn intersect_cuboid(cuboid: &Cuboid, origin: Vec3, direction: Vec3) -> Option<Hit> {
    let min = cuboid.center - cuboid.half_extents;
    let max = cuboid.center + cuboid.half_extents;
    let inverse = direction.recip();

    let t0 = (min - origin) * inverse;
    let t1 = (max - origin) * inverse;
    let near = t0.min(t1);
    let far = t0.max(t1);

    let entry = near.max_element();
    let exit = far.min_element();
    if entry > exit || exit <= 0.0 || entry <= 0.0 {
        return None;
    }

    let axis = if entry == near.x {
        0
    } else if entry == near.y {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = -direction[axis].signum();

    let position = origin + direction * entry;
    let local = (position - min) / (max - min);
    let uv = match axis {
        0 => Vec2::new(local.z, local.y),
        1 => Vec2::new(local.x, local.z),
        _ => Vec2::new(local.x, local.y),
    };

    Some(Hit {
        distance: entry,
        surface: Surface {
            world_position: position,
            normal,
            uv,
            albedo: cuboid.albedo,
        },
    })
}

impl DepthProvider for RaycastScene {
    fn render_depth(&self, camera: &CameraMatrices, depth: &mut DepthBuffer) {
        let viewport = (depth.width(), depth.height());
        depth
            .data_mut()
            .par_chunks_mut(viewport.0 as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, sample) in row.iter_mut().enumerate() {
                    *sample = self
                        .trace_pixel(camera, viewport, x as u32, y as u32)
                        .map_or(CLEAR_DEPTH, |(depth, _)| depth);
                }
            });
    }
}

impl SurfaceProvider for RaycastScene {
    fn render_surfaces(&self, camera: &CameraMatrices, surfaces: &mut SurfaceBuffer) {
        let viewport = (surfaces.width(), surfaces.height());
        surfaces
            .data_mut()
            .par_chunks_mut(viewport.0 as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, surface) in row.iter_mut().enumerate() {
                    *surface = self
                        .trace_pixel(camera, viewport, x as u32, y as u32)
                        .map(|(_, surface)| surface);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Camera, Transform};

    fn top_down() -> CameraMatrices {
        let transform = Transform::from_xyz(0.0, 20.0, 0.0).looking_at(Vec3::ZERO, Vec3::NEG_Z);
        let camera = Camera {
            aspect_ratio: 1.0,
            ..Default::default()
        };
        camera.matrices(&transform)
    }

    #[test]
    fn center_pixel_hits_the_ground() {
        let scene = RaycastScene::new().with_ground(GroundPlane {
            height: 0.0,
            albedo: Vec3::ONE,
            uv_scale: 1.0,
        });
        let (depth, surface) = scene.trace_pixel(&top_down(), (64, 64), 32, 32).unwrap();

        assert!(depth > 0.0 && depth < 1.0);
        assert_eq!(surface.normal, Vec3::Y);
        assert!(surface.world_position.y.abs() < 1e-3);
        assert!(Vec2::new(surface.world_position.x, surface.world_position.z).length() < 0.5);
    }

    #[test]
    fn cuboid_occludes_the_ground() {
        let scene = RaycastScene::new()
            .with_ground(GroundPlane {
                height: 0.0,
                albedo: Vec3::ONE,
                uv_scale: 1.0,
            })
            .with_cuboid(Cuboid {
                center: Vec3::new(0.0, 5.0, 0.0),
                half_extents: Vec3::ONE,
                albedo: Vec3::X,
            });
        let (_, surface) = scene.trace_pixel(&top_down(), (64, 64), 32, 32).unwrap();

        assert_eq!(surface.albedo, Vec3::X);
        assert_eq!(surface.normal, Vec3::Y);
        assert!((surface.world_position.y - 6.0).abs() < 1e-3);
    }

    #[test]
    fn empty_scene_leaves_clear_depth() {
        let camera = top_down();
        let mut depth = DepthBuffer::new(16, 16);
        depth.data_mut().fill(0.3);
        RaycastScene::new().render_depth(&camera, &mut depth);
        assert!(depth.data().iter().all(|&d| d == CLEAR_DEPTH));

        let mut surfaces = SurfaceBuffer::new(16, 16);
        RaycastScene::new().render_surfaces(&camera, &mut surfaces);
        assert!(surfaces.get(8, 8).is_none());
    }

    #[test]
    fn demo_scene_has_a_hundred_cubes() {
        assert_eq!(RaycastScene::demo().cuboids().len(), 100);
    }
}
