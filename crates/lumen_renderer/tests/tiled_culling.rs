use std::collections::BTreeSet;

use glam::Vec3;
use lumen_core::{CameraMatrices, LumenConfig, config::ViewportConfig};
use lumen_lights::{LightSnapshot, LightStore, PointLight};
use lumen_renderer::{
    CullStats, Cuboid, DepthBuffer, DepthProvider, GroundPlane, LightCuller, RaycastScene,
    RenderError, SENTINEL, SurfaceBuffer, SurfaceProvider, TileFrustum, TileGrid,
    VisibleLightIndexBuffer,
};

/// The overview camera from the default configuration.
fn overview_camera(width: u32, height: u32) -> CameraMatrices {
    let config = LumenConfig::default();
    let camera = config.camera.camera(ViewportConfig { width, height });
    camera.matrices(&config.camera.transform())
}

fn scenario_lights() -> Vec<PointLight> {
    [(0.0, 0.0), (36.0, 0.0), (0.0, 36.0), (36.0, 36.0)]
        .into_iter()
        .map(|(x, z)| PointLight::new(Vec3::new(x, 12.0, z), Vec3::ONE, 1.0, 10.0))
        .collect()
}

/// Ground plus a cube under each scenario light and two in the middle.
fn scenario_scene() -> RaycastScene {
    let cube = |x: f32, z: f32| Cuboid {
        center: Vec3::new(x, 5.0, z),
        half_extents: Vec3::ONE,
        albedo: Vec3::ONE,
    };
    RaycastScene::new()
        .with_ground(GroundPlane {
            height: 0.0,
            albedo: Vec3::splat(0.8),
            uv_scale: 4.0,
        })
        .with_cuboid(cube(0.0, 0.0))
        .with_cuboid(cube(36.0, 0.0))
        .with_cuboid(cube(0.0, 36.0))
        .with_cuboid(cube(36.0, 36.0))
        .with_cuboid(cube(16.0, 16.0))
        .with_cuboid(cube(20.0, 20.0))
}

/// 64 lights of mixed radii scattered over the demo scene.
fn scattered_lights() -> Vec<PointLight> {
    let mut lights = Vec::new();
    for i in 0..8 {
        for j in 0..8 {
            let position = Vec3::new(
                i as f32 * 5.0 - 2.0,
                1.0 + ((i + j) % 4) as f32 * 2.0,
                j as f32 * 5.0 - 2.0,
            );
            let radius = 2.0 + ((i * 3 + j) % 5) as f32;
            lights.push(PointLight::new(position, Vec3::ONE, 1.0, radius));
        }
    }
    lights
}

struct CulledFrame {
    grid: TileGrid,
    depth: DepthBuffer,
    visible: VisibleLightIndexBuffer,
    stats: CullStats,
}

fn cull_frame(
    width: u32,
    height: u32,
    camera: &CameraMatrices,
    scene: &RaycastScene,
    lights: &LightSnapshot,
    max_per_tile: usize,
) -> CulledFrame {
    let grid = TileGrid::new(width, height).unwrap();
    let mut depth = DepthBuffer::new(width, height);
    scene.render_depth(camera, &mut depth);

    let mut visible = VisibleLightIndexBuffer::new(&grid, max_per_tile).unwrap();
    let stats = LightCuller::new(max_per_tile)
        .cull(&grid, camera, &depth, lights, &mut visible)
        .unwrap();

    CulledFrame {
        grid,
        depth,
        visible,
        stats,
    }
}

fn tile_frustum(frame: &CulledFrame, camera: &CameraMatrices, tile: usize) -> TileFrustum {
    let rect = frame.grid.tile_rect(tile);
    TileFrustum::new(
        camera.inverse_projection,
        (frame.grid.width(), frame.grid.height()),
        rect,
        frame.depth.bounds_in(rect),
    )
}

fn sphere_in_tile(
    frame: &CulledFrame,
    camera: &CameraMatrices,
    tile: usize,
    light: &PointLight,
) -> bool {
    tile_frustum(frame, camera, tile)
        .sphere_visible(camera.view.transform_point3(light.position), light.radius)
}

#[test]
fn full_hd_tile_counts() {
    let grid = TileGrid::new(1920, 1080).unwrap();
    assert_eq!((grid.tiles_x(), grid.tiles_y()), (120, 68));
    assert_eq!(grid.tile_count(), 8160);
}

#[test]
fn scenario_lights_only_appear_where_their_sphere_reaches() {
    let camera = overview_camera(1920, 1080);
    let lights = LightSnapshot::from_lights(scenario_lights(), None);
    let frame = cull_frame(1920, 1080, &camera, &scenario_scene(), &lights, 1024);

    assert_eq!(frame.stats.tiles, 8160);
    assert_eq!(frame.stats.overflowed_tiles, 0);

    let mut seen = BTreeSet::new();
    for tile in 0..frame.grid.tile_count() {
        let listed: BTreeSet<usize> = frame.visible.tile_lights(tile).collect();
        let expected: BTreeSet<usize> = lights
            .point_lights()
            .iter()
            .enumerate()
            .filter(|(_, light)| sphere_in_tile(&frame, &camera, tile, light))
            .map(|(index, _)| index)
            .collect();
        assert_eq!(listed, expected, "tile {tile}");
        seen.extend(listed);
    }

    // Each light sits 6 units above a visible cube top.
    assert_eq!(seen, (0..4).collect());
}

#[test]
fn no_lit_pixel_misses_its_light() {
    let (width, height) = (320, 180);
    let camera = overview_camera(width, height);
    let scene = RaycastScene::demo();
    let lights = LightSnapshot::from_lights(scattered_lights(), None);
    let frame = cull_frame(width, height, &camera, &scene, &lights, 1024);

    let mut surfaces = SurfaceBuffer::new(width, height);
    scene.render_surfaces(&camera, &mut surfaces);

    let mut checked = 0;
    for y in 0..height {
        for x in 0..width {
            let Some(surface) = surfaces.get(x, y) else {
                continue;
            };
            let tile = frame.grid.tile_index_for(x, y);
            let listed: BTreeSet<usize> = frame.visible.tile_lights(tile).collect();

            for (index, light) in lights.point_lights().iter().enumerate() {
                // small margin for depth buffer precision
                if light.position.distance(surface.world_position) < light.radius - 0.25 {
                    assert!(
                        listed.contains(&index),
                        "light {index} reaches pixel ({x}, {y}) but is missing from tile {tile}"
                    );
                    checked += 1;
                }
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn culling_is_deterministic() {
    let camera = overview_camera(320, 180);
    let lights = LightSnapshot::from_lights(scattered_lights(), None);
    let first = cull_frame(320, 180, &camera, &RaycastScene::demo(), &lights, 1024);
    let second = cull_frame(320, 180, &camera, &RaycastScene::demo(), &lights, 1024);

    assert_eq!(first.visible, second.visible);
    assert_eq!(first.stats, second.stats);
}

#[test]
fn every_tile_range_is_terminated_or_full() {
    let camera = overview_camera(320, 180);
    let lights = LightSnapshot::from_lights(scattered_lights(), None);

    for max_per_tile in [1, 3, 64] {
        let frame = cull_frame(320, 180, &camera, &RaycastScene::demo(), &lights, max_per_tile);
        for tile in 0..frame.grid.tile_count() {
            let slots = frame.visible.tile_slots(tile);
            let listed: Vec<i32> = slots.iter().copied().take_while(|&i| i != SENTINEL).collect();

            if listed.len() < max_per_tile {
                assert_eq!(slots[listed.len()], SENTINEL, "tile {tile}");
            }
            assert!(listed.iter().all(|&i| (0..64).contains(&i)));
            assert!(listed.windows(2).all(|pair| pair[0] < pair[1]), "tile {tile}");
        }
    }
}

#[test]
fn overflowing_tiles_keep_the_first_lights() {
    let camera = overview_camera(320, 180);
    // Huge spheres around the scene reach every tile.
    let lights = LightSnapshot::from_lights(
        (0..5)
            .map(|i| PointLight::new(Vec3::new(18.0, 10.0 + i as f32, 18.0), Vec3::ONE, 1.0, 500.0))
            .collect(),
        None,
    );
    let frame = cull_frame(320, 180, &camera, &RaycastScene::demo(), &lights, 2);

    assert_eq!(frame.stats.overflowed_tiles, frame.grid.tile_count());
    assert_eq!(frame.stats.max_in_tile, 2);
    for tile in 0..frame.grid.tile_count() {
        assert_eq!(frame.visible.tile_slots(tile), &[0, 1]);
    }
}

#[test]
fn light_behind_the_camera_is_never_listed() {
    let config = LumenConfig::default();
    let camera = overview_camera(320, 180);
    let behind = config.camera.position - config.camera.transform().forward() * 30.0;

    let mut lights = scattered_lights();
    lights.push(PointLight::new(behind, Vec3::ONE, 1.0, 5.0));
    let behind_index = lights.len() - 1;
    let lights = LightSnapshot::from_lights(lights, None);

    let frame = cull_frame(320, 180, &camera, &RaycastScene::demo(), &lights, 1024);
    for tile in 0..frame.grid.tile_count() {
        assert!(frame.visible.tile_lights(tile).all(|index| index != behind_index));
    }
}

#[test]
fn store_snapshot_feeds_the_culler() {
    let config = LumenConfig::default();
    let store = LightStore::new(config.culling.max_lights);
    for light in &config.lights.point {
        store.add_request(&(*light).into()).unwrap();
    }
    assert_eq!(store.len(), 5);

    let camera = overview_camera(320, 180);
    let frame = cull_frame(320, 180, &camera, &RaycastScene::demo(), &store.snapshot(), 1024);
    assert!(frame.stats.total_visible > 0);
}

#[test]
fn resized_viewport_requires_a_reallocated_buffer() {
    let camera = overview_camera(320, 180);
    let lights = LightSnapshot::from_lights(scenario_lights(), None);
    let mut grid = TileGrid::new(320, 180).unwrap();
    let mut visible = VisibleLightIndexBuffer::new(&grid, 16).unwrap();

    assert!(grid.resize(640, 360).unwrap());
    let mut depth = DepthBuffer::new(640, 360);
    RaycastScene::demo().render_depth(&camera, &mut depth);

    let culler = LightCuller::new(16);
    let result = culler.cull(&grid, &camera, &depth, &lights, &mut visible);
    assert!(matches!(result, Err(RenderError::Configuration(_))));

    visible.resize(&grid).unwrap();
    assert!(culler.cull(&grid, &camera, &depth, &lights, &mut visible).is_ok());
}
