use glam::{Mat4, Vec3, Vec4};

use crate::tile_grid::TileRect;

/// Half-space `dot(normal, p) - offset >= 0`, with a unit normal pointing
/// into the frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    /// Plane through three points, normal along `(b - a) x (c - a)`.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            normal,
            offset: normal.dot(a),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }
}

/// View-space volume of one tile: four side planes through the tile edges
/// and a near/far slab from the tile's depth extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileFrustum {
    pub planes: [Plane; 6],
}

impl TileFrustum {
    /// `depth_bounds` is the tile's `(min, max)` NDC depth; `None` (nothing
    /// drawn in the tile) spans the whole camera range.
    pub fn new(
        inverse_projection: Mat4,
        viewport: (u32, u32),
        rect: TileRect,
        depth_bounds: Option<(f32, f32)>,
    ) -> Self {
        let unproject = |px: u32, py: u32, depth: f32| {
            let ndc_x = 2.0 * px as f32 / viewport.0 as f32 - 1.0;
            let ndc_y = 1.0 - 2.0 * py as f32 / viewport.1 as f32;
            let view = inverse_projection * Vec4::new(ndc_x, ndc_y, depth, 1.0);
            view.truncate() / view.w
        };

        // Corners in winding order: top-left, top-right, bottom-right, bottom-left.
        let corners = [
            (rect.x0, rect.y0),
            (rect.x1, rect.y0),
            (rect.x1, rect.y1),
            (rect.x0, rect.y1),
        ];
        let near_points = corners.map(|(x, y)| unproject(x, y, 0.0));
        let far_points = corners.map(|(x, y)| unproject(x, y, 1.0));

        let center = {
            let ndc_x = (rect.x0 + rect.x1) as f32 / viewport.0 as f32 - 1.0;
            let ndc_y = 1.0 - (rect.y0 + rect.y1) as f32 / viewport.1 as f32;
            let view = inverse_projection * Vec4::new(ndc_x, ndc_y, 0.5, 1.0);
            view.truncate() / view.w
        };

        let side = |i: usize| {
            let j = (i + 1) % 4;
            let plane = Plane::from_points(near_points[i], far_points[i], far_points[j]);
            if plane.signed_distance(center) < 0.0 {
                plane.flipped()
            } else {
                plane
            }
        };

        let (min_depth, max_depth) = depth_bounds.unwrap_or((0.0, 1.0));
        let view_distance = |depth: f32| {
            let view = inverse_projection * Vec4::new(0.0, 0.0, depth, 1.0);
            -view.z / view.w
        };
        let near_distance = view_distance(min_depth);
        let far_distance = view_distance(max_depth);

        Self {
            planes: [
                side(0),
                side(1),
                side(2),
                side(3),
                // view space looks down -Z
                Plane {
                    normal: Vec3::NEG_Z,
                    offset: near_distance,
                },
                Plane {
                    normal: Vec3::Z,
                    offset: -far_distance,
                },
            ],
        }
    }

    /// Conservative sphere test against all six half-spaces.
    pub fn sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.sphere_visible(point, 0.0)
    }
}
