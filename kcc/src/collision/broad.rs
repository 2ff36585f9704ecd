use nalgebra as na;
use rapier3d::parry::{
    bounding_volume::Aabb,
    partitioning::{Bvh, BvhBuildStrategy},
    shape::Triangle,
};

use super::types::{Point3, Segment, Vec3};

/// Acceleration structure for broad-phase queries over the world triangles.
///
/// Notes:
/// - One AABB per triangle; leaf `i` of the BVH is triangle `i` of the world buffer.
/// - Without a BVH the AABBs are scanned linearly. Both paths report the same
///   candidates, the BVH just visits fewer of them.
pub struct TriangleAccel {
    /// World-space bounds of each triangle, in triangle order.
    aabbs: Vec<Aabb>,
    /// BVH over `aabbs`, if one was requested and there is anything to index.
    bvh: Option<Bvh>,
}

impl TriangleAccel {
    /// Build the accelerator over `triangles`.
    pub fn build(triangles: &[Triangle], use_bvh: bool) -> Self {
        let aabbs: Vec<Aabb> = triangles.iter().map(triangle_aabb).collect();

        let bvh = if use_bvh && !aabbs.is_empty() {
            Some(Bvh::from_leaves(BvhBuildStrategy::Binned, &aabbs))
        } else {
            None
        };

        Self { aabbs, bvh }
    }

    /// Return true if this accelerator has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.aabbs.is_empty()
    }

    /// Number of indexed triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.aabbs.len()
    }

    #[inline]
    pub fn has_bvh(&self) -> bool {
        self.bvh.is_some()
    }

    /// Visit the index of every triangle whose AABB intersects `query`.
    ///
    /// Indices reference the world triangle buffer.
    pub fn for_each_candidate(&self, query: &Aabb, mut visit: impl FnMut(usize)) {
        match &self.bvh {
            Some(bvh) => {
                for leaf_idx in bvh.intersect_aabb(query) {
                    visit(leaf_idx as usize);
                }
            }
            None => {
                for (i, aabb) in self.aabbs.iter().enumerate() {
                    if aabb_intersects(aabb, query) {
                        visit(i);
                    }
                }
            }
        }
    }
}

/// World-space AABB of a triangle.
pub fn triangle_aabb(tri: &Triangle) -> Aabb {
    aabb_from_points(&[tri.a, tri.b, tri.c])
}

/// AABB around a query segment, inflated by `margin` on all sides.
///
/// Used by the proximity query with `margin = radius + skin + QUERY_MARGIN`.
pub fn segment_aabb(segment: &Segment, margin: f32) -> Aabb {
    aabb_inflate(&aabb_from_points(&[segment.a, segment.b]), margin)
}

/// AABB around a vertical probe from `origin` going `length` down the up axis,
/// inflated by `margin`.
pub fn probe_aabb(origin: Point3, length: f32, margin: f32) -> Aabb {
    let end = origin - Vec3::y() * length.max(0.0);
    aabb_inflate(&aabb_from_points(&[origin, end]), margin)
}

/// Compute the AABB of a non-empty point set.
fn aabb_from_points(points: &[Point3]) -> Aabb {
    let mut mins = points[0];
    let mut maxs = points[0];
    for p in &points[1..] {
        mins = mins.inf(p);
        maxs = maxs.sup(p);
    }
    Aabb { mins, maxs }
}

/// Inflate an AABB by `margin` on all sides.
fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = na::Vector3::new(margin, margin, margin);
    Aabb {
        mins: a.mins - delta,
        maxs: a.maxs + delta,
    }
}

/// Test two AABBs for intersection.
fn aabb_intersects(a: &Aabb, b: &Aabb) -> bool {
    !(a.maxs.x < b.mins.x
        || a.mins.x > b.maxs.x
        || a.maxs.y < b.mins.y
        || a.mins.y > b.maxs.y
        || a.maxs.z < b.mins.z
        || a.mins.z > b.maxs.z)
}
