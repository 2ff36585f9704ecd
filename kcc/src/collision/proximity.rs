use super::{
    broad,
    narrow_phase::{ClosestPoints, cast_down_against_triangle, closest_points_segment_triangle},
    settings::DIST_EPS,
    types::{Contact, Point3, Segment, Vec3},
    world::CollisionWorld,
};

/// Minimum distance between `segment` and the world, with the contact normal.
///
/// Only triangles whose bounds intersect the segment's AABB inflated by `range` are
/// considered; anything farther reports as no contact (`Contact::NONE`). Callers pass
/// `radius + skin + QUERY_MARGIN`.
///
/// The normal points from the closest world point toward the segment. If the segment
/// touches or crosses a triangle the face normal is used instead, turned toward the
/// segment midpoint. On equal distances the first triangle in world order wins.
pub fn distance(segment: &Segment, world: &CollisionWorld, range: f32) -> Contact {
    if world.is_empty() {
        return Contact::NONE;
    }

    let query = broad::segment_aabb(segment, range);
    let triangles = world.triangles();

    let mut best: Option<(usize, ClosestPoints)> = None;

    world.accel().for_each_candidate(&query, |idx| {
        let cp = closest_points_segment_triangle(segment, &triangles[idx]);
        let better = match &best {
            None => true,
            Some((best_idx, b)) => {
                cp.distance < b.distance || (cp.distance == b.distance && idx < *best_idx)
            }
        };
        if better {
            best = Some((idx, cp));
        }
    });

    let Some((idx, cp)) = best else {
        return Contact::NONE;
    };
    let distance = cp.distance;

    let normal = if distance > DIST_EPS {
        (cp.on_segment - cp.on_triangle) / distance
    } else {
        let tri = &triangles[idx];
        let face = (tri.b - tri.a).cross(&(tri.c - tri.a));
        let face = face.try_normalize(DIST_EPS).unwrap_or_else(Vec3::y);
        if face.dot(&(segment.midpoint() - cp.on_triangle)) < 0.0 {
            -face
        } else {
            face
        }
    };

    Contact {
        distance,
        normal: Some(normal),
    }
}

/// A downward probe hit against the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    /// World-space hit point.
    pub point: Point3,
    /// Upward-facing unit surface normal at the hit.
    pub normal: Vec3,
    /// Distance from the probe origin.
    pub distance: f32,
}

/// Cast a ray from `origin` straight down through at most `max_distance` and return the
/// nearest hit. Surfaces are double-sided. Returns `None` for an empty world.
pub fn probe_down(world: &CollisionWorld, origin: Point3, max_distance: f32) -> Option<GroundHit> {
    if world.is_empty() || max_distance <= 0.0 {
        return None;
    }

    let query = broad::probe_aabb(origin, max_distance, DIST_EPS);
    let triangles = world.triangles();

    let mut best: Option<(usize, GroundHit)> = None;
    world.accel().for_each_candidate(&query, |idx| {
        let Some(hit) = cast_down_against_triangle(&triangles[idx], origin, max_distance) else {
            return;
        };
        let better = match &best {
            None => true,
            Some((best_idx, b)) => {
                hit.distance < b.distance || (hit.distance == b.distance && idx < *best_idx)
            }
        };
        if better {
            best = Some((
                idx,
                GroundHit {
                    point: origin - Vec3::y() * hit.distance,
                    normal: hit.normal,
                    distance: hit.distance,
                },
            ));
        }
    });

    best.map(|(_, hit)| hit)
}
