use rapier3d::parry::{
    query::{PointQuery, Ray, RayCast},
    shape::Triangle,
};

use super::{
    settings::DIST_EPS,
    types::{Point3, Segment, Vec3},
};

/// Closest pair of points between a segment and a triangle.
#[derive(Clone, Copy, Debug)]
pub struct ClosestPoints {
    pub on_segment: Point3,
    pub on_triangle: Point3,
    pub distance: f32,
}

impl ClosestPoints {
    #[inline]
    fn new(on_segment: Point3, on_triangle: Point3) -> Self {
        Self {
            on_segment,
            on_triangle,
            distance: (on_segment - on_triangle).norm(),
        }
    }
}

/// Exact closest points between `segment` and `tri`.
///
/// If the segment crosses the triangle, both points are the crossing point and
/// the distance is zero. Otherwise the closest pair has one point on a segment
/// endpoint or one point on a triangle edge, so the minimum over:
/// - each segment endpoint projected onto the triangle,
/// - the segment against each triangle edge,
///
/// is the exact answer. Ties keep the first candidate in that order.
pub fn closest_points_segment_triangle(segment: &Segment, tri: &Triangle) -> ClosestPoints {
    if let Some(p) = segment_triangle_crossing(segment, tri) {
        return ClosestPoints::new(p, p);
    }

    let mut best = ClosestPoints::new(segment.a, project_on_triangle(tri, &segment.a));

    let candidate = ClosestPoints::new(segment.b, project_on_triangle(tri, &segment.b));
    if candidate.distance < best.distance {
        best = candidate;
    }

    for (e0, e1) in [(tri.a, tri.b), (tri.b, tri.c), (tri.c, tri.a)] {
        let (on_segment, on_edge) = closest_points_segment_segment(segment.a, segment.b, e0, e1);
        let candidate = ClosestPoints::new(on_segment, on_edge);
        if candidate.distance < best.distance {
            best = candidate;
        }
    }

    best
}

/// Closest point of `tri` to `p`.
#[inline]
pub fn project_on_triangle(tri: &Triangle, p: &Point3) -> Point3 {
    tri.project_local_point(p, true).point
}

/// Point where `segment` crosses the triangle, if it does.
///
/// Segments lying in the triangle plane are not reported here; their distance
/// is zero through the endpoint and edge candidates anyway.
fn segment_triangle_crossing(segment: &Segment, tri: &Triangle) -> Option<Point3> {
    let ab = tri.b - tri.a;
    let ac = tri.c - tri.a;
    let n = ab.cross(&ac);
    if n.norm_squared() <= DIST_EPS * DIST_EPS {
        return None;
    }

    let da = n.dot(&(segment.a - tri.a));
    let db = n.dot(&(segment.b - tri.a));
    if (da > 0.0 && db > 0.0) || (da < 0.0 && db < 0.0) {
        return None;
    }
    let denom = da - db;
    if denom.abs() <= f32::EPSILON {
        return None;
    }

    let t = (da / denom).clamp(0.0, 1.0);
    let p = segment.a + (segment.b - segment.a) * t;

    // Inside test: p must be on the inner side of all three edges.
    let inside = n.dot(&(tri.b - tri.a).cross(&(p - tri.a))) >= 0.0
        && n.dot(&(tri.c - tri.b).cross(&(p - tri.b))) >= 0.0
        && n.dot(&(tri.a - tri.c).cross(&(p - tri.c))) >= 0.0;

    inside.then_some(p)
}

/// Closest points between segments `p1q1` and `p2q2`.
///
/// Returns `(point on first, point on second)`. Degenerate (zero length)
/// segments are treated as points.
pub fn closest_points_segment_segment(
    p1: Point3,
    q1: Point3,
    p2: Point3,
    q2: Point3,
) -> (Point3, Point3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let eps = DIST_EPS * DIST_EPS;

    let (s, t) = if a <= eps && e <= eps {
        (0.0, 0.0)
    } else if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel: any s works, pick the start.
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// A downward probe hit against a single triangle.
#[derive(Clone, Copy, Debug)]
pub struct ProbeHit {
    /// Distance travelled along the probe.
    pub distance: f32,
    /// Surface normal at the hit, oriented against the probe (upward facing).
    pub normal: Vec3,
}

/// Cast a ray from `origin` straight down (along -Y) against `tri`, up to
/// `max_distance`. Triangles are double-sided.
pub fn cast_down_against_triangle(
    tri: &Triangle,
    origin: Point3,
    max_distance: f32,
) -> Option<ProbeHit> {
    let dir = -Vec3::y();
    let ray = Ray::new(origin, dir);
    let hit = tri.cast_local_ray_and_get_normal(&ray, max_distance, true)?;

    let mut normal = hit.normal;
    if normal.dot(&dir) > 0.0 {
        normal = -normal;
    }
    let len = normal.norm();
    if len <= DIST_EPS {
        return None;
    }

    Some(ProbeHit {
        distance: hit.time_of_impact,
        normal: normal / len,
    })
}
