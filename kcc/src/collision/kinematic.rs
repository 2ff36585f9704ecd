use super::{
    proximity,
    settings::{
        BIN_STEPS, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_SLOPE_DEG, DEFAULT_SKIN,
        DEFAULT_STEP_HEIGHT, DIST_EPS, MIN_MOVE_SQ, MIN_STEP_UP, PUSH_OUT_EPS, QUERY_MARGIN,
        SLOPE_TOLERANCE_DEG, STEP_PROBE_INSET,
    },
    types::{CapsuleSpec, Contact, MoveResult, Point3, Vec3, up},
    world::CollisionWorld,
};

/// How the resolver treats a blocked move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SweepMode {
    /// Horizontal locomotion: slide, step up ledges, treat steep slopes as walls.
    #[default]
    Walk,
    /// Airborne motion: slide along whatever is hit, never step.
    Fall,
    /// Ground snapping: stop at the first contact, no slide.
    Snap,
}

/// Parameters for a single kinematic movement attempt.
///
/// - Movement is expressed as a desired translation for this substep (meters).
/// - `start_pos` is the capsule foot. The caller guarantees it is not deeper than the
///   skin inside any surface; the resolver pushes out of skin contacts on the way.
#[derive(Clone, Copy, Debug)]
pub struct MoveRequest {
    /// Starting foot position.
    pub start_pos: Vec3,
    /// Desired world-space translation.
    pub desired_translation: Vec3,
    pub capsule: CapsuleSpec,
    /// Separation to keep from surfaces (meters).
    pub skin: f32,
    /// Max resolver rounds (for corners).
    pub max_iterations: u32,
    /// Tallest ledge a `Walk` move climbs (meters).
    pub step_height: f32,
    /// Smallest up component of a walkable contact normal.
    pub walkable_normal_y: f32,
    pub mode: SweepMode,
}

impl MoveRequest {
    #[inline]
    pub fn with_defaults(start_pos: Vec3, desired_translation: Vec3, capsule: CapsuleSpec) -> Self {
        Self {
            start_pos,
            desired_translation,
            capsule,
            skin: DEFAULT_SKIN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            step_height: DEFAULT_STEP_HEIGHT,
            walkable_normal_y: walkable_normal_y(DEFAULT_MAX_SLOPE_DEG),
            mode: SweepMode::Walk,
        }
    }

    #[inline]
    pub fn with_mode(mut self, mode: SweepMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same settings, new move.
    #[inline]
    pub fn retarget(&self, start_pos: Vec3, desired_translation: Vec3, mode: SweepMode) -> Self {
        Self {
            start_pos,
            desired_translation,
            mode,
            ..*self
        }
    }

    #[inline]
    fn clearance(&self) -> f32 {
        self.capsule.radius + self.skin
    }
}

/// Smallest normal up component for a surface inclined at most `max_slope_deg`
/// (plus the slope tolerance) from horizontal.
#[inline]
pub fn walkable_normal_y(max_slope_deg: f32) -> f32 {
    (max_slope_deg + SLOPE_TOLERANCE_DEG)
        .clamp(0.0, 90.0)
        .to_radians()
        .cos()
}

/// Distance from the capsule axis at `foot` to the world, looking slightly past `clearance`.
#[inline]
fn query_at(world: &CollisionWorld, capsule: &CapsuleSpec, clearance: f32, foot: Vec3) -> Contact {
    proximity::distance(&capsule.segment_at(foot), world, clearance + QUERY_MARGIN)
}

/// Largest fraction `t` in `[0, 1]` such that the capsule moved by `delta * t` keeps at
/// least `clearance` from the world.
///
/// Binary search over `BIN_STEPS` steps; the answer is accurate to `2^-BIN_STEPS` and
/// never overshoots a sampled contact. Returns `1.0` if the whole move is clear.
pub fn time_of_impact(
    world: &CollisionWorld,
    capsule: &CapsuleSpec,
    start: Vec3,
    delta: Vec3,
    clearance: f32,
) -> f32 {
    if query_at(world, capsule, clearance, start + delta).distance >= clearance {
        return 1.0;
    }

    let mut lo = 0.0_f32;
    let mut hi = 1.0_f32;
    for _ in 0..BIN_STEPS {
        let mid = 0.5 * (lo + hi);
        if query_at(world, capsule, clearance, start + delta * mid).distance >= clearance {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Kinematic sweep-and-slide for a capsule against the static world.
///
/// Algorithm, per round (up to `max_iterations`):
/// - If the capsule at the end of the remaining move is clear, take it and finish.
/// - Otherwise advance to the time of impact and push out of any skin contact along
///   the contact normal.
/// - `Snap` stops here.
/// - `Walk` against a non-walkable contact tries to step up onto a ledge no taller
///   than `step_height`; a committed step finishes the move.
/// - Slide: drop the component of the remaining move that points into the contact.
///   In `Walk`, steep upward-facing contacts are flattened to their horizontal part
///   first, so they block like walls instead of being climbed.
///
/// An empty world passes the move through untouched.
pub fn move_capsule(world: &CollisionWorld, req: MoveRequest) -> MoveResult {
    let mut pos = req.start_pos;
    let mut remaining = req.desired_translation;

    if world.is_empty() {
        return MoveResult {
            end_pos: pos + remaining,
            last_contact: None,
            remaining: Vec3::zeros(),
            stepped: false,
            iterations: 0,
        };
    }

    let capsule = &req.capsule;
    let clearance = req.clearance();
    let mut last_contact = None;
    let mut stepped = false;
    let mut iterations = 0;

    while iterations < req.max_iterations {
        if remaining.norm_squared() <= MIN_MOVE_SQ {
            remaining = Vec3::zeros();
            break;
        }
        iterations += 1;

        if query_at(world, capsule, clearance, pos + remaining).distance >= clearance {
            pos += remaining;
            remaining = Vec3::zeros();
            break;
        }

        let t = time_of_impact(world, capsule, pos, remaining, clearance);
        let advance = remaining * t;
        pos += advance;
        remaining -= advance;

        let contact = query_at(world, capsule, clearance, pos);
        let Some(normal) = contact.normal else {
            continue;
        };
        if contact.distance < clearance {
            pos += normal * (clearance - contact.distance + PUSH_OUT_EPS);
        }
        last_contact = Some(contact);

        if req.mode == SweepMode::Snap {
            break;
        }

        let walkable = normal.y >= req.walkable_normal_y;

        if req.mode == SweepMode::Walk && !walkable {
            let forward = Vec3::new(remaining.x, 0.0, remaining.z);
            if let Some(stepped_pos) = try_step_up(world, &req, pos, forward, normal, t) {
                log::trace!(
                    "kcc: stepped up {:.3} m at ({:.2}, {:.2}, {:.2})",
                    stepped_pos.y - pos.y,
                    pos.x,
                    pos.y,
                    pos.z
                );
                pos = stepped_pos;
                remaining = Vec3::zeros();
                stepped = true;
                break;
            }
        }

        let slide_normal = if req.mode == SweepMode::Walk && !walkable && normal.y > 0.0 {
            Vec3::new(normal.x, 0.0, normal.z)
                .try_normalize(DIST_EPS)
                .unwrap_or(normal)
        } else {
            normal
        };
        let into = remaining.dot(&slide_normal);
        if into < 0.0 {
            remaining -= slide_normal * into;
        }
    }

    if iterations >= req.max_iterations && remaining.norm_squared() > MIN_MOVE_SQ {
        log::trace!(
            "kcc: resolver used all {} rounds, {:.4} m left unresolved",
            req.max_iterations,
            remaining.norm()
        );
    }

    // Corners can push the capsule from one surface into another; settle once more.
    let settle = query_at(world, capsule, clearance, pos);
    if let Some(n) = settle.normal {
        if settle.distance < clearance {
            log::trace!(
                "kcc: settling {:.4} m skin overlap at end of move",
                clearance - settle.distance
            );
            pos += n * (clearance - settle.distance + PUSH_OUT_EPS);
        }
    }

    MoveResult {
        end_pos: pos,
        last_contact,
        remaining,
        stepped,
        iterations,
    }
}

/// Try to climb a ledge blocking `forward` from `pos`.
///
/// The capsule is raised (less the further this round already travelled), must be clear
/// both raised and raised-and-moved, and a downward probe just across the blocking edge
/// must find a walkable top above the current foot and no higher than `step_height`.
///
/// The probe is offset against the horizontal part of `normal`, not along `forward`, so
/// angled approaches look over the same edge a head-on approach does.
fn try_step_up(
    world: &CollisionWorld,
    req: &MoveRequest,
    pos: Vec3,
    forward: Vec3,
    normal: Vec3,
    consumed: f32,
) -> Option<Vec3> {
    if req.step_height <= 0.0 || forward.norm_squared() <= MIN_MOVE_SQ {
        return None;
    }
    let raise = req.step_height.min(req.step_height * (1.0 - consumed));
    if raise <= MIN_STEP_UP {
        return None;
    }

    let capsule = &req.capsule;
    let clearance = req.clearance();

    let raised = pos + up() * raise;
    if query_at(world, capsule, clearance, raised).distance < clearance {
        return None;
    }
    let target = raised + forward;
    if query_at(world, capsule, clearance, target).distance < clearance {
        return None;
    }

    let across = Vec3::new(-normal.x, 0.0, -normal.z)
        .try_normalize(DIST_EPS)
        .unwrap_or_else(|| forward.normalize());
    let probe =
        target + across * (clearance + STEP_PROBE_INSET) + up() * (capsule.radius + capsule.height);
    let reach = raise + capsule.radius + capsule.height;
    let top = proximity::probe_down(world, Point3::from(probe), reach)?;

    let rise = top.point.y - pos.y;
    let climbable = rise > 0.0 && rise <= req.step_height && top.normal.y >= req.walkable_normal_y;
    climbable.then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{
        types::{Quat, Transform},
        world::{CollisionWorldBuilder, StaticSurface, SurfaceGeometry},
    };

    const R: f32 = 0.35;
    const H: f32 = 1.0;

    fn capsule() -> CapsuleSpec {
        CapsuleSpec::new(R, H)
    }

    fn floor() -> StaticSurface {
        StaticSurface::new(
            0,
            SurfaceGeometry::Quad {
                half_extents: [20.0, 20.0],
            },
            Transform::default(),
        )
    }

    /// Box spanning x in [x0, x0 + 1], standing on the floor.
    fn block(id: u32, x0: f32, height: f32) -> StaticSurface {
        StaticSurface::new(
            id,
            SurfaceGeometry::Cuboid {
                half_extents: Vec3::new(0.5, 0.5 * height, 3.0),
            },
            Transform::from_translation(Vec3::new(x0 + 0.5, 0.5 * height, 0.0)),
        )
    }

    /// Wall in the plane x = `x`.
    fn wall(id: u32, x: f32) -> StaticSurface {
        StaticSurface::new(
            id,
            SurfaceGeometry::Quad {
                half_extents: [5.0, 20.0],
            },
            Transform::new(
                Vec3::new(x, 0.0, 0.0),
                Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2),
            ),
        )
    }

    /// Wall in the plane z = `z`.
    fn wall_z(id: u32, z: f32) -> StaticSurface {
        StaticSurface::new(
            id,
            SurfaceGeometry::Quad {
                half_extents: [20.0, 5.0],
            },
            Transform::new(
                Vec3::new(0.0, 0.0, z),
                Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2),
            ),
        )
    }

    fn resting_foot(x: f32) -> Vec3 {
        Vec3::new(x, DEFAULT_SKIN + 0.005, 0.0)
    }

    #[test]
    fn empty_world_passes_motion_through() {
        let req = MoveRequest::with_defaults(Vec3::zeros(), Vec3::new(3.0, -2.0, 1.0), capsule());
        let res = move_capsule(&CollisionWorld::empty(), req);
        assert_eq!(res.end_pos, Vec3::new(3.0, -2.0, 1.0));
        assert!(res.last_contact.is_none());
        assert_eq!(res.iterations, 0);
    }

    #[test]
    fn free_move_is_taken_whole() {
        let world = CollisionWorldBuilder::new().add_surface(floor()).build();
        let start = resting_foot(0.0);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.5, 0.0, 0.2), capsule());
        let res = move_capsule(&world, req);
        assert!((res.applied(start) - Vec3::new(0.5, 0.0, 0.2)).norm() < 1.0e-6);
        assert_eq!(res.remaining, Vec3::zeros());
        assert_eq!(res.iterations, 1);
    }

    #[test]
    fn head_on_wall_stops_outside_radius() {
        let world = CollisionWorldBuilder::new()
            .add_surface(floor())
            .add_surface(wall(1, 1.0))
            .build();
        let start = resting_foot(0.5);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.3, 0.0, 0.0), capsule());
        let res = move_capsule(&world, req);

        assert!(!res.stepped);
        assert!(res.end_pos.x <= 1.0 - R);
        assert!(res.end_pos.x > 1.0 - R - DEFAULT_SKIN - 0.01);
        let d = proximity::distance(&capsule().segment_at(res.end_pos), &world, 1.0);
        assert!(d.distance >= R);
    }

    #[test]
    fn diagonal_into_wall_keeps_tangential_motion() {
        let world = CollisionWorldBuilder::new()
            .add_surface(floor())
            .add_surface(wall(1, 0.5))
            .build();
        let start = resting_foot(0.0);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.4, 0.0, 0.4), capsule());
        let res = move_capsule(&world, req);

        assert!(res.last_contact.is_some());
        assert!(res.end_pos.x <= 0.5 - R);
        assert!((res.end_pos.z - 0.4).abs() < 1.0e-3);
        assert!((res.end_pos.y - start.y).abs() < 1.0e-3);
    }

    #[test]
    fn low_ledge_is_stepped_onto() {
        let world = CollisionWorldBuilder::new()
            .add_surface(floor())
            .add_surface(block(1, 1.0, 0.2))
            .build();
        // Start just short of touching the ledge corner.
        let start = resting_foot(0.6);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.08, 0.0, 0.0), capsule());
        let res = move_capsule(&world, req);

        assert!(res.stepped);
        assert!(res.end_pos.y > start.y);
        assert!((res.end_pos.x - 0.68).abs() < 1.0e-3);
    }

    #[test]
    fn angled_approach_steps_onto_low_ledge() {
        let world = CollisionWorldBuilder::new()
            .add_surface(floor())
            .add_surface(block(1, 1.0, 0.2))
            .build();
        // 45 degrees off the ledge face; the point ahead along the motion is still over the floor.
        let start = resting_foot(0.6);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.1, 0.0, 0.1), capsule());
        let res = move_capsule(&world, req);

        assert!(res.stepped);
        assert!(res.end_pos.y > start.y + MIN_STEP_UP);
        assert!((res.end_pos.x - 0.7).abs() < 1.0e-3);
        assert!((res.end_pos.z - 0.1).abs() < 1.0e-3);
    }

    #[test]
    fn start_inside_skin_is_pushed_out() {
        let world = CollisionWorldBuilder::new().add_surface(wall(1, 2.0)).build();
        // Axis 0.2 m from the wall: 0.15 m inside the radius.
        let start = Vec3::new(1.8, 0.0, 0.0);

        let res = move_capsule(&world, MoveRequest::with_defaults(start, Vec3::zeros(), capsule()));
        let d = proximity::distance(&capsule().segment_at(res.end_pos), &world, 1.0);
        assert!(d.distance >= R + DEFAULT_SKIN, "distance = {}", d.distance);
        assert!((res.end_pos.x - (2.0 - R - DEFAULT_SKIN - PUSH_OUT_EPS)).abs() < 1.0e-4);

        let res = move_capsule(
            &world,
            MoveRequest::with_defaults(start, Vec3::new(0.0, 0.0, 0.1), capsule()),
        );
        let d = proximity::distance(&capsule().segment_at(res.end_pos), &world, 1.0);
        assert!(d.distance >= R + DEFAULT_SKIN, "distance = {}", d.distance);
        assert!((res.end_pos.z - 0.1).abs() < 1.0e-4);
        assert!(!res.stepped);
    }

    #[test]
    fn iteration_cap_bounds_corner_moves() {
        let world = CollisionWorldBuilder::new()
            .add_surface(wall(1, 2.0))
            .add_surface(wall_z(2, 2.0))
            .build();
        let start = Vec3::new(1.0, 0.0, 1.0);
        let delta = Vec3::new(2.0, 0.0, 2.0);

        let mut req = MoveRequest::with_defaults(start, delta, capsule()).with_mode(SweepMode::Fall);
        req.max_iterations = 1;
        let res = move_capsule(&world, req);
        assert_eq!(res.iterations, 1);
        assert!(res.remaining.norm() > 0.5);
        assert!((res.end_pos - start).norm() <= delta.norm());
        assert!(res.end_pos.x <= 2.0 - R && res.end_pos.z <= 2.0 - R);
        let d = proximity::distance(&capsule().segment_at(res.end_pos), &world, 1.0);
        assert!(d.distance >= R);

        // With enough rounds the capsule settles into the corner.
        req.max_iterations = DEFAULT_MAX_ITERATIONS;
        let res = move_capsule(&world, req);
        let clearance = R + DEFAULT_SKIN;
        assert!(res.iterations <= DEFAULT_MAX_ITERATIONS);
        assert!((res.end_pos.x - (2.0 - clearance)).abs() < 0.03);
        assert!((res.end_pos.z - (2.0 - clearance)).abs() < 0.03);
    }

    #[test]
    fn tall_ledge_blocks() {
        let world = CollisionWorldBuilder::new()
            .add_surface(floor())
            .add_surface(block(1, 1.0, 0.5))
            .build();
        let start = resting_foot(0.6);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.08, 0.0, 0.0), capsule());
        let res = move_capsule(&world, req);

        assert!(!res.stepped);
        assert!(res.end_pos.x <= 1.0 - R);
        assert!((res.end_pos.y - start.y).abs() < 1.0e-3);
    }

    #[test]
    fn snap_mode_stops_without_sliding() {
        let world = CollisionWorldBuilder::new().add_surface(floor()).build();
        let start = Vec3::new(0.0, 1.0, 0.0);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.5, -2.0, 0.0), capsule())
            .with_mode(SweepMode::Snap);
        let res = move_capsule(&world, req);

        assert_eq!(res.iterations, 1);
        let c = res.last_contact.expect("contact");
        assert!((c.normal.expect("normal") - Vec3::y()).norm() < 1.0e-4);
        // Stopped on the way down, horizontal progress only up to the impact.
        assert!(res.end_pos.x < 0.5);
        assert!(res.end_pos.y >= DEFAULT_SKIN - 1.0e-4);
        assert!(res.end_pos.y < 0.05);
    }

    #[test]
    fn fall_mode_slides_along_floor() {
        let world = CollisionWorldBuilder::new().add_surface(floor()).build();
        let start = Vec3::new(0.0, 0.5, 0.0);
        let req = MoveRequest::with_defaults(start, Vec3::new(0.5, -1.0, 0.0), capsule())
            .with_mode(SweepMode::Fall);
        let res = move_capsule(&world, req);

        assert!((res.end_pos.x - 0.5).abs() < 1.0e-3);
        assert!(res.end_pos.y >= DEFAULT_SKIN - 1.0e-4);
    }

    #[test]
    fn time_of_impact_within_bisection_tolerance() {
        let world = CollisionWorldBuilder::new().add_surface(wall(1, 3.0)).build();
        let start = Vec3::zeros();
        let delta = Vec3::new(4.0, 0.0, 0.0);
        let t = time_of_impact(&world, &capsule(), start, delta, R);
        let exact = (3.0 - R) / 4.0;
        assert!(t <= exact + 1.0e-6);
        assert!(exact - t <= 1.0 / (1 << BIN_STEPS) as f32);
    }

    #[test]
    fn time_of_impact_of_clear_move_is_one() {
        let world = CollisionWorldBuilder::new().add_surface(wall(1, 3.0)).build();
        let t = time_of_impact(&world, &capsule(), Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), R);
        assert_eq!(t, 1.0);
    }

    #[test]
    fn walkable_threshold_includes_tolerance() {
        let y = walkable_normal_y(42.0);
        assert!((y - 42.5_f32.to_radians().cos()).abs() < 1.0e-6);
        assert!(10.0_f32.to_radians().cos() >= y);
        assert!(60.0_f32.to_radians().cos() < y);
    }
}
