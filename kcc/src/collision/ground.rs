use super::{
    kinematic::{MoveRequest, SweepMode, move_capsule},
    proximity::{GroundHit, probe_down},
    settings::{DIST_EPS, HOVER_MARGIN, MAX_FALL_PER_STEP, MAX_SNAP_UP_PER_STEP},
    types::{CapsuleSpec, Point3, Vec3, up},
    world::CollisionWorld,
};

/// Ground contact after a grounding pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundState {
    pub on_ground: bool,
    /// Normal of the supporting surface, when grounded.
    pub normal: Option<Vec3>,
    /// Height of the supporting surface under the capsule axis, when grounded.
    pub floor_y: Option<f32>,
}

impl GroundState {
    pub const AIRBORNE: GroundState = GroundState {
        on_ground: false,
        normal: None,
        floor_y: None,
    };
}

/// Grounding parameters that are not resolver settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundingParams {
    /// How far below the foot ground is still snapped to (meters).
    pub max_snap_distance: f32,
    /// Gravity magnitude for this pass (m/s^2, positive).
    pub gravity: f32,
}

/// Outcome of one grounding pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundingStep {
    pub foot: Vec3,
    pub vertical_velocity: f32,
    pub ground: GroundState,
}

/// Cast straight down the capsule axis, from the top sphere center to `max_snap_distance`
/// below the foot.
pub fn probe_ground(
    world: &CollisionWorld,
    capsule: &CapsuleSpec,
    foot: Vec3,
    max_snap_distance: f32,
) -> Option<GroundHit> {
    let axis_len = capsule.radius + capsule.height;
    let origin = Point3::from(foot + up() * axis_len);
    probe_down(world, origin, axis_len + max_snap_distance.max(0.0))
}

/// Foot height at which the bottom sphere rests `hover` above the plane of `hit`.
#[inline]
fn rest_height(hit: &GroundHit, radius: f32, hover: f32) -> f32 {
    hit.point.y + (radius + hover) / hit.normal.y - radius
}

/// Move the foot toward the rest height over `hit`, rising at most `max_up`, and report
/// the character as grounded there.
fn settle_on(
    world: &CollisionWorld,
    resolver: &MoveRequest,
    hit: &GroundHit,
    foot: Vec3,
    max_up: f32,
) -> GroundingStep {
    let hover = resolver.skin + HOVER_MARGIN;
    let dy = rest_height(hit, resolver.capsule.radius, hover) - foot.y;
    let snap = dy.min(max_up);

    let foot = if snap.abs() > DIST_EPS {
        move_capsule(world, resolver.retarget(foot, up() * snap, SweepMode::Snap)).end_pos
    } else {
        foot
    };

    GroundingStep {
        foot,
        vertical_velocity: 0.0,
        ground: GroundState {
            on_ground: true,
            normal: Some(hit.normal),
            floor_y: Some(hit.point.y),
        },
    }
}

/// Place the capsule at rest on walkable ground found up to `max_drop` below the foot.
///
/// Used at spawn: unlike [`integrate_grounding`] the upward correction is not capped.
/// Returns `None` when there is no walkable ground in range.
pub fn snap_to_ground(
    world: &CollisionWorld,
    resolver: &MoveRequest,
    foot: Vec3,
    max_drop: f32,
) -> Option<GroundingStep> {
    let hit = probe_ground(world, &resolver.capsule, foot, max_drop)
        .filter(|hit| hit.normal.y >= resolver.walkable_normal_y)?;
    Some(settle_on(world, resolver, &hit, foot, f32::INFINITY))
}

/// Snap to walkable ground or apply gravity, for one substep of length `dt`.
///
/// `resolver` carries the capsule and resolver settings; its start and move are ignored.
///
/// Notes
/// - Ground counts only when the probe hits a surface no steeper than the walkable slope
///   and the character is not moving up. Grounding zeroes vertical velocity.
/// - Upward snaps are limited to `MAX_SNAP_UP_PER_STEP`; downward snaps are applied at
///   once. Both go through the resolver so they stop at anything in the way.
/// - Airborne: velocity integrates gravity, and the fall for this pass is clamped to
///   `MAX_FALL_PER_STEP` and the capsule length. A rise blocked by a ceiling zeroes
///   upward velocity.
/// - An empty world skips grounding entirely.
pub fn integrate_grounding(
    world: &CollisionWorld,
    resolver: &MoveRequest,
    params: &GroundingParams,
    foot: Vec3,
    vertical_velocity: f32,
    dt: f32,
) -> GroundingStep {
    if world.is_empty() {
        log::trace!("kcc: empty collision world, grounding skipped");
        return GroundingStep {
            foot,
            vertical_velocity,
            ground: GroundState::AIRBORNE,
        };
    }

    let capsule = &resolver.capsule;

    let support = if vertical_velocity > 0.0 {
        None
    } else {
        probe_ground(world, capsule, foot, params.max_snap_distance)
            .filter(|hit| hit.normal.y >= resolver.walkable_normal_y)
    };

    if let Some(hit) = support {
        return settle_on(world, resolver, &hit, foot, MAX_SNAP_UP_PER_STEP);
    }

    let mut vertical_velocity = vertical_velocity - params.gravity * dt;
    let max_fall = MAX_FALL_PER_STEP.min(capsule.radius + capsule.height);
    let dy = (vertical_velocity * dt).clamp(-max_fall, max_fall);

    let moved = move_capsule(world, resolver.retarget(foot, up() * dy, SweepMode::Fall));
    let risen = moved.end_pos.y - foot.y;
    if dy > 0.0 && risen < dy - DIST_EPS.max(dy * 0.01) {
        log::trace!("kcc: rise blocked after {:.3} of {:.3} m", risen, dy);
        vertical_velocity = vertical_velocity.min(0.0);
    }

    GroundingStep {
        foot: moved.end_pos,
        vertical_velocity,
        ground: GroundState::AIRBORNE,
    }
}
