//! Per-character controller: configuration, state and the fixed-tick update.
//!
//! One tick:
//! - the horizontal displacement is split into substeps no longer than a quarter radius
//!   (up to `max_substeps`),
//! - each substep runs the sweep-and-slide resolver, then one grounding pass with the
//!   matching share of `dt`.
//!
//! Notes
//! - Position is mutated only through the resolver and the grounding pass.
//! - Non-finite inputs degrade to zero motion instead of poisoning the state.

use crate::{
    collision::{
        ground::{GroundState, GroundingParams, integrate_grounding, snap_to_ground},
        kinematic::{MoveRequest, SweepMode, move_capsule, walkable_normal_y},
        settings::{
            DEFAULT_GRAVITY, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_SLOPE_DEG,
            DEFAULT_MAX_SNAP_DISTANCE, DEFAULT_MAX_SUBSTEPS, DEFAULT_SKIN, DEFAULT_STEP_HEIGHT,
            SUBSTEP_RADIUS_FRACTION,
        },
        types::{CapsuleSpec, Vec3},
        world::CollisionWorld,
    },
    error::ConfigError,
};

/// Immutable settings for one character type.
///
/// Notes
/// - Values are expressed in meters, seconds, and degrees.
/// - `height` is the straight part of the capsule; total height is `height + 2 * radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerSpec {
    pub radius: f32,
    pub height: f32,
    /// Small gap preserved between the character and its surroundings (meters).
    pub skin: f32,
    /// Maximum walkable slope angle (degrees).
    pub max_slope_deg: f32,
    /// Tallest ledge climbed without jumping (meters).
    pub step_height: f32,
    /// How far below the foot ground is still snapped to (meters).
    pub max_snap_distance: f32,
    /// Gravity magnitude (m/s^2).
    pub gravity: f32,
    /// Resolver rounds per substep.
    pub max_iterations: u32,
    /// Upper bound on substeps per tick.
    pub max_substeps: u32,
}

impl ControllerSpec {
    /// Start a spec with the given capsule and default tunables.
    pub fn builder(radius: f32, height: f32) -> ControllerSpecBuilder {
        ControllerSpecBuilder {
            spec: ControllerSpec {
                radius,
                height,
                skin: DEFAULT_SKIN,
                max_slope_deg: DEFAULT_MAX_SLOPE_DEG,
                step_height: DEFAULT_STEP_HEIGHT,
                max_snap_distance: DEFAULT_MAX_SNAP_DISTANCE,
                gravity: DEFAULT_GRAVITY,
                max_iterations: DEFAULT_MAX_ITERATIONS,
                max_substeps: DEFAULT_MAX_SUBSTEPS,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("radius", self.radius),
            ("height", self.height),
            ("skin", self.skin),
            ("max_slope_deg", self.max_slope_deg),
            ("step_height", self.step_height),
            ("max_snap_distance", self.max_snap_distance),
            ("gravity", self.gravity),
        ];
        if let Some(&(field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field, value });
        }

        if self.radius <= 0.0 {
            return Err(ConfigError::NonPositiveRadius(self.radius));
        }
        if self.height < 0.0 {
            return Err(ConfigError::NegativeHeight(self.height));
        }
        if self.skin <= 0.0 {
            return Err(ConfigError::NonPositiveSkin(self.skin));
        }
        if self.max_slope_deg <= 0.0 || self.max_slope_deg > 90.0 {
            return Err(ConfigError::SlopeOutOfRange(self.max_slope_deg));
        }
        for (field, value) in [
            ("step_height", self.step_height),
            ("max_snap_distance", self.max_snap_distance),
            ("gravity", self.gravity),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroCount {
                field: "max_iterations",
            });
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::ZeroCount {
                field: "max_substeps",
            });
        }
        Ok(())
    }

    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        CapsuleSpec::new(self.radius, self.height)
    }

    /// Resolver request for moving a capsule of this type.
    pub fn move_request(&self, start_pos: Vec3, desired_translation: Vec3, mode: SweepMode) -> MoveRequest {
        MoveRequest {
            start_pos,
            desired_translation,
            capsule: self.capsule(),
            skin: self.skin,
            max_iterations: self.max_iterations,
            step_height: self.step_height,
            walkable_normal_y: walkable_normal_y(self.max_slope_deg),
            mode,
        }
    }
}

/// Builder for [`ControllerSpec`]; `build` validates.
#[derive(Clone, Copy, Debug)]
pub struct ControllerSpecBuilder {
    spec: ControllerSpec,
}

impl ControllerSpecBuilder {
    pub fn skin(mut self, skin: f32) -> Self {
        self.spec.skin = skin;
        self
    }

    pub fn max_slope_deg(mut self, deg: f32) -> Self {
        self.spec.max_slope_deg = deg;
        self
    }

    pub fn step_height(mut self, height: f32) -> Self {
        self.spec.step_height = height;
        self
    }

    pub fn max_snap_distance(mut self, distance: f32) -> Self {
        self.spec.max_snap_distance = distance;
        self
    }

    pub fn gravity(mut self, gravity: f32) -> Self {
        self.spec.gravity = gravity;
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.spec.max_iterations = n;
        self
    }

    pub fn max_substeps(mut self, n: u32) -> Self {
        self.spec.max_substeps = n;
        self
    }

    pub fn build(self) -> Result<ControllerSpec, ConfigError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

/// Mutable per-character state, advanced once per fixed tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerState {
    /// Foot position (world space).
    pub position: Vec3,
    /// Vertical velocity (m/s, positive up).
    pub vertical_velocity: f32,
    pub ground: GroundState,
}

impl ControllerState {
    /// Fresh state at a spawn point: at rest, not grounded.
    pub fn spawn(position: Vec3) -> Self {
        Self {
            position,
            vertical_velocity: 0.0,
            ground: GroundState::AIRBORNE,
        }
    }
}

/// Caller intent for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    /// Desired horizontal displacement for the tick. The Y component is ignored.
    pub displacement: Vec3,
    /// Upward launch velocity, applied only if grounded at the start of the tick.
    pub jump_velocity: Option<f32>,
    /// Gravity magnitude for this tick, replacing `ControllerSpec::gravity`.
    pub gravity: Option<f32>,
}

impl TickInput {
    pub fn walk(displacement: Vec3) -> Self {
        Self {
            displacement,
            ..Self::default()
        }
    }

    pub fn with_jump(mut self, velocity: f32) -> Self {
        self.jump_velocity = Some(velocity);
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = Some(gravity);
        self
    }
}

/// What a tick produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub position: Vec3,
    pub ground: GroundState,
    pub vertical_velocity: f32,
    /// Substeps the displacement was split into.
    pub substeps: u32,
}

/// Number of substeps for a displacement of length `displacement_len`.
///
/// Each substep travels at most `SUBSTEP_RADIUS_FRACTION * radius`, within `[1, max_substeps]`.
/// Non-finite or non-positive lengths need a single substep.
pub fn substep_count(displacement_len: f32, radius: f32, max_substeps: u32) -> u32 {
    let max_substeps = max_substeps.max(1);
    if !displacement_len.is_finite() || displacement_len <= 0.0 {
        return 1;
    }
    let stride = radius * SUBSTEP_RADIUS_FRACTION;
    if stride.is_nan() || stride <= 0.0 {
        return max_substeps;
    }
    // Float to int casts saturate.
    ((displacement_len / stride).ceil() as u32).clamp(1, max_substeps)
}

/// Advance `state` by one tick of length `dt` against `world`.
///
/// For callers that keep character state in their own storage; [`CharacterController`]
/// wraps the same call.
pub fn step_character(
    world: &CollisionWorld,
    spec: &ControllerSpec,
    state: &mut ControllerState,
    input: &TickInput,
    dt: f32,
) -> TickReport {
    let mut displacement = Vec3::new(input.displacement.x, 0.0, input.displacement.z);
    if !displacement.iter().all(|v| v.is_finite()) {
        log::trace!("kcc: non-finite displacement {:?} dropped", input.displacement);
        displacement = Vec3::zeros();
    }
    let dt = if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        log::trace!("kcc: invalid tick length {dt}, treated as zero");
        0.0
    };

    if let Some(v) = input.jump_velocity {
        if state.ground.on_ground && v.is_finite() && v > 0.0 {
            state.vertical_velocity = v;
            state.ground = GroundState::AIRBORNE;
        }
    }

    let gravity = input
        .gravity
        .filter(|g| g.is_finite() && *g >= 0.0)
        .unwrap_or(spec.gravity);
    let params = GroundingParams {
        max_snap_distance: spec.max_snap_distance,
        gravity,
    };

    let len = displacement.norm();
    let substeps = substep_count(len, spec.radius, spec.max_substeps);
    if substeps == spec.max_substeps && len > spec.radius * SUBSTEP_RADIUS_FRACTION * substeps as f32 {
        log::trace!(
            "kcc: {len:.3} m displacement capped at {substeps} substeps, thin geometry may be skipped"
        );
    }

    let piece = displacement / substeps as f32;
    let sub_dt = dt / substeps as f32;
    let resolver = spec.move_request(state.position, Vec3::zeros(), SweepMode::Walk);

    for _ in 0..substeps {
        let moved = move_capsule(
            world,
            resolver.retarget(state.position, piece, SweepMode::Walk),
        );
        state.position = moved.end_pos;

        let step = integrate_grounding(
            world,
            &resolver,
            &params,
            state.position,
            state.vertical_velocity,
            sub_dt,
        );
        state.position = step.foot;
        state.vertical_velocity = step.vertical_velocity;
        state.ground = step.ground;
    }

    TickReport {
        position: state.position,
        ground: state.ground,
        vertical_velocity: state.vertical_velocity,
        substeps,
    }
}

/// A character: its validated spec and its state.
#[derive(Clone, Debug)]
pub struct CharacterController {
    spec: ControllerSpec,
    state: ControllerState,
}

impl CharacterController {
    pub fn new(spec: ControllerSpec, spawn: Vec3) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self {
            spec,
            state: ControllerState::spawn(spawn),
        })
    }

    #[inline]
    pub fn spec(&self) -> &ControllerSpec {
        &self.spec
    }

    #[inline]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.state.ground.on_ground
    }

    /// Teleport: zero velocity, not grounded until the next tick finds ground.
    pub fn reset(&mut self, position: Vec3) {
        self.state = ControllerState::spawn(position);
    }

    /// Drop the character onto walkable ground up to `max_drop` below its foot, for spawn
    /// points placed roughly at ground level. Returns false and leaves the state alone when
    /// no walkable ground is in range.
    pub fn snap_to_ground(&mut self, world: &CollisionWorld, max_drop: f32) -> bool {
        let resolver = self
            .spec
            .move_request(self.state.position, Vec3::zeros(), SweepMode::Snap);
        let Some(step) = snap_to_ground(world, &resolver, self.state.position, max_drop) else {
            log::debug!("kcc: no walkable ground within {max_drop} m of {:?}", self.state.position);
            return false;
        };
        self.state = ControllerState {
            position: step.foot,
            vertical_velocity: step.vertical_velocity,
            ground: step.ground,
        };
        true
    }

    pub fn update(&mut self, world: &CollisionWorld, input: &TickInput, dt: f32) -> TickReport {
        step_character(world, &self.spec, &mut self.state, input, dt)
    }
}
