/*!
Kinematic character controller (KCC) settings and tolerances.

These constants centralize the parameters used by the proximity query, the
sweep-and-slide resolver and the grounding integrator. Per character type
values live in `ControllerSpec`; the `DEFAULT_*` constants below are its
defaults.

Notes
- Distances are in meters, time in seconds, angles in degrees.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Separation kept from surfaces when landing or sliding (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_SKIN: f32 = 0.03;

/// Maximum walkable slope (degrees).
pub const DEFAULT_MAX_SLOPE_DEG: f32 = 42.0;

/// Height of ledges the controller climbs without jumping (meters).
pub const DEFAULT_STEP_HEIGHT: f32 = 0.35;

/// Max downward snap distance to search for ground (meters).
pub const DEFAULT_MAX_SNAP_DISTANCE: f32 = 0.6;

/// Gravity magnitude (m/s^2, positive). Stronger than real-world for snappier feel.
pub const DEFAULT_GRAVITY: f32 = 18.0;

/// Maximum number of resolver rounds per substep.
/// Higher values help with tight corners at the cost of more queries.
pub const DEFAULT_MAX_ITERATIONS: u32 = 6;

/// Upper bound on substeps per tick.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 8;

/// Binary-search steps of the time-of-impact search.
/// The resolved fraction is accurate to `2^-BIN_STEPS`.
pub const BIN_STEPS: u32 = 8;

/// Minimum squared movement threshold to consider a step meaningful (m^2).
/// Movements below this are treated as zero to avoid tiny oscillations.
pub const MIN_MOVE_SQ: f32 = 1.0e-8;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Extra distance added to the penetration depth on an unstuck push (meters).
pub const PUSH_OUT_EPS: f32 = 1.0e-3;

/// Extra range added around a query segment when gathering candidate
/// triangles, on top of radius + skin (meters).
pub const QUERY_MARGIN: f32 = 0.25;

/// Smallest raise worth testing on a step-up attempt (meters).
pub const MIN_STEP_UP: f32 = 0.01;

/// Clearance above the skin at which a grounded capsule rests (meters).
/// Keeps resting contacts strictly outside the resolver's skin test.
pub const HOVER_MARGIN: f32 = 0.005;

/// Walkable slope tolerance (degrees) added to `max_slope_deg` when grounding.
pub const SLOPE_TOLERANCE_DEG: f32 = 0.5;

/// Largest upward snap applied per grounding pass (meters).
/// Upward snaps are interpolated; downward snaps are applied at once.
pub const MAX_SNAP_UP_PER_STEP: f32 = 0.15;

/// Largest fall applied per grounding pass (meters), further limited by the
/// capsule length so the next collision pass can re-resolve it.
pub const MAX_FALL_PER_STEP: f32 = 2.0;

/// Horizontal travel per substep, as a fraction of the capsule radius.
pub const SUBSTEP_RADIUS_FRACTION: f32 = 0.25;

/// How far past the blocking contact the step-up probe looks for the step top (meters).
pub const STEP_PROBE_INSET: f32 = 0.02;
