/*!
Collision root module.

This module re-exports submodules that implement the kinematic character
controller (KCC) against a static triangle world, using parry (through rapier3d)
for the BVH and per-triangle point and ray queries. The code is split for clarity:

- types:        shared data types (Transform, CapsuleSpec, Segment, Contact, MoveResult)
- settings:     controller defaults and tolerance constants
- world:        static surfaces merged into one triangle buffer (+ shared handle)
- broad:        triangle AABBs and the candidate index (BVH or linear scan)
- narrow_phase: exact segment vs triangle closest points, downward ray vs triangle
- proximity:    world-level distance query and downward probe
- kinematic:    sweep-and-slide resolver (TOI search, push-out, slide, step-up)
- ground:       ground probe, snapping and gravity
*/

pub mod broad;
pub mod ground;
pub mod kinematic;
pub mod narrow_phase;
pub mod proximity;
pub mod settings;
pub mod types;
pub mod world;

// Re-export commonly used types and functions.
pub use ground::{
    GroundState, GroundingParams, GroundingStep, integrate_grounding, probe_ground, snap_to_ground,
};
pub use kinematic::{MoveRequest, SweepMode, move_capsule, time_of_impact, walkable_normal_y};
pub use proximity::{GroundHit, distance, probe_down};
pub use types::{CapsuleSpec, Contact, MoveResult, Point3, Quat, Segment, Transform, Vec3};
pub use world::{
    BuildStats, CollisionWorld, CollisionWorldBuilder, SharedWorld, StaticSurface,
    SurfaceGeometry,
};

/// Convenience: a `Quad` surface posed by `rotation` and `translation`.
///
/// With the identity rotation this is a floor; rotated about a horizontal axis it is a
/// ramp or a wall.
#[inline]
pub fn quad_from_pose(
    id: u32,
    half_extents: [f32; 2],
    translation: Vec3,
    rotation: Quat,
) -> StaticSurface {
    StaticSurface::new(
        id,
        SurfaceGeometry::Quad { half_extents },
        Transform::new(translation, rotation),
    )
}

/// Convenience: a `Cuboid` surface with given half extents and pose.
#[inline]
pub fn cuboid_from_pose(
    id: u32,
    half_extents: Vec3,
    translation: Vec3,
    rotation: Quat,
) -> StaticSurface {
    StaticSurface::new(
        id,
        SurfaceGeometry::Cuboid { half_extents },
        Transform::new(translation, rotation),
    )
}
