//! Kinematic capsule character controller over static triangle worlds.
//!
//! - [`collision`]: world building, proximity queries, the sweep-and-slide resolver and
//!   grounding.
//! - [`controller`]: per-character configuration and state, and the fixed-tick update
//!   that splits a tick into substeps.
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod collision;
pub mod controller;
pub mod error;

pub use collision::{
    BuildStats, CapsuleSpec, CollisionWorld, CollisionWorldBuilder, Contact, GroundState,
    MoveResult, Quat, SharedWorld, StaticSurface, SurfaceGeometry, Transform, Vec3,
};
pub use controller::{
    CharacterController, ControllerSpec, ControllerSpecBuilder, ControllerState, TickInput,
    TickReport, step_character, substep_count,
};
pub use error::ConfigError;
