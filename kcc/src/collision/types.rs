/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- world building (static surfaces merged into one triangle buffer)
- broad (triangle bounds and candidate queries)
- narrow_phase / proximity (segment vs triangle distance)
- kinematic controller (sweep-and-slide)
- ground probing and snapping

Conventions
- Units are meters and seconds.
- The up axis is +Y. Capsules are anchored at their foot position; the capsule
  axis runs from `foot + up * radius` to `foot + up * (radius + height)`.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;

/// World up axis.
#[inline]
pub fn up() -> Vec3 {
    Vec3::y()
}

/// A world transform applied to a static surface at build time.
///
/// Points are mapped as `rotation * (scale ⊙ p) + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    /// Per-axis scale applied in local space before rotation.
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::repeat(1.0),
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Map a local-space point into world space.
    #[inline]
    pub fn apply(&self, p: &Point3) -> Point3 {
        let scaled = p.coords.component_mul(&self.scale);
        Point3::from(self.rotation * scaled + self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }
}

/// Capsule dimensions for a kinematic actor.
///
/// `height` is the length of the straight segment between the two sphere
/// centers, so the total character height is `height + 2 * radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub height: f32,
}

impl CapsuleSpec {
    #[inline]
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }

    /// The capsule axis for a capsule standing at `foot`.
    #[inline]
    pub fn segment_at(&self, foot: Vec3) -> Segment {
        Segment {
            a: Point3::from(foot + up() * self.radius),
            b: Point3::from(foot + up() * (self.radius + self.height)),
        }
    }

    #[inline]
    pub fn total_height(&self) -> f32 {
        self.height + 2.0 * self.radius
    }
}

/// A line segment in world space (the capsule axis during queries).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Point3,
    pub b: Point3,
}

impl Segment {
    #[inline]
    pub fn new(a: Point3, b: Point3) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn midpoint(&self) -> Point3 {
        na::center(&self.a, &self.b)
    }
}

/// Result of a proximity query: the minimum distance between a segment and the
/// world, and the outward contact normal at that distance.
///
/// `normal` is `None` when nothing was found within the query range, in which
/// case `distance` is `f32::INFINITY`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub distance: f32,
    pub normal: Option<Vec3>,
}

impl Contact {
    pub const NONE: Contact = Contact {
        distance: f32::INFINITY,
        normal: None,
    };

    #[inline]
    pub fn is_none(&self) -> bool {
        self.normal.is_none()
    }
}

/// Result of a kinematic movement step (after sweep-and-slide).
#[derive(Clone, Copy, Debug)]
pub struct MoveResult {
    /// Final foot position after applying the step and sliding.
    pub end_pos: Vec3,
    /// The last contact encountered during the step (if any).
    pub last_contact: Option<Contact>,
    /// Remaining displacement that could not be consumed (usually zero on success).
    pub remaining: Vec3,
    /// Whether a step-up was committed.
    pub stepped: bool,
    /// Number of resolver rounds used.
    pub iterations: u32,
}

impl MoveResult {
    /// Displacement actually applied, relative to `start`.
    #[inline]
    pub fn applied(&self, start: Vec3) -> Vec3 {
        self.end_pos - start
    }
}
