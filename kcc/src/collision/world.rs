//! Static collision world: the merged triangle buffer every query runs against.
//!
//! This module is responsible for:
//! - Taking the static surfaces supplied by the level loader (each with its own world transform).
//! - Flattening them into one world-space triangle buffer.
//! - Building the broad-phase accelerator over that buffer.
//!
//! Design notes
//! - The world is immutable once built. A level (re)load builds a new world and replaces the old
//!   one wholesale; there are no incremental edits.
//! - Determinism: surfaces are sorted by `id` before merging, so the same inputs always produce
//!   the same triangle order (and therefore the same query tie-breaks).
//! - There is no global "current world". Queries take `&CollisionWorld` explicitly. When a
//!   world must be swapped while characters are simulated, keep it in a [`SharedWorld`]: ticks
//!   hold the read guard, a rebuild takes the write guard.

use parking_lot::{RwLock, RwLockReadGuard};
use rapier3d::parry::shape::Triangle;

use super::{
    broad::TriangleAccel,
    settings::DIST_EPS,
    types::{Point3, Transform, Vec3},
};

/// Local-space geometry of a static surface.
#[derive(Clone, Debug)]
pub enum SurfaceGeometry {
    /// Indexed triangle mesh.
    TriMesh {
        vertices: Vec<Point3>,
        indices: Vec<[u32; 3]>,
    },
    /// Box with the given half-extents, centered on the local origin (12 triangles).
    Cuboid { half_extents: Vec3 },
    /// Rectangle in the local XZ plane with half-extents `(hx, hz)` (2 triangles).
    ///
    /// A floor as-is; rotated, a ramp or a wall.
    Quad { half_extents: [f32; 2] },
}

/// A static collidable surface as handed over by the level loader.
#[derive(Clone, Debug)]
pub struct StaticSurface {
    /// Stable identifier used to ensure deterministic merge order.
    pub id: u32,
    pub geometry: SurfaceGeometry,
    /// Local-to-world transform.
    pub transform: Transform,
}

impl StaticSurface {
    pub fn new(id: u32, geometry: SurfaceGeometry, transform: Transform) -> Self {
        Self {
            id,
            geometry,
            transform,
        }
    }

    /// Append this surface's world-space triangles to `out`.
    fn emit_triangles(&self, out: &mut Vec<Triangle>, stats: &mut BuildStats) {
        match &self.geometry {
            SurfaceGeometry::TriMesh { vertices, indices } => {
                for idx in indices {
                    let fetch = |i: u32| vertices.get(i as usize).copied();
                    match (fetch(idx[0]), fetch(idx[1]), fetch(idx[2])) {
                        (Some(a), Some(b), Some(c)) => self.push(out, stats, a, b, c),
                        _ => stats.dropped_bad_index += 1,
                    }
                }
            }
            SurfaceGeometry::Cuboid { half_extents } => {
                let (corners, faces) = cuboid_triangles(*half_extents);
                for [a, b, c] in faces {
                    self.push(out, stats, corners[a], corners[b], corners[c]);
                }
            }
            SurfaceGeometry::Quad { half_extents: [hx, hz] } => {
                let p = |x: f32, z: f32| Point3::new(x, 0.0, z);
                let (a, b, c, d) = (p(-hx, -hz), p(*hx, -hz), p(*hx, *hz), p(-hx, *hz));
                // Counter-clockwise seen from +Y.
                self.push(out, stats, a, c, b);
                self.push(out, stats, a, d, c);
            }
        }
    }

    fn push(&self, out: &mut Vec<Triangle>, stats: &mut BuildStats, a: Point3, b: Point3, c: Point3) {
        let tri = Triangle::new(
            self.transform.apply(&a),
            self.transform.apply(&b),
            self.transform.apply(&c),
        );

        let finite = [tri.a, tri.b, tri.c]
            .iter()
            .all(|p| p.coords.iter().all(|v| v.is_finite()));
        if !finite {
            stats.dropped_non_finite += 1;
            return;
        }

        let area2 = (tri.b - tri.a).cross(&(tri.c - tri.a)).norm();
        if area2 <= DIST_EPS {
            stats.dropped_degenerate += 1;
            return;
        }

        out.push(tri);
    }
}

/// Corners and triangle corner indices of a box centered on the origin.
fn cuboid_triangles(he: Vec3) -> ([Point3; 8], [[usize; 3]; 12]) {
    let corners = [
        Point3::new(-he.x, -he.y, -he.z),
        Point3::new(he.x, -he.y, -he.z),
        Point3::new(he.x, he.y, -he.z),
        Point3::new(-he.x, he.y, -he.z),
        Point3::new(-he.x, -he.y, he.z),
        Point3::new(he.x, -he.y, he.z),
        Point3::new(he.x, he.y, he.z),
        Point3::new(-he.x, he.y, he.z),
    ];
    let faces = [
        // -Z
        [0, 2, 1],
        [0, 3, 2],
        // +Z
        [4, 5, 6],
        [4, 6, 7],
        // -X
        [0, 4, 7],
        [0, 7, 3],
        // +X
        [1, 2, 6],
        [1, 6, 5],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [3, 7, 6],
        [3, 6, 2],
    ];
    (corners, faces)
}

/// Counters describing what a build kept and dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub surfaces: usize,
    pub triangles: usize,
    pub dropped_bad_index: usize,
    pub dropped_non_finite: usize,
    pub dropped_degenerate: usize,
}

impl BuildStats {
    pub fn dropped(&self) -> usize {
        self.dropped_bad_index + self.dropped_non_finite + self.dropped_degenerate
    }
}

/// Collects static surfaces and builds an immutable [`CollisionWorld`].
pub struct CollisionWorldBuilder {
    surfaces: Vec<StaticSurface>,
    use_bvh: bool,
}

impl Default for CollisionWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionWorldBuilder {
    /// A builder that indexes triangles with a BVH.
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            use_bvh: true,
        }
    }

    /// Choose between a BVH (default) and a linear scan of triangle bounds.
    pub fn with_bvh(mut self, use_bvh: bool) -> Self {
        self.use_bvh = use_bvh;
        self
    }

    pub fn add_surface(mut self, surface: StaticSurface) -> Self {
        self.surfaces.push(surface);
        self
    }

    pub fn add_surfaces(mut self, surfaces: impl IntoIterator<Item = StaticSurface>) -> Self {
        self.surfaces.extend(surfaces);
        self
    }

    /// Merge all surfaces into one world.
    ///
    /// The input is sorted by `id` before merging. Invalid triangles are dropped and counted in
    /// [`CollisionWorld::stats`].
    pub fn build(mut self) -> CollisionWorld {
        self.surfaces.sort_by_key(|s| s.id);

        let mut stats = BuildStats {
            surfaces: self.surfaces.len(),
            ..BuildStats::default()
        };
        let mut triangles = Vec::new();
        for surface in &self.surfaces {
            let before = triangles.len();
            surface.emit_triangles(&mut triangles, &mut stats);
            log::debug!(
                "surface {}: {} triangles",
                surface.id,
                triangles.len() - before
            );
        }
        stats.triangles = triangles.len();

        if stats.dropped() > 0 {
            log::warn!(
                "collision world: dropped {} invalid triangles (bad index: {}, non-finite: {}, degenerate: {})",
                stats.dropped(),
                stats.dropped_bad_index,
                stats.dropped_non_finite,
                stats.dropped_degenerate
            );
        }

        let accel = TriangleAccel::build(&triangles, self.use_bvh);

        if triangles.is_empty() {
            log::warn!("collision world is empty; all movement will pass through unresolved");
        } else {
            log::info!(
                "collision world built: {} surfaces, {} triangles, index: {}",
                stats.surfaces,
                stats.triangles,
                if accel.has_bvh() { "bvh" } else { "linear" }
            );
        }

        CollisionWorld {
            triangles,
            accel,
            stats,
        }
    }
}

/// Immutable, queryable static collision world.
///
/// `Send + Sync`: any number of controllers may query one world concurrently.
pub struct CollisionWorld {
    triangles: Vec<Triangle>,
    accel: TriangleAccel,
    stats: BuildStats,
}

impl CollisionWorld {
    /// A world with no geometry. Every query reports "no contact".
    pub fn empty() -> Self {
        Self {
            triangles: Vec::new(),
            accel: TriangleAccel::build(&[], false),
            stats: BuildStats::default(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn accel(&self) -> &TriangleAccel {
        &self.accel
    }

    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

/// A collision world that can be replaced on level reload.
///
/// Reads and rebuilds are mutually exclusive: [`SharedWorld::read`] holds a read guard for the
/// duration of a tick, [`SharedWorld::rebuild`] waits for every reader to finish.
pub struct SharedWorld {
    inner: RwLock<CollisionWorld>,
}

impl SharedWorld {
    pub fn new(world: CollisionWorld) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    /// Borrow the current world for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, CollisionWorld> {
        self.inner.read()
    }

    /// Build a new world from `surfaces` and replace the current one.
    ///
    /// The build runs before the lock is taken; only the swap is exclusive.
    pub fn rebuild(&self, surfaces: impl IntoIterator<Item = StaticSurface>) -> BuildStats {
        let world = CollisionWorldBuilder::new().add_surfaces(surfaces).build();
        self.replace(world)
    }

    /// Replace the current world with an already built one.
    pub fn replace(&self, world: CollisionWorld) -> BuildStats {
        let stats = world.stats();
        *self.inner.write() = world;
        stats
    }
}

impl Default for SharedWorld {
    fn default() -> Self {
        Self::new(CollisionWorld::empty())
    }
}
