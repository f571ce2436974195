//! Box occluders and segment tracing
//!
//! The reference world is made of axis-aligned boxes. Each box decides per
//! trace channel whether it stops a ray, so glass can let sight through while
//! still cutting a laser.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, TraceChannel, Vec3};

/// Which channels a box stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Blocking {
    /// Stops every trace
    #[default]
    Solid,
    /// Stops lasers but not sight or sound (glass, grates)
    LineOfSightOnly,
    /// Stops sight and sound but lasers pass (holograms, smoke)
    VisibilityOnly,
    /// Stops nothing
    None,
}

impl Blocking {
    pub fn blocks(&self, channel: TraceChannel) -> bool {
        match (self, channel) {
            (Blocking::Solid, _) => true,
            (Blocking::LineOfSightOnly, TraceChannel::LineOfSight) => true,
            (Blocking::VisibilityOnly, TraceChannel::Visibility) => true,
            _ => false,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Build from any two opposite corners
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Entry parameter of the segment `start + t * (end - start)`, t in [0, 1]
    ///
    /// Slab test. A segment starting inside the box enters at t = 0.
    pub fn segment_entry(&self, start: Vec3, end: Vec3) -> Option<f32> {
        let dir = end - start;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for axis in 0..3 {
            let origin = start[axis];
            let delta = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if delta.abs() < f32::EPSILON {
                // Parallel to this slab: must already be inside it
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / delta;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// A box in the level, optionally belonging to an entity
#[derive(Debug, Clone)]
pub struct Occluder {
    pub bounds: Aabb,
    pub blocking: Blocking,
    /// Owning entity; None for static level geometry
    pub entity: Option<EntityId>,
}

impl Occluder {
    pub fn solid(bounds: Aabb) -> Self {
        Self {
            bounds,
            blocking: Blocking::Solid,
            entity: None,
        }
    }

    pub fn with_blocking(mut self, blocking: Blocking) -> Self {
        self.blocking = blocking;
        self
    }
}

/// Result of a blocking trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub point: Vec3,
    /// Struck entity; None when the ray hit static geometry
    pub entity: Option<EntityId>,
    /// Distance from the trace start to `point`
    pub distance: f32,
}

/// Nearest hit among candidate boxes along a segment
pub fn nearest_hit<'a>(
    start: Vec3,
    end: Vec3,
    candidates: impl Iterator<Item = (Aabb, Option<EntityId>)> + 'a,
) -> Option<TraceHit> {
    let mut best: Option<(f32, Option<EntityId>)> = None;

    for (bounds, entity) in candidates {
        if let Some(t) = bounds.segment_entry(start, end) {
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, entity));
            }
        }
    }

    best.map(|(t, entity)| {
        let point = start.lerp(end, t);
        TraceHit {
            point,
            entity,
            distance: start.distance(point),
        }
    })
}
