//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use glam::Vec3;

/// Unique identifier for entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation time in seconds
pub type Seconds = f32;

/// World up axis (Z-up, matching level data)
pub const UP: Vec3 = Vec3::Z;

/// Collision channel a trace runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceChannel {
    /// Sight and hearing occlusion
    Visibility,
    /// Laser beams and other hazard rays
    LineOfSight,
}

/// Which side of the simulation this component runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NetRole {
    /// Runs the simulation and schedules sensing
    #[default]
    Authority,
    /// Mirrors state from the authority, never schedules
    Replica,
}

impl NetRole {
    pub fn is_authority(&self) -> bool {
        matches!(self, NetRole::Authority)
    }
}

/// Unit vector for a yaw/pitch pair in degrees (yaw around Z, 0 = +X)
pub fn direction_from_yaw_pitch(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
    let (sy, cy) = yaw_deg.to_radians().sin_cos();
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    Vec3::new(cp * cy, cp * sy, sp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_entity_id_hash() {
        use std::collections::HashMap;
        let id = EntityId::new();
        let mut map: HashMap<EntityId, &str> = HashMap::new();
        map.insert(id, "camera");
        assert_eq!(map.get(&id), Some(&"camera"));
    }

    #[test]
    fn test_net_role() {
        assert!(NetRole::Authority.is_authority());
        assert!(!NetRole::Replica.is_authority());
        assert_eq!(NetRole::default(), NetRole::Authority);
    }

    #[test]
    fn test_direction_from_yaw_pitch() {
        let forward = direction_from_yaw_pitch(0.0, 0.0);
        assert!((forward - Vec3::X).length() < 1e-5);

        let left = direction_from_yaw_pitch(90.0, 0.0);
        assert!((left - Vec3::Y).length() < 1e-5);

        let down = direction_from_yaw_pitch(0.0, -90.0);
        assert!((down - Vec3::NEG_Z).length() < 1e-5);

        let tilted = direction_from_yaw_pitch(37.0, -20.0);
        assert!((tilted.length() - 1.0).abs() < 1e-5);
    }
}
