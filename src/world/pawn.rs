//! Pawns: the entities sensors look at and lasers can strike

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Seconds, Vec3, UP};
use crate::world::noise::NoiseEmitter;

/// How an entity is shaped for collision purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityKind {
    /// Controllable character with an accurate collision cylinder
    #[default]
    Pawn,
    /// Non-pawn actor whose root collider is a capsule
    CapsuleActor,
    /// Anything else; its cylinder is a rough bound only
    Other,
}

impl EntityKind {
    /// Whether the cylinder is accurate enough to aim a second trace at the head
    pub fn has_reliable_cylinder(&self) -> bool {
        matches!(self, EntityKind::Pawn | EntityKind::CapsuleActor)
    }
}

/// Simple vertical collision cylinder centred on the entity location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionCylinder {
    pub radius: f32,
    pub half_height: f32,
}

impl Default for CollisionCylinder {
    fn default() -> Self {
        Self {
            radius: 34.0,
            half_height: 88.0,
        }
    }
}

/// A candidate target as seen by sensing and hazards
#[derive(Debug, Clone)]
pub struct Pawn {
    pub id: EntityId,
    pub location: Vec3,
    /// Aim point relative to `location`
    pub target_offset: Vec3,
    pub collision: CollisionCylinder,
    pub kind: EntityKind,
    /// Possessed by a player controller
    pub player_controlled: bool,
    pub hidden: bool,
    /// Stamped with the world time on spawn unless set explicitly
    pub creation_time: Option<Seconds>,
    pub noise: Option<NoiseEmitter>,
}

impl Pawn {
    /// A player-controlled pawn with a noise emitter
    pub fn player(location: Vec3) -> Self {
        Self {
            player_controlled: true,
            noise: Some(NoiseEmitter::new()),
            ..Self::npc(location)
        }
    }

    /// An AI-controlled pawn without a noise emitter
    pub fn npc(location: Vec3) -> Self {
        Self {
            id: EntityId::new(),
            location,
            target_offset: Vec3::ZERO,
            collision: CollisionCylinder::default(),
            kind: EntityKind::Pawn,
            player_controlled: false,
            hidden: false,
            creation_time: None,
            noise: None,
        }
    }

    pub fn with_noise_emitter(mut self) -> Self {
        self.noise = Some(NoiseEmitter::new());
        self
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_creation_time(mut self, time: Seconds) -> Self {
        self.creation_time = Some(time);
        self
    }

    /// Where sight traces aim first
    pub fn target_location(&self) -> Vec3 {
        self.location + self.target_offset
    }

    /// Top of the collision cylinder, used for the head-aim retry
    pub fn head_location(&self) -> Vec3 {
        self.location + UP * self.collision.half_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_has_emitter() {
        let player = Pawn::player(Vec3::ZERO);
        assert!(player.player_controlled);
        assert!(player.noise.is_some());

        let guard = Pawn::npc(Vec3::ZERO);
        assert!(!guard.player_controlled);
        assert!(guard.noise.is_none());
    }

    #[test]
    fn test_aim_points() {
        let mut pawn = Pawn::npc(Vec3::new(10.0, 0.0, 100.0));
        assert_eq!(pawn.target_location(), pawn.location);

        pawn.target_offset = Vec3::new(0.0, 0.0, 20.0);
        assert_eq!(pawn.target_location(), Vec3::new(10.0, 0.0, 120.0));
        assert_eq!(pawn.head_location(), Vec3::new(10.0, 0.0, 188.0));
    }

    #[test]
    fn test_reliable_cylinder() {
        assert!(EntityKind::Pawn.has_reliable_cylinder());
        assert!(EntityKind::CapsuleActor.has_reliable_cylinder());
        assert!(!EntityKind::Other.has_reliable_cylinder());
    }
}
