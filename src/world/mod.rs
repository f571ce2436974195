//! The world as sensing and hazards see it
//!
//! Components never own the world. They receive it through two narrow
//! traits: `GeometryQuery` for traces and `EntityRegistry` for entity
//! enumeration. `StealthWorld` implements both for headless runs and tests.

pub mod geometry;
pub mod noise;
pub mod pawn;
pub mod stealth_world;

pub use geometry::{Aabb, Blocking, Occluder, TraceHit};
pub use noise::{NoiseEmitter, NoiseRecord};
pub use pawn::{CollisionCylinder, EntityKind, Pawn};
pub use stealth_world::StealthWorld;

use crate::core::types::{EntityId, Seconds, TraceChannel, Vec3};

/// Segment queries against world collision
pub trait GeometryQuery {
    /// Nearest blocking hit between `start` and `end`, skipping `ignore`
    fn trace_line(
        &self,
        start: Vec3,
        end: Vec3,
        channel: TraceChannel,
        ignore: &[EntityId],
    ) -> Option<TraceHit>;

    /// True if anything blocks the segment
    fn test_line(&self, start: Vec3, end: Vec3, channel: TraceChannel, ignore: &[EntityId]) -> bool {
        self.trace_line(start, end, channel, ignore).is_some()
    }
}

/// Entity enumeration and world-level flags
pub trait EntityRegistry {
    /// Every pawn currently in the world
    fn controlled_entities(&self) -> Vec<&Pawn>;

    /// Pawns possessed by a player controller
    fn player_entities(&self) -> Vec<&Pawn> {
        self.controlled_entities()
            .into_iter()
            .filter(|p| p.player_controlled)
            .collect()
    }

    /// The locally controlled player pawn
    fn local_player_entity(&self) -> Option<EntityId>;

    fn is_hidden(&self, id: EntityId) -> bool;

    /// Debug switch that makes AI ignore player pawns
    fn ai_ignores_players(&self) -> bool;

    /// Whether the entity still exists
    fn contains(&self, id: EntityId) -> bool;

    fn creation_time(&self, id: EntityId) -> Option<Seconds>;

    /// Current world time
    fn now(&self) -> Seconds;
}

/// Everything a sensing pass reads
pub trait WorldView: EntityRegistry + GeometryQuery {}

impl<T: EntityRegistry + GeometryQuery + ?Sized> WorldView for T {}
