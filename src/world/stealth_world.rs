//! Reference world: pawns, static actors and box occluders

use ahash::{AHashMap, AHashSet};

use crate::core::types::{EntityId, Seconds, TraceChannel, Vec3};
use crate::world::geometry::{nearest_hit, Aabb, Occluder, TraceHit};
use crate::world::pawn::Pawn;
use crate::world::{EntityRegistry, GeometryQuery};

/// Non-pawn actor bookkeeping (cameras, emitters)
#[derive(Debug, Clone, Copy)]
struct ActorRecord {
    creation_time: Seconds,
}

/// Headless world used by the scenario runner and tests
///
/// Pawns are kept in spawn order so sensing visits candidates
/// deterministically. Pawn bodies stop `LineOfSight` traces only; sight is
/// occluded by level boxes, not by other characters.
#[derive(Debug, Default)]
pub struct StealthWorld {
    pawns: Vec<Pawn>,
    pawn_index: AHashMap<EntityId, usize>,
    actors: AHashMap<EntityId, ActorRecord>,
    hidden_actors: AHashSet<EntityId>,
    occluders: Vec<Occluder>,
    local_player: Option<EntityId>,
    ai_ignores_players: bool,
    time: Seconds,
}

impl StealthWorld {
    pub fn new() -> Self {
        Self::default()
    }

    // === TIME ===

    pub fn set_time(&mut self, time: Seconds) {
        self.time = time;
    }

    pub fn time(&self) -> Seconds {
        self.time
    }

    // === ENTITIES ===

    /// Add a pawn. The first player pawn spawned becomes the local player.
    ///
    /// A pawn without an explicit creation time is created now.
    pub fn spawn_pawn(&mut self, mut pawn: Pawn) -> EntityId {
        let id = pawn.id;
        pawn.creation_time.get_or_insert(self.time);
        if pawn.player_controlled && self.local_player.is_none() {
            self.local_player = Some(id);
        }
        self.pawn_index.insert(id, self.pawns.len());
        self.pawns.push(pawn);
        id
    }

    /// Add a non-pawn actor created now
    pub fn spawn_actor(&mut self) -> EntityId {
        let id = EntityId::new();
        self.actors.insert(
            id,
            ActorRecord {
                creation_time: self.time,
            },
        );
        id
    }

    /// Remove any entity. Returns false if it did not exist.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if self.local_player == Some(id) {
            self.local_player = None;
        }
        self.hidden_actors.remove(&id);
        self.occluders.retain(|o| o.entity != Some(id));

        if self.actors.remove(&id).is_some() {
            return true;
        }

        match self.pawn_index.remove(&id) {
            Some(idx) => {
                self.pawns.remove(idx);
                for (i, pawn) in self.pawns.iter().enumerate().skip(idx) {
                    self.pawn_index.insert(pawn.id, i);
                }
                true
            }
            None => false,
        }
    }

    pub fn pawn(&self, id: EntityId) -> Option<&Pawn> {
        self.pawn_index.get(&id).map(|&i| &self.pawns[i])
    }

    pub fn pawn_mut(&mut self, id: EntityId) -> Option<&mut Pawn> {
        let idx = *self.pawn_index.get(&id)?;
        self.pawns.get_mut(idx)
    }

    pub fn set_local_player(&mut self, id: Option<EntityId>) {
        self.local_player = id;
    }

    pub fn set_ai_ignores_players(&mut self, ignore: bool) {
        self.ai_ignores_players = ignore;
    }

    pub fn set_hidden(&mut self, id: EntityId, hidden: bool) {
        if let Some(pawn) = self.pawn_mut(id) {
            pawn.hidden = hidden;
        } else if hidden {
            self.hidden_actors.insert(id);
        } else {
            self.hidden_actors.remove(&id);
        }
    }

    /// Record a noise made by a pawn at `location`
    ///
    /// Returns false if the pawn is unknown or has no emitter.
    pub fn make_noise(&mut self, maker: EntityId, loudness: f32, location: Vec3) -> bool {
        let now = self.time;
        let Some(pawn) = self.pawn_mut(maker) else {
            return false;
        };
        let maker_location = pawn.location;
        match pawn.noise.as_mut() {
            Some(emitter) => {
                emitter.make_noise(maker_location, loudness, location, now);
                true
            }
            None => false,
        }
    }

    // === GEOMETRY ===

    pub fn add_occluder(&mut self, occluder: Occluder) {
        self.occluders.push(occluder);
    }

    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }

    fn pawn_bounds(pawn: &Pawn) -> Aabb {
        let c = pawn.collision;
        Aabb::from_center(pawn.location, Vec3::new(c.radius, c.radius, c.half_height))
    }
}

impl GeometryQuery for StealthWorld {
    fn trace_line(
        &self,
        start: Vec3,
        end: Vec3,
        channel: TraceChannel,
        ignore: &[EntityId],
    ) -> Option<TraceHit> {
        let not_ignored = |entity: &Option<EntityId>| match entity {
            Some(id) => !ignore.contains(id),
            None => true,
        };

        let static_boxes = self
            .occluders
            .iter()
            .filter(|o| o.blocking.blocks(channel) && not_ignored(&o.entity))
            .map(|o| (o.bounds, o.entity));

        let bodies = self
            .pawns
            .iter()
            .filter(|_| channel == TraceChannel::LineOfSight)
            .filter(|p| !ignore.contains(&p.id))
            .map(|p| (Self::pawn_bounds(p), Some(p.id)));

        nearest_hit(start, end, static_boxes.chain(bodies))
    }
}

impl EntityRegistry for StealthWorld {
    fn controlled_entities(&self) -> Vec<&Pawn> {
        self.pawns.iter().collect()
    }

    fn local_player_entity(&self) -> Option<EntityId> {
        self.local_player
    }

    fn is_hidden(&self, id: EntityId) -> bool {
        match self.pawn(id) {
            Some(pawn) => pawn.hidden,
            None => self.hidden_actors.contains(&id),
        }
    }

    fn ai_ignores_players(&self) -> bool {
        self.ai_ignores_players
    }

    fn contains(&self, id: EntityId) -> bool {
        self.pawn_index.contains_key(&id) || self.actors.contains_key(&id)
    }

    fn creation_time(&self, id: EntityId) -> Option<Seconds> {
        self.pawn(id)
            .and_then(|p| p.creation_time)
            .or_else(|| self.actors.get(&id).map(|a| a.creation_time))
    }

    fn now(&self) -> Seconds {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::geometry::Blocking;

    fn wall_at_x(x: f32) -> Occluder {
        Occluder::solid(Aabb::new(
            Vec3::new(x - 10.0, -500.0, -500.0),
            Vec3::new(x + 10.0, 500.0, 500.0),
        ))
    }

    #[test]
    fn test_first_player_is_local() {
        let mut world = StealthWorld::new();
        world.spawn_pawn(Pawn::npc(Vec3::ZERO));
        let p1 = world.spawn_pawn(Pawn::player(Vec3::X));
        world.spawn_pawn(Pawn::player(Vec3::Y));

        assert_eq!(world.local_player_entity(), Some(p1));
        assert_eq!(world.controlled_entities().len(), 3);
        assert_eq!(world.player_entities().len(), 2);
    }

    #[test]
    fn test_despawn_keeps_index_consistent() {
        let mut world = StealthWorld::new();
        let a = world.spawn_pawn(Pawn::npc(Vec3::ZERO));
        let b = world.spawn_pawn(Pawn::npc(Vec3::X));
        let c = world.spawn_pawn(Pawn::npc(Vec3::Y));

        assert!(world.despawn(a));
        assert!(!world.contains(a));
        assert_eq!(world.pawn(b).unwrap().location, Vec3::X);
        assert_eq!(world.pawn(c).unwrap().location, Vec3::Y);
        assert!(!world.despawn(a));
    }

    #[test]
    fn test_actor_creation_time() {
        let mut world = StealthWorld::new();
        world.set_time(3.5);
        let camera = world.spawn_actor();
        assert!(world.contains(camera));
        assert_eq!(world.creation_time(camera), Some(3.5));
        assert!(world.despawn(camera));
        assert_eq!(world.creation_time(camera), None);
    }

    #[test]
    fn test_pawn_stamped_at_spawn() {
        let mut world = StealthWorld::new();
        world.set_time(1.5);
        let guard = world.spawn_pawn(Pawn::npc(Vec3::ZERO));
        let veteran = world.spawn_pawn(Pawn::npc(Vec3::X).with_creation_time(0.25));

        assert_eq!(world.creation_time(guard), Some(1.5));
        assert_eq!(world.creation_time(veteran), Some(0.25));
    }

    #[test]
    fn test_hidden_flags() {
        let mut world = StealthWorld::new();
        let pawn = world.spawn_pawn(Pawn::npc(Vec3::ZERO));
        let actor = world.spawn_actor();

        world.set_hidden(pawn, true);
        world.set_hidden(actor, true);
        assert!(world.is_hidden(pawn));
        assert!(world.is_hidden(actor));

        world.set_hidden(pawn, false);
        assert!(!world.is_hidden(pawn));
    }

    #[test]
    fn test_visibility_ignores_bodies() {
        let mut world = StealthWorld::new();
        world.spawn_pawn(Pawn::npc(Vec3::new(500.0, 0.0, 0.0)));

        let end = Vec3::new(1000.0, 0.0, 0.0);
        assert!(!world.test_line(Vec3::ZERO, end, TraceChannel::Visibility, &[]));
        assert!(world.test_line(Vec3::ZERO, end, TraceChannel::LineOfSight, &[]));
    }

    #[test]
    fn test_trace_reports_struck_pawn() {
        let mut world = StealthWorld::new();
        let guard = world.spawn_pawn(Pawn::npc(Vec3::new(300.0, 0.0, 0.0)));

        let hit = world
            .trace_line(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), TraceChannel::LineOfSight, &[])
            .unwrap();
        assert_eq!(hit.entity, Some(guard));
        assert!((hit.point.x - 266.0).abs() < 1e-3);

        // Ignoring the guard lets the ray through
        assert!(world
            .trace_line(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), TraceChannel::LineOfSight, &[guard])
            .is_none());
    }

    #[test]
    fn test_wall_blocks_both_channels() {
        let mut world = StealthWorld::new();
        world.add_occluder(wall_at_x(200.0));

        let end = Vec3::new(400.0, 0.0, 0.0);
        let hit = world
            .trace_line(Vec3::ZERO, end, TraceChannel::Visibility, &[])
            .unwrap();
        assert_eq!(hit.entity, None);
        assert!(world.test_line(Vec3::ZERO, end, TraceChannel::LineOfSight, &[]));
    }

    #[test]
    fn test_glass_only_blocks_lasers() {
        let mut world = StealthWorld::new();
        world.add_occluder(wall_at_x(200.0).with_blocking(Blocking::LineOfSightOnly));

        let end = Vec3::new(400.0, 0.0, 0.0);
        assert!(!world.test_line(Vec3::ZERO, end, TraceChannel::Visibility, &[]));
        assert!(world.test_line(Vec3::ZERO, end, TraceChannel::LineOfSight, &[]));
    }

    #[test]
    fn test_make_noise_requires_emitter() {
        let mut world = StealthWorld::new();
        world.set_time(2.0);
        let player = world.spawn_pawn(Pawn::player(Vec3::ZERO));
        let guard = world.spawn_pawn(Pawn::npc(Vec3::X));

        assert!(world.make_noise(player, 1.0, Vec3::ZERO));
        assert!(!world.make_noise(guard, 1.0, Vec3::X));
        assert!(!world.make_noise(EntityId::new(), 1.0, Vec3::X));

        let noise = world.pawn(player).unwrap().noise.as_ref().unwrap().last_noise(true);
        assert_eq!(noise.map(|n| n.time), Some(2.0));
    }
}
