//! Laser tripwire
//!
//! Each tick the emitter traces its beam on the `LineOfSight` channel. The
//! beam stops at the first thing it strikes, pawn bodies included, and
//! reports when the local player starts or stops breaking it.

use tracing::debug;

use crate::core::config::LaserConfig;
use crate::core::types::{EntityId, TraceChannel, Vec3};
use crate::sensing::delegate::Multicast;
use crate::world::{EntityRegistry, GeometryQuery};

#[derive(Debug)]
pub struct LaserEmitter {
    owner: EntityId,
    location: Vec3,
    forward: Vec3,
    config: LaserConfig,
    touching: Option<EntityId>,
    beam_end: Vec3,
    impact_visible: bool,

    pub on_start_intercept: Multicast<EntityId>,
    pub on_stop_intercept: Multicast<EntityId>,
}

impl LaserEmitter {
    pub fn new(owner: EntityId, location: Vec3, forward: Vec3, config: LaserConfig) -> Self {
        let forward = forward.normalize_or_zero();
        Self {
            owner,
            location,
            forward,
            touching: None,
            beam_end: location + forward * config.distance,
            impact_visible: false,
            config,
            on_start_intercept: Multicast::new(),
            on_stop_intercept: Multicast::new(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Where the beam currently stops
    pub fn beam_end(&self) -> Vec3 {
        self.beam_end
    }

    pub fn beam_length(&self) -> f32 {
        self.location.distance(self.beam_end)
    }

    pub fn impact_visible(&self) -> bool {
        self.impact_visible
    }

    pub fn is_touching_player(&self) -> bool {
        self.touching.is_some()
    }

    /// Move the emitter. The beam snaps back to full length until the next tick.
    pub fn set_pose(&mut self, location: Vec3, forward: Vec3) {
        self.location = location;
        self.forward = forward.normalize_or_zero();
        self.beam_end = self.full_length_end();
    }

    fn full_length_end(&self) -> Vec3 {
        self.location + self.forward * self.config.distance
    }

    pub fn tick(&mut self, geometry: &dyn GeometryQuery, registry: &dyn EntityRegistry) {
        let end = self.full_length_end();
        let hit = geometry.trace_line(self.location, end, TraceChannel::LineOfSight, &[self.owner]);

        match hit {
            Some(hit) => {
                self.beam_end = hit.point;
                self.impact_visible = true;

                let player = registry.local_player_entity();
                let struck_player = hit.entity.is_some() && hit.entity == player;

                if struck_player {
                    if self.touching.is_none() {
                        if let Some(id) = hit.entity {
                            debug!(laser = ?self.owner, player = ?id, "beam intercepted");
                            self.touching = Some(id);
                            self.on_start_intercept.broadcast(&id);
                        }
                    }
                } else {
                    self.release();
                }
            }
            None => {
                self.beam_end = end;
                self.impact_visible = false;
                self.release();
            }
        }
    }

    fn release(&mut self) {
        if let Some(prev) = self.touching.take() {
            debug!(laser = ?self.owner, player = ?prev, "beam restored");
            self.on_stop_intercept.broadcast(&prev);
        }
    }
}
