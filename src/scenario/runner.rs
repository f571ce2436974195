//! Headless scenario playback
//!
//! Builds a `StealthWorld` from a `Scenario`, wires cameras, lasers and doors
//! together, and steps everything on a `ManualClock`. Every observable
//! outcome lands in the event log with entity names resolved.

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use ahash::AHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actors::alarm::{LockdownDoor, ObserverTable};
use crate::actors::security_camera::{AlarmCue, SecurityCamera};
use crate::core::error::{Result, StealthError};
use crate::core::types::{EntityId, Seconds, Vec3};
use crate::hazards::laser::LaserEmitter;
use crate::scenario::loader::{to_vec3, Scenario};
use crate::sensing::perception::HeardNoise;
use crate::sensing::timer::{ManualClock, TimerHandle, TimerService};
use crate::world::geometry::{Aabb, Occluder};
use crate::world::pawn::Pawn;
use crate::world::StealthWorld;

/// What happened, with names in place of ids
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    PawnSeen { sensor: String, pawn: String },
    PawnLost { sensor: String, pawn: String },
    NoiseHeard {
        sensor: String,
        pawn: String,
        location: [f32; 3],
        volume: f32,
    },
    AlarmCue { camera: String, cue: AlarmCue },
    LaserTripped { laser: String, pawn: String },
    LaserCleared { laser: String, pawn: String },
    DoorLocked { door: String },
    DoorUnlocked { door: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioEvent {
    pub time: Seconds,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// End-of-run summary
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub seed: u64,
    pub duration: Seconds,
    pub events: Vec<ScenarioEvent>,
    pub alerted_cameras: Vec<String>,
    pub locked_doors: Vec<String>,
    pub tripped_lasers: Vec<String>,
}

type Names = Rc<AHashMap<EntityId, String>>;

fn name_of(names: &Names, id: EntityId) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| id.0.to_string())
}

/// A pawn walking a looped patrol path
#[derive(Debug)]
struct Patrol {
    pawn: EntityId,
    path: Vec<Vec3>,
    next: usize,
    speed: f32,
}

impl Patrol {
    fn advance(&mut self, pawn: &mut Pawn, dt: Seconds) {
        if self.path.len() < 2 || self.speed <= 0.0 {
            return;
        }
        let mut budget = self.speed * dt;
        // Bounded so a degenerate path cannot spin
        for _ in 0..self.path.len() * 2 {
            if budget <= 0.0 {
                break;
            }
            let target = self.path[self.next];
            let offset = target - pawn.location;
            let dist = offset.length();
            if dist <= budget {
                pawn.location = target;
                budget -= dist;
                self.next = (self.next + 1) % self.path.len();
            } else {
                pawn.location += offset / dist * budget;
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledNoise {
    time: Seconds,
    maker: EntityId,
    loudness: f32,
    location: Option<Vec3>,
}

pub struct ScenarioRunner {
    name: String,
    seed: u64,
    world: StealthWorld,
    clock: ManualClock,
    cameras: Vec<SecurityCamera>,
    lasers: Vec<LaserEmitter>,
    doors: Vec<LockdownDoor>,
    door_states: Vec<bool>,
    patrols: Vec<Patrol>,
    noises: Vec<ScheduledNoise>,
    next_noise: usize,
    ids: AHashMap<String, EntityId>,
    names: Names,
    inbox: Receiver<EventKind>,
    events: Vec<ScenarioEvent>,
}

impl ScenarioRunner {
    /// Build the world and start every camera
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        scenario.validate()?;

        let mut world = StealthWorld::new();
        world.set_ai_ignores_players(scenario.world.ai_ignores_players);

        for occluder in &scenario.occluders {
            let bounds = Aabb::new(to_vec3(occluder.min), to_vec3(occluder.max));
            world.add_occluder(Occluder::solid(bounds).with_blocking(occluder.blocking));
        }

        let mut ids: AHashMap<String, EntityId> = AHashMap::new();
        let mut patrols = Vec::new();

        for spec in &scenario.pawns {
            let location = to_vec3(spec.location);
            let mut pawn = if spec.player {
                Pawn::player(location)
            } else {
                Pawn::npc(location)
            };
            pawn = pawn.with_kind(spec.kind);
            if spec.noise_emitter && pawn.noise.is_none() {
                pawn = pawn.with_noise_emitter();
            }
            pawn.hidden = spec.hidden;

            let id = world.spawn_pawn(pawn);
            ids.insert(spec.name.clone(), id);

            if !spec.waypoints.is_empty() {
                let mut path = vec![location];
                path.extend(spec.waypoints.iter().copied().map(to_vec3));
                patrols.push(Patrol {
                    pawn: id,
                    path,
                    next: 1,
                    speed: spec.speed,
                });
            }
        }

        let camera_ids: Vec<EntityId> = scenario
            .cameras
            .iter()
            .map(|c| {
                let id = world.spawn_actor();
                ids.insert(c.name.clone(), id);
                id
            })
            .collect();
        let laser_ids: Vec<EntityId> = scenario
            .lasers
            .iter()
            .map(|l| {
                let id = world.spawn_actor();
                ids.insert(l.name.clone(), id);
                id
            })
            .collect();
        let doors: Vec<LockdownDoor> = scenario
            .doors
            .iter()
            .map(|d| {
                let id = world.spawn_actor();
                ids.insert(d.name.clone(), id);
                LockdownDoor::new(id)
            })
            .collect();

        let names: Names = Rc::new(ids.iter().map(|(n, id)| (*id, n.clone())).collect());
        let (tx, inbox) = mpsc::channel();
        let mut clock = ManualClock::new();

        let mut cameras = Vec::with_capacity(scenario.cameras.len());
        for (i, (spec, id)) in scenario.cameras.iter().zip(camera_ids).enumerate() {
            let mut camera = SecurityCamera::new(
                id,
                to_vec3(spec.location),
                spec.sweep.clone(),
                spec.sensor.clone(),
                seed.wrapping_add(i as u64),
            );
            for observer in &spec.observers {
                let observer_id = ids
                    .get(observer)
                    .copied()
                    .ok_or_else(|| StealthError::UnknownEntity(observer.clone()))?;
                camera.add_observer(observer_id);
            }
            wire_camera(&mut camera, &spec.name, &tx, &names);
            camera.begin_play(&world, &mut clock);
            cameras.push(camera);
        }

        let mut lasers = Vec::with_capacity(scenario.lasers.len());
        for (spec, id) in scenario.lasers.iter().zip(laser_ids) {
            let mut laser = LaserEmitter::new(
                id,
                to_vec3(spec.location),
                to_vec3(spec.direction),
                spec.config.clone(),
            );
            wire_laser(&mut laser, &spec.name, &tx, &names);
            lasers.push(laser);
        }

        let mut noises: Vec<ScheduledNoise> = Vec::with_capacity(scenario.noises.len());
        for spec in &scenario.noises {
            let maker = ids
                .get(&spec.maker)
                .copied()
                .ok_or_else(|| StealthError::UnknownEntity(spec.maker.clone()))?;
            noises.push(ScheduledNoise {
                time: spec.time,
                maker,
                loudness: spec.loudness,
                location: spec.location.map(to_vec3),
            });
        }
        noises.sort_by(|a, b| a.time.total_cmp(&b.time));

        info!(
            scenario = scenario.name(),
            pawns = scenario.pawns.len(),
            cameras = cameras.len(),
            lasers = lasers.len(),
            "scenario loaded"
        );

        Ok(Self {
            name: scenario.name().to_string(),
            seed,
            world,
            clock,
            cameras,
            lasers,
            door_states: vec![false; doors.len()],
            doors,
            patrols,
            noises,
            next_noise: 0,
            ids,
            names,
            inbox,
            events: Vec::new(),
        })
    }

    // === ACCESSORS ===

    pub fn time(&self) -> Seconds {
        self.world.time()
    }

    pub fn world(&self) -> &StealthWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut StealthWorld {
        &mut self.world
    }

    pub fn events(&self) -> &[ScenarioEvent] {
        &self.events
    }

    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.ids.get(name).copied()
    }

    pub fn camera(&self, name: &str) -> Option<&SecurityCamera> {
        let id = self.id_of(name)?;
        self.cameras.iter().find(|c| c.id() == id)
    }

    pub fn laser(&self, name: &str) -> Option<&LaserEmitter> {
        let id = self.id_of(name)?;
        self.lasers.iter().find(|l| l.owner() == id)
    }

    pub fn door(&self, name: &str) -> Option<&LockdownDoor> {
        let id = self.id_of(name)?;
        self.doors.iter().find(|d| d.id == id)
    }

    /// Remove an entity mid-run, as if it were destroyed
    pub fn despawn(&mut self, name: &str) -> bool {
        let Some(id) = self.id_of(name) else {
            warn!(name, "despawn of unknown entity");
            return false;
        };
        self.patrols.retain(|p| p.pawn != id);
        self.lasers.retain(|l| l.owner() != id);
        self.world.despawn(id)
    }

    // === STEPPING ===

    /// Advance the scenario by `dt` seconds
    pub fn step(&mut self, dt: Seconds) {
        let dt = dt.max(0.0);

        for patrol in &mut self.patrols {
            if let Some(pawn) = self.world.pawn_mut(patrol.pawn) {
                patrol.advance(pawn, dt);
            }
        }
        for camera in &mut self.cameras {
            camera.tick(dt);
        }

        self.clock.advance(dt);
        let end = self.clock.target_time();

        // Noises and timers in time order; noises first on ties
        loop {
            let noise_due = self
                .noises
                .get(self.next_noise)
                .map(|n| n.time)
                .filter(|t| *t <= end);
            let timer_due = self.clock.next_due_time().filter(|t| *t <= end);

            match (noise_due, timer_due) {
                (Some(n), Some(t)) if n <= t => self.apply_next_noise(),
                (Some(_), None) => self.apply_next_noise(),
                _ => match self.clock.pop_due() {
                    Some(handle) => self.dispatch_timer(handle),
                    None => break,
                },
            }
        }

        self.world.set_time(end);
        for laser in &mut self.lasers {
            laser.tick(&self.world, &self.world);
        }
        self.drain_events(end);
    }

    /// Step until `duration` seconds have elapsed
    pub fn run(&mut self, duration: Seconds, dt: Seconds) {
        if dt <= 0.0 {
            warn!(dt, "non-positive step; nothing to run");
            return;
        }
        let steps = (duration / dt).round().max(0.0) as u64;
        for _ in 0..steps {
            self.step(dt);
        }
        debug!(time = self.time(), events = self.events.len(), "scenario run finished");
    }

    fn apply_next_noise(&mut self) {
        let Some(noise) = self.noises.get(self.next_noise).copied() else {
            return;
        };
        self.next_noise += 1;

        self.world.set_time(noise.time.max(self.world.time()));
        let location = match noise.location {
            Some(location) => Some(location),
            None => self.world.pawn(noise.maker).map(|p| p.location),
        };
        match location {
            Some(location) => {
                if !self.world.make_noise(noise.maker, noise.loudness, location) {
                    warn!(maker = %name_of(&self.names, noise.maker), "noise maker cannot emit");
                }
            }
            None => warn!(maker = %name_of(&self.names, noise.maker), "noise maker is gone"),
        }
    }

    fn dispatch_timer(&mut self, handle: TimerHandle) {
        let now = self.clock.now();
        self.world.set_time(now);

        let Some(idx) = self.cameras.iter().position(|c| c.owns_timer(handle)) else {
            return;
        };

        let (before, rest) = self.cameras.split_at_mut(idx);
        let Some((camera, after)) = rest.split_first_mut() else {
            return;
        };

        let mut table = ObserverTable::new();
        for other in before.iter_mut().chain(after.iter_mut()) {
            let id = other.id();
            table.insert(id, other);
        }
        for door in self.doors.iter_mut() {
            let id = door.id;
            table.insert(id, door);
        }

        camera.on_sensing_timer(handle, &self.world, &mut self.clock, &mut table);
        drop(table);
        self.drain_events(now);
    }

    fn drain_events(&mut self, time: Seconds) {
        for kind in self.inbox.try_iter() {
            self.events.push(ScenarioEvent { time, kind });
        }

        for (door, was_locked) in self.doors.iter().zip(self.door_states.iter_mut()) {
            if door.is_locked() != *was_locked {
                *was_locked = door.is_locked();
                let door = name_of(&self.names, door.id);
                let kind = if *was_locked {
                    EventKind::DoorLocked { door }
                } else {
                    EventKind::DoorUnlocked { door }
                };
                self.events.push(ScenarioEvent { time, kind });
            }
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            scenario: self.name.clone(),
            seed: self.seed,
            duration: self.time(),
            events: self.events.clone(),
            alerted_cameras: self
                .cameras
                .iter()
                .filter(|c| c.has_target())
                .map(|c| name_of(&self.names, c.id()))
                .collect(),
            locked_doors: self
                .doors
                .iter()
                .filter(|d| d.is_locked())
                .map(|d| name_of(&self.names, d.id))
                .collect(),
            tripped_lasers: self
                .lasers
                .iter()
                .filter(|l| l.is_touching_player())
                .map(|l| name_of(&self.names, l.owner()))
                .collect(),
        }
    }
}

fn wire_camera(camera: &mut SecurityCamera, name: &str, tx: &Sender<EventKind>, names: &Names) {
    let sensing = camera.sensing_mut();

    let (sensor, sink, lookup) = (name.to_string(), tx.clone(), names.clone());
    sensing.on_see_pawn.add(move |pawn: &EntityId| {
        let _ = sink.send(EventKind::PawnSeen {
            sensor: sensor.clone(),
            pawn: name_of(&lookup, *pawn),
        });
    });

    let (sensor, sink, lookup) = (name.to_string(), tx.clone(), names.clone());
    sensing.on_unsee_pawn.add(move |pawn: &EntityId| {
        let _ = sink.send(EventKind::PawnLost {
            sensor: sensor.clone(),
            pawn: name_of(&lookup, *pawn),
        });
    });

    let (sensor, sink, lookup) = (name.to_string(), tx.clone(), names.clone());
    sensing.on_hear_noise.add(move |noise: &HeardNoise| {
        let _ = sink.send(EventKind::NoiseHeard {
            sensor: sensor.clone(),
            pawn: name_of(&lookup, noise.instigator),
            location: noise.location.to_array(),
            volume: noise.volume,
        });
    });

    let (camera_name, sink) = (name.to_string(), tx.clone());
    camera.on_alarm_cue.add(move |cue: &AlarmCue| {
        let _ = sink.send(EventKind::AlarmCue {
            camera: camera_name.clone(),
            cue: *cue,
        });
    });
}

fn wire_laser(laser: &mut LaserEmitter, name: &str, tx: &Sender<EventKind>, names: &Names) {
    let (laser_name, sink, lookup) = (name.to_string(), tx.clone(), names.clone());
    laser.on_start_intercept.add(move |pawn: &EntityId| {
        let _ = sink.send(EventKind::LaserTripped {
            laser: laser_name.clone(),
            pawn: name_of(&lookup, *pawn),
        });
    });

    let (laser_name, sink, lookup) = (name.to_string(), tx.clone(), names.clone());
    laser.on_stop_intercept.add(move |pawn: &EntityId| {
        let _ = sink.send(EventKind::LaserCleared {
            laser: laser_name.clone(),
            pawn: name_of(&lookup, *pawn),
        });
    });
}
