//! Pawn sensing: sight and hearing on a throttled timer
//!
//! A `PawnSensing` component belongs to one sensor actor. Every
//! `sensing_interval` seconds it walks the candidate pawns, decides whether
//! it can see or hear each one, and broadcasts the result:
//!
//! - sight: range -> random distance skip -> view cone -> visibility trace
//!   (with a head-aim retry)
//! - hearing: only for pawns not seen this pass; local noise first, then
//!   remote noise
//!
//! Seeing and losing sight are edge-triggered per target. Hearing fires each
//! pass a relevant noise is audible.

use ahash::AHashSet;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::core::config::{
    SensorConfig, FACING_ARROW_OFFSET, FAR_SIGHT_THRESHOLD_SQUARED, MIN_TIMER_DELAY,
    NEAR_SIGHT_THRESHOLD_SQUARED, SIGHT_SKIP_FRACTION,
};
use crate::core::types::{EntityId, NetRole, TraceChannel, Vec3};
use crate::sensing::delegate::Multicast;
use crate::sensing::timer::{TimerHandle, TimerService};
use crate::world::noise::NoiseEmitter;
use crate::world::pawn::{EntityKind, Pawn};
use crate::world::{GeometryQuery, WorldView};

/// A noise that reached the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeardNoise {
    pub instigator: EntityId,
    pub location: Vec3,
    pub volume: f32,
}

/// Any sensing outcome, for consumers that want one stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensingEvent {
    SeePawn(EntityId),
    UnseePawn(EntityId),
    HearNoise(HeardNoise),
}

/// Where the sensor's facing direction comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FacingSource {
    /// Arrow attached ahead of the sensor; facing = tip - sensor location
    Arrow { tip: Vec3 },
    /// Owner actor's forward vector
    Owner { forward: Vec3 },
}

pub struct PawnSensing<R: Rng = ChaCha8Rng> {
    owner: EntityId,
    config: SensorConfig,
    peripheral_vision_cosine: f32,
    location: Vec3,
    facing: FacingSource,
    role: NetRole,
    updates_enabled: bool,
    timer: Option<TimerHandle>,
    /// Targets currently in line of sight
    in_sight: AHashSet<EntityId>,
    rng: R,

    pub on_see_pawn: Multicast<EntityId>,
    pub on_unsee_pawn: Multicast<EntityId>,
    pub on_hear_noise: Multicast<HeardNoise>,
}

impl PawnSensing<ChaCha8Rng> {
    /// Sensor with a seeded ChaCha8 random source
    pub fn seeded(owner: EntityId, config: SensorConfig, seed: u64) -> Self {
        Self::new(owner, config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> PawnSensing<R> {
    /// Sensor at the origin facing +X through its arrow
    pub fn new(owner: EntityId, config: SensorConfig, rng: R) -> Self {
        let peripheral_vision_cosine = config.peripheral_vision_angle.to_radians().cos();
        Self {
            owner,
            config,
            peripheral_vision_cosine,
            location: Vec3::ZERO,
            facing: FacingSource::Arrow {
                tip: Vec3::X * FACING_ARROW_OFFSET,
            },
            role: NetRole::Authority,
            updates_enabled: false,
            timer: None,
            in_sight: AHashSet::new(),
            rng,
            on_see_pawn: Multicast::new(),
            on_unsee_pawn: Multicast::new(),
            on_hear_noise: Multicast::new(),
        }
    }

    // === ACCESSORS ===

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn peripheral_vision_angle(&self) -> f32 {
        self.config.peripheral_vision_angle
    }

    pub fn peripheral_vision_cosine(&self) -> f32 {
        self.peripheral_vision_cosine
    }

    pub fn only_sense_players(&self) -> bool {
        self.config.only_sense_players
    }

    pub fn sensing_updates_enabled(&self) -> bool {
        self.updates_enabled
    }

    pub fn sensing_interval(&self) -> f32 {
        self.config.sensing_interval
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Whether `handle` is the timer this sensor is waiting on
    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.timer == Some(handle)
    }

    pub fn had_line_of_sight_to(&self, target: EntityId) -> bool {
        self.in_sight.contains(&target)
    }

    /// Whether any target is currently in line of sight
    pub fn had_line_of_sight(&self) -> bool {
        !self.in_sight.is_empty()
    }

    pub fn is_sensor_actor(&self, id: EntityId) -> bool {
        id == self.owner
    }

    // === CONFIGURATION ===

    pub fn set_peripheral_vision_angle(&mut self, angle_deg: f32) {
        self.config.peripheral_vision_angle = angle_deg;
        self.peripheral_vision_cosine = angle_deg.to_radians().cos();
    }

    pub fn set_sight_radius(&mut self, radius: f32) {
        self.config.sight_radius = radius;
    }

    pub fn set_only_sense_players(&mut self, only_players: bool) {
        self.config.only_sense_players = only_players;
    }

    pub fn set_see_pawns(&mut self, see: bool) {
        self.config.see_pawns = see;
    }

    pub fn set_hear_noises(&mut self, hear: bool) {
        self.config.hear_noises = hear;
    }

    pub fn set_net_role(&mut self, role: NetRole) {
        self.role = role;
    }

    pub fn set_facing_source(&mut self, facing: FacingSource) {
        self.facing = facing;
    }

    /// Move the sensor and aim it along `forward`
    pub fn set_pose(&mut self, location: Vec3, forward: Vec3) {
        self.location = location;
        self.facing = match self.facing {
            FacingSource::Arrow { .. } => FacingSource::Arrow {
                tip: location + forward.normalize_or_zero() * FACING_ARROW_OFFSET,
            },
            FacingSource::Owner { .. } => FacingSource::Owner { forward },
        };
    }

    /// Unnormalized facing vector
    pub fn sensor_rotation(&self) -> Vec3 {
        match self.facing {
            FacingSource::Arrow { tip } => tip - self.location,
            FacingSource::Owner { forward } => forward,
        }
    }

    // === SCHEDULING ===

    /// Arm the first timer if the config starts with updates enabled
    pub fn initialize(&mut self, timers: &mut dyn TimerService) {
        let start_enabled = self.config.enable_sensing_updates;
        self.updates_enabled = false;
        if start_enabled {
            self.set_sensing_updates_enabled(true, timers);
        }
    }

    pub fn set_sensing_updates_enabled(&mut self, enabled: bool, timers: &mut dyn TimerService) {
        if self.updates_enabled == enabled {
            return;
        }
        self.updates_enabled = enabled;
        self.config.enable_sensing_updates = enabled;

        if enabled && self.config.sensing_interval > 0.0 {
            // Stagger so that sensors enabled together do not all fire together
            let jitter: f32 = self.rng.gen();
            let delay = self.config.sensing_interval * jitter + MIN_TIMER_DELAY;
            self.set_timer(delay, timers);
        } else {
            self.set_timer(0.0, timers);
        }
    }

    pub fn set_sensing_interval(&mut self, interval: f32, timers: &mut dyn TimerService) {
        if self.config.sensing_interval == interval {
            return;
        }
        self.config.sensing_interval = interval;

        if interval <= 0.0 {
            self.set_timer(0.0, timers);
        } else if self.updates_enabled {
            let elapsed = self
                .timer
                .and_then(|h| timers.timer_elapsed(h))
                .unwrap_or(0.0)
                .max(0.0);

            if elapsed < interval {
                self.set_timer(interval - elapsed, timers);
            } else if elapsed > interval {
                // Already overdue: fire on the next clock step, never inline
                self.set_timer(MIN_TIMER_DELAY, timers);
            }
        }
    }

    /// Cancel any pending timer
    pub fn shutdown(&mut self, timers: &mut dyn TimerService) {
        self.updates_enabled = false;
        if let Some(h) = self.timer.take() {
            timers.clear_timer(h);
        }
    }

    /// Replace the pending timer. A delay <= 0 only clears it.
    fn set_timer(&mut self, delay: f32, timers: &mut dyn TimerService) {
        if !self.role.is_authority() {
            return;
        }
        if let Some(h) = self.timer.take() {
            timers.clear_timer(h);
        }
        if delay > 0.0 {
            self.timer = Some(timers.set_timer(delay));
        }
    }

    /// Timer callback. Stale handles are ignored.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        world: &dyn WorldView,
        timers: &mut dyn TimerService,
    ) {
        if !self.owns_timer(handle) {
            return;
        }
        self.timer = None;

        if !world.contains(self.owner) {
            debug!(owner = ?self.owner, "sensor owner gone, dropping timer");
            return;
        }

        if self.can_sense_anything() {
            self.update_ai_sensing(world);
        }

        if self.updates_enabled {
            self.set_timer(self.config.sensing_interval, timers);
        }
    }

    // === SENSING ===

    /// Whether anyone is listening for what this sensor could report
    pub fn can_sense_anything(&self) -> bool {
        (self.config.hear_noises && self.on_hear_noise.is_bound())
            || (self.config.see_pawns && self.on_see_pawn.is_bound())
    }

    /// One full sensing pass over the candidate pawns
    pub fn update_ai_sensing(&mut self, world: &dyn WorldView) {
        let candidates = if self.config.only_sense_players {
            world.player_entities()
        } else {
            world.controlled_entities()
        };

        // Forget targets that no longer exist
        self.in_sight.retain(|id| world.contains(*id));

        for pawn in candidates {
            if !self.is_sensor_actor(pawn.id) {
                self.sense_pawn(pawn, world);
            }
        }
    }

    pub fn sense_pawn(&mut self, pawn: &Pawn, world: &dyn WorldView) {
        let mut seen = false;
        let mut failed_line_of_sight = false;

        if self.config.see_pawns && self.should_check_visibility_of(pawn, world) {
            if self.could_see_pawn(pawn, true) {
                if self.has_line_of_sight_to(pawn, world) {
                    seen = true;
                    if self.in_sight.insert(pawn.id) {
                        debug!(target_id = ?pawn.id, "pawn seen");
                        self.on_see_pawn.broadcast(&pawn.id);
                    }
                } else {
                    trace!(target_id = ?pawn.id, "no line of sight to pawn");
                    if self.in_sight.remove(&pawn.id) {
                        debug!(target_id = ?pawn.id, "pawn lost from sight");
                        self.on_unsee_pawn.broadcast(&pawn.id);
                    }
                    failed_line_of_sight = true;
                }
            } else {
                trace!(target_id = ?pawn.id, "pawn outside sight cone or skipped");
            }
        } else {
            trace!(target_id = ?pawn.id, "not checking visibility");
        }

        // No need to hear what is already seen
        if seen {
            return;
        }

        if !self.config.hear_noises || !self.on_hear_noise.is_bound() {
            return;
        }

        let Some(emitter) = pawn.noise.as_ref() else {
            return;
        };
        if !self.should_check_audibility_of(pawn, world) {
            return;
        }

        let local_volume = emitter.last_noise_volume(true);
        let remote_volume = emitter.last_noise_volume(false);

        if self.is_noise_relevant(emitter, true, world)
            && self.can_hear(pawn.location, local_volume, failed_line_of_sight, world)
        {
            self.broadcast_hear_local_noise(pawn.id, pawn.location, local_volume);
        } else if let Some(remote_location) = emitter.last_remote_noise_position() {
            if self.is_noise_relevant(emitter, false, world)
                && self.can_hear(remote_location, remote_volume, false, world)
            {
                self.broadcast_hear_remote_noise(pawn.id, remote_location, remote_volume);
            }
        }
    }

    fn broadcast_hear_local_noise(&mut self, instigator: EntityId, location: Vec3, volume: f32) {
        debug!(?instigator, volume, "heard local noise");
        self.on_hear_noise.broadcast(&HeardNoise {
            instigator,
            location,
            volume,
        });
    }

    // Remote noise shares the local delegate; listeners cannot tell them apart.
    fn broadcast_hear_remote_noise(&mut self, instigator: EntityId, location: Vec3, volume: f32) {
        debug!(?instigator, volume, "heard remote noise");
        self.on_hear_noise.broadcast(&HeardNoise {
            instigator,
            location,
            volume,
        });
    }

    pub fn should_check_visibility_of(&self, pawn: &Pawn, world: &dyn WorldView) -> bool {
        let is_player = pawn.player_controlled;
        if !self.config.see_pawns || (self.config.only_sense_players && !is_player) {
            return false;
        }
        if is_player && world.ai_ignores_players() {
            return false;
        }
        !world.is_hidden(pawn.id)
    }

    pub fn should_check_audibility_of(&self, pawn: &Pawn, world: &dyn WorldView) -> bool {
        let is_player = pawn.player_controlled;
        if !self.config.hear_noises || (self.config.only_sense_players && !is_player) {
            return false;
        }
        !(is_player && world.ai_ignores_players())
    }

    /// Range, random distance skip and view cone, in that order
    ///
    /// With `may_skip_checks`, a target at distance d is rejected when
    /// `u^2 * d^2 > (0.4 * sight_radius)^2` for a fresh `u` in [0, 1), so
    /// far targets take more passes to acquire. The cone test is inclusive.
    pub fn could_see_pawn(&mut self, pawn: &Pawn, may_skip_checks: bool) -> bool {
        let to_target = pawn.location - self.location;
        let dist_sq = to_target.length_squared();

        if dist_sq > self.config.sight_radius * self.config.sight_radius {
            return false;
        }

        if may_skip_checks {
            let u: f32 = self.rng.gen();
            let near = SIGHT_SKIP_FRACTION * self.config.sight_radius;
            if u * u * dist_sq > near * near {
                return false;
            }
        }

        let to_target_dir = to_target.normalize_or_zero();
        let facing_dir = self.sensor_rotation().normalize_or_zero();
        let dot = to_target_dir.dot(facing_dir);
        trace!(dot, cosine = self.peripheral_vision_cosine, "view cone test");
        dot >= self.peripheral_vision_cosine
    }

    /// Visibility trace to the aim point, then to the head for pawns
    pub fn has_line_of_sight_to(
        &self,
        target: &Pawn,
        geometry: &(impl GeometryQuery + ?Sized),
    ) -> bool {
        let ignore = [target.id, self.owner];
        let view_point = self.location;

        let aim = target.target_location();
        if !geometry.test_line(view_point, aim, TraceChannel::Visibility, &ignore) {
            return true;
        }

        // Only trust the cylinder for pawns and capsule-rooted actors
        if !target.kind.has_reliable_cylinder() {
            return false;
        }

        let dist_sq = target.location.distance_squared(view_point);
        if dist_sq > FAR_SIGHT_THRESHOLD_SQUARED {
            return false;
        }
        if target.kind != EntityKind::Pawn && dist_sq > NEAR_SIGHT_THRESHOLD_SQUARED {
            return false;
        }

        !geometry.test_line(view_point, target.head_location(), TraceChannel::Visibility, &ignore)
    }

    pub fn is_noise_relevant(
        &self,
        emitter: &NoiseEmitter,
        local: bool,
        world: &dyn WorldView,
    ) -> bool {
        if emitter.last_noise_volume(local) <= 0.0 {
            return false;
        }

        let noise_time = emitter.last_noise_time(local);
        if world.now() - noise_time > self.config.hearing_max_sound_age {
            return false;
        }

        // Sensors ignore noise made before they existed
        match world.creation_time(self.owner) {
            Some(created) => noise_time >= created,
            None => false,
        }
    }

    /// Hearing test for a noise of `loudness` at `location`
    pub fn can_hear(
        &self,
        location: Vec3,
        loudness: f32,
        failed_line_of_sight: bool,
        geometry: &(impl GeometryQuery + ?Sized),
    ) -> bool {
        if loudness <= 0.0 {
            return false;
        }

        let adjusted_dist_sq = self.location.distance_squared(location) / (loudness * loudness);
        let hearing = self.config.hearing_threshold;
        if adjusted_dist_sq <= hearing * hearing {
            // Heard through walls
            return true;
        }

        let los_hearing = self.config.los_hearing_threshold;
        if failed_line_of_sight || adjusted_dist_sq > los_hearing * los_hearing {
            return false;
        }

        !geometry.test_line(self.location, location, TraceChannel::Visibility, &[self.owner])
    }
}

impl<R: Rng> std::fmt::Debug for PawnSensing<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PawnSensing")
            .field("owner", &self.owner)
            .field("location", &self.location)
            .field("updates_enabled", &self.updates_enabled)
            .field("timer", &self.timer)
            .field("in_sight", &self.in_sight.len())
            .finish()
    }
}
