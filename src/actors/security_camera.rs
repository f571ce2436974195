//! Security camera: a pawn sensor that raises an alarm on sight of the player
//!
//! The camera listens to its sensor's see/unsee delegates through a channel
//! inbox, then applies the events once the sensing pass has returned. While
//! calm it sweeps its yaw back and forth; while alert it holds still.

use std::sync::mpsc::{self, Receiver};

use serde::Serialize;
use tracing::debug;

use crate::actors::alarm::{propagate_alarm_from, AlarmObserver, AlarmObservers};
use crate::core::config::{CameraConfig, SensorConfig};
use crate::core::types::{direction_from_yaw_pitch, EntityId, Seconds, Vec3};
use crate::sensing::delegate::Multicast;
use crate::sensing::perception::{PawnSensing, SensingEvent};
use crate::sensing::timer::{TimerHandle, TimerService};
use crate::world::{EntityRegistry, WorldView};

/// Presentation cue for a camera state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmCue {
    LockOn,
    LockOff,
}

pub struct SecurityCamera {
    id: EntityId,
    location: Vec3,
    config: CameraConfig,
    sensing: PawnSensing,
    inbox: Receiver<SensingEvent>,
    has_target: bool,
    player: Option<EntityId>,
    observers: Vec<EntityId>,
    yaw: f32,
    sweep_direction: f32,

    pub on_alarm_cue: Multicast<AlarmCue>,
}

impl SecurityCamera {
    /// `id` is the camera actor and owns the sensor
    pub fn new(
        id: EntityId,
        location: Vec3,
        config: CameraConfig,
        sensor_config: SensorConfig,
        seed: u64,
    ) -> Self {
        let mut sensing = PawnSensing::seeded(id, sensor_config, seed);
        let (tx, inbox) = mpsc::channel();

        let see_tx = tx.clone();
        sensing.on_see_pawn.add(move |pawn: &EntityId| {
            let _ = see_tx.send(SensingEvent::SeePawn(*pawn));
        });
        sensing.on_unsee_pawn.add(move |pawn: &EntityId| {
            let _ = tx.send(SensingEvent::UnseePawn(*pawn));
        });

        let yaw = config.default_yaw;
        sensing.set_pose(location, direction_from_yaw_pitch(yaw, config.pitch));

        Self {
            id,
            location,
            config,
            sensing,
            inbox,
            has_target: false,
            player: None,
            observers: Vec::new(),
            yaw,
            sweep_direction: 1.0,
            on_alarm_cue: Multicast::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn has_target(&self) -> bool {
        self.has_target
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn cached_player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn sensing(&self) -> &PawnSensing {
        &self.sensing
    }

    pub fn sensing_mut(&mut self) -> &mut PawnSensing {
        &mut self.sensing
    }

    pub fn observers(&self) -> &[EntityId] {
        &self.observers
    }

    pub fn add_observer(&mut self, observer: EntityId) {
        if observer != self.id && !self.observers.contains(&observer) {
            self.observers.push(observer);
        }
    }

    /// Cache the player and start sensing
    pub fn begin_play(&mut self, registry: &dyn EntityRegistry, timers: &mut dyn TimerService) {
        self.player = registry.local_player_entity();
        self.sensing.initialize(timers);
    }

    pub fn end_play(&mut self, timers: &mut dyn TimerService) {
        self.sensing.shutdown(timers);
    }

    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.sensing.owns_timer(handle)
    }

    /// Run the sensor for a fired timer and react to what it reported
    pub fn on_sensing_timer(
        &mut self,
        handle: TimerHandle,
        world: &dyn WorldView,
        timers: &mut dyn TimerService,
        observers: &mut dyn AlarmObservers,
    ) {
        self.sensing.on_timer(handle, world, timers);

        let events: Vec<SensingEvent> = self.inbox.try_iter().collect();
        for event in events {
            self.handle_sensing_event(event, observers);
        }
    }

    pub fn handle_sensing_event(&mut self, event: SensingEvent, observers: &mut dyn AlarmObservers) {
        match event {
            SensingEvent::SeePawn(pawn) => {
                if self.has_target || !self.qualifies(pawn) {
                    return;
                }
                debug!(camera = ?self.id, ?pawn, "camera locked on");
                self.enter_alert(true);
                self.notify_observers(observers, true);
            }
            SensingEvent::UnseePawn(pawn) => {
                if !self.qualifies(pawn) {
                    return;
                }
                debug!(camera = ?self.id, ?pawn, "camera lost target");
                self.enter_alert(false);
                self.notify_observers(observers, false);
            }
            SensingEvent::HearNoise(_) => {}
        }
    }

    /// Set the alarm state from outside and tell the observers if it changed
    ///
    /// Returns whether the camera's own state changed.
    pub fn force_alarm_state(&mut self, active: bool, observers: &mut dyn AlarmObservers) -> bool {
        if !self.set_alarm_state(active) {
            return false;
        }
        self.notify_observers(observers, active);
        true
    }

    fn notify_observers(&self, observers: &mut dyn AlarmObservers, active: bool) {
        propagate_alarm_from(observers, Some(self.id), &self.observers, active);
    }

    // An unrestricted sensor reports every pawn; only the player counts
    fn qualifies(&self, pawn: EntityId) -> bool {
        self.sensing.only_sense_players() || self.player == Some(pawn)
    }

    fn enter_alert(&mut self, alert: bool) {
        self.has_target = alert;
        let cue = if alert {
            AlarmCue::LockOn
        } else {
            AlarmCue::LockOff
        };
        self.on_alarm_cue.broadcast(&cue);
    }

    /// Advance the scanning sweep while calm
    pub fn tick(&mut self, dt: Seconds) {
        if self.has_target || self.config.max_yaw <= 0.0 || self.config.sweep_speed <= 0.0 {
            return;
        }

        let min_yaw = self.config.default_yaw - self.config.max_yaw;
        let max_yaw = self.config.default_yaw + self.config.max_yaw;
        let mut yaw = self.yaw + self.sweep_direction * self.config.sweep_speed * dt;

        if yaw >= max_yaw {
            yaw = max_yaw - (yaw - max_yaw);
            self.sweep_direction = -1.0;
        } else if yaw <= min_yaw {
            yaw = min_yaw + (min_yaw - yaw);
            self.sweep_direction = 1.0;
        }
        self.yaw = yaw.clamp(min_yaw, max_yaw);

        let forward = direction_from_yaw_pitch(self.yaw, self.config.pitch);
        self.sensing.set_pose(self.location, forward);
    }
}

impl AlarmObserver for SecurityCamera {
    fn set_alarm_state(&mut self, active: bool) -> bool {
        if self.has_target == active {
            return false;
        }
        debug!(camera = ?self.id, active, "camera alarm state forced");
        self.enter_alert(active);
        true
    }

    fn relays_to(&self) -> &[EntityId] {
        &self.observers
    }
}

impl std::fmt::Debug for SecurityCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityCamera")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("has_target", &self.has_target)
            .field("yaw", &self.yaw)
            .field("observers", &self.observers)
            .finish()
    }
}
