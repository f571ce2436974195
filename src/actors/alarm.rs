//! Alarm propagation between actors
//!
//! Actors refer to their observers by id and resolve them through an
//! `AlarmObservers` lookup at notification time, so an observer that has
//! been removed is simply skipped. Propagation is a worklist: an observer
//! that changes state may relay to its own observers, and one that does not
//! change stops the chain.

use std::collections::VecDeque;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::core::types::EntityId;

pub trait AlarmObserver {
    /// Apply the alarm state. Returns true if it changed.
    fn set_alarm_state(&mut self, active: bool) -> bool;

    /// Observers to notify after this one changes
    fn relays_to(&self) -> &[EntityId] {
        &[]
    }
}

/// Resolves observer ids to live observers
pub trait AlarmObservers {
    fn observer_mut(&mut self, id: EntityId) -> Option<&mut dyn AlarmObserver>;
}

/// Id-keyed table of borrowed observers, built for one dispatch
#[derive(Default)]
pub struct ObserverTable<'a> {
    entries: AHashMap<EntityId, &'a mut dyn AlarmObserver>,
}

impl<'a> ObserverTable<'a> {
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    pub fn insert(&mut self, id: EntityId, observer: &'a mut dyn AlarmObserver) {
        self.entries.insert(id, observer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AlarmObservers for ObserverTable<'_> {
    fn observer_mut(&mut self, id: EntityId) -> Option<&mut dyn AlarmObserver> {
        match self.entries.get_mut(&id) {
            Some(observer) => Some(&mut **observer),
            None => None,
        }
    }
}

/// Lookup with nothing in it
pub struct NoObservers;

impl AlarmObservers for NoObservers {
    fn observer_mut(&mut self, _id: EntityId) -> Option<&mut dyn AlarmObserver> {
        None
    }
}

/// Push `active` to `targets` and onward through any relays
///
/// Returns how many observers changed state.
pub fn propagate_alarm(
    observers: &mut dyn AlarmObservers,
    targets: &[EntityId],
    active: bool,
) -> usize {
    propagate_alarm_from(observers, None, targets, active)
}

/// Like `propagate_alarm`, for a relaying `origin` that is not in the lookup
///
/// The origin already holds `active`, so relays that lead back to it stop
/// there.
pub fn propagate_alarm_from(
    observers: &mut dyn AlarmObservers,
    origin: Option<EntityId>,
    targets: &[EntityId],
    active: bool,
) -> usize {
    let mut queue: VecDeque<EntityId> = targets.iter().copied().collect();
    let mut changed = 0;

    while let Some(id) = queue.pop_front() {
        if origin == Some(id) {
            continue;
        }
        let Some(observer) = observers.observer_mut(id) else {
            warn!(observer = ?id, "alarm observer no longer exists");
            continue;
        };
        if observer.set_alarm_state(active) {
            changed += 1;
            queue.extend(observer.relays_to().iter().copied());
        }
    }

    changed
}

/// Door that locks while the alarm is raised
#[derive(Debug, Clone)]
pub struct LockdownDoor {
    pub id: EntityId,
    locked: bool,
    times_locked: u32,
}

impl LockdownDoor {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            locked: false,
            times_locked: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn times_locked(&self) -> u32 {
        self.times_locked
    }
}

impl AlarmObserver for LockdownDoor {
    fn set_alarm_state(&mut self, active: bool) -> bool {
        if self.locked == active {
            return false;
        }
        self.locked = active;
        if active {
            self.times_locked += 1;
        }
        debug!(door = ?self.id, locked = active, "door alarm state");
        true
    }
}
