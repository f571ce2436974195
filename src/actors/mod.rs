//! Actors built on top of sensing

pub mod alarm;
pub mod security_camera;

pub use alarm::{
    propagate_alarm, propagate_alarm_from, AlarmObserver, AlarmObservers, LockdownDoor,
    ObserverTable,
};
pub use security_camera::{AlarmCue, SecurityCamera};
