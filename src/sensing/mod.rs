//! Timer-driven perception for sensor actors

pub mod delegate;
pub mod perception;
pub mod timer;

pub use delegate::{ListenerId, Multicast};
pub use perception::{FacingSource, HeardNoise, PawnSensing, SensingEvent};
pub use timer::{ManualClock, TimerHandle, TimerService};
