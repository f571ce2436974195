//! Stealth Sentry - perception, alarms and trip wires for stealth gameplay
//!
//! Sensors sample the world on a throttled timer and report what they see
//! and hear through multicast delegates. The world itself stays behind two
//! query traits so the same logic runs inside an engine or headless.

pub mod actors;
pub mod core;
pub mod hazards;
pub mod scenario;
pub mod sensing;
pub mod world;
