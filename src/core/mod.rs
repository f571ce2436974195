pub mod config;
pub mod error;
pub mod types;

pub use config::{CameraConfig, LaserConfig, SensorConfig};
pub use error::{Result, StealthError};
pub use types::{EntityId, NetRole, Seconds, TraceChannel, Vec3};
