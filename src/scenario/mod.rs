//! Scenario files and headless playback

pub mod loader;
pub mod runner;

pub use loader::Scenario;
pub use runner::{EventKind, RunReport, ScenarioEvent, ScenarioRunner};
