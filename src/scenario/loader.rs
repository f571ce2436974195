//! TOML scenario files
//!
//! A scenario names every entity so cameras can list their observers and
//! noises can name their maker. Names are resolved by the runner; `validate`
//! checks that every reference points at something declared.

use std::path::Path;

use ahash::AHashSet;
use serde::Deserialize;

use crate::core::config::{CameraConfig, LaserConfig, SensorConfig};
use crate::core::error::{Result, StealthError};
use crate::core::types::{Seconds, Vec3};
use crate::world::geometry::Blocking;
use crate::world::pawn::EntityKind;

fn default_speed() -> f32 {
    300.0
}

fn default_loudness() -> f32 {
    1.0
}

fn default_direction() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

pub fn to_vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub name: Option<String>,
    pub ai_ignores_players: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccluderSpec {
    pub min: [f32; 3],
    pub max: [f32; 3],
    #[serde(default)]
    pub blocking: Blocking,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PawnSpec {
    pub name: String,
    pub location: [f32; 3],
    #[serde(default)]
    pub player: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub kind: EntityKind,
    /// Patrol points visited in order, looping back to the start location
    #[serde(default)]
    pub waypoints: Vec<[f32; 3]>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Players always carry an emitter; NPCs only when this is set
    #[serde(default)]
    pub noise_emitter: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSpec {
    pub name: String,
    pub location: [f32; 3],
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub sweep: CameraConfig,
    /// Doors or cameras told about alarm changes
    #[serde(default)]
    pub observers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaserSpec {
    pub name: String,
    pub location: [f32; 3],
    #[serde(default = "default_direction")]
    pub direction: [f32; 3],
    #[serde(flatten)]
    pub config: LaserConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoorSpec {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoiseSpec {
    pub time: Seconds,
    pub maker: String,
    #[serde(default = "default_loudness")]
    pub loudness: f32,
    /// Where the noise happens; the maker's position when omitted
    pub location: Option<[f32; 3]>,
}

/// A parsed scenario file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub occluders: Vec<OccluderSpec>,
    #[serde(default)]
    pub pawns: Vec<PawnSpec>,
    #[serde(default)]
    pub cameras: Vec<CameraSpec>,
    #[serde(default)]
    pub lasers: Vec<LaserSpec>,
    #[serde(default)]
    pub doors: Vec<DoorSpec>,
    #[serde(default)]
    pub noises: Vec<NoiseSpec>,
}

impl Scenario {
    /// Load and validate a scenario from disk
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a scenario from TOML text
    pub fn parse_toml(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn name(&self) -> &str {
        self.world.name.as_deref().unwrap_or("unnamed")
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = AHashSet::new();
        let declared = self
            .pawns
            .iter()
            .map(|p| &p.name)
            .chain(self.cameras.iter().map(|c| &c.name))
            .chain(self.lasers.iter().map(|l| &l.name))
            .chain(self.doors.iter().map(|d| &d.name));
        for name in declared {
            if !names.insert(name.as_str()) {
                return Err(StealthError::DuplicateEntity(name.clone()));
            }
        }

        for pawn in &self.pawns {
            if pawn.speed < 0.0 {
                return Err(StealthError::InvalidConfig(format!(
                    "pawn '{}' has negative speed",
                    pawn.name
                )));
            }
        }

        let observer_names: AHashSet<&str> = self
            .cameras
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.doors.iter().map(|d| d.name.as_str()))
            .collect();

        for camera in &self.cameras {
            camera.sensor.validate()?;
            camera.sweep.validate()?;
            for observer in &camera.observers {
                if !observer_names.contains(observer.as_str()) {
                    return Err(StealthError::UnknownEntity(format!(
                        "camera '{}' observer '{}'",
                        camera.name, observer
                    )));
                }
            }
        }

        for laser in &self.lasers {
            laser.config.validate()?;
            if to_vec3(laser.direction).length_squared() == 0.0 {
                return Err(StealthError::InvalidConfig(format!(
                    "laser '{}' has a zero direction",
                    laser.name
                )));
            }
        }

        let pawn_names: AHashSet<&str> = self.pawns.iter().map(|p| p.name.as_str()).collect();
        for noise in &self.noises {
            if !pawn_names.contains(noise.maker.as_str()) {
                return Err(StealthError::UnknownEntity(format!(
                    "noise maker '{}'",
                    noise.maker
                )));
            }
            if noise.time < 0.0 {
                return Err(StealthError::InvalidConfig(format!(
                    "noise by '{}' scheduled at negative time",
                    noise.maker
                )));
            }
        }

        Ok(())
    }
}
