//! Component configuration with documented constants
//!
//! All tunables are collected here with the values the level designers
//! tuned them to. Scenario files override individual fields; anything they
//! leave out falls back to `Default`.

use serde::Deserialize;

use crate::core::error::{Result, StealthError};

// === SIGHT CONSTANTS ===

/// Non-pawn targets beyond this distance never get the head-aim retry
pub const NEAR_SIGHT_THRESHOLD: f32 = 2000.0;
pub const NEAR_SIGHT_THRESHOLD_SQUARED: f32 = NEAR_SIGHT_THRESHOLD * NEAR_SIGHT_THRESHOLD;

/// No target beyond this distance gets the head-aim retry
pub const FAR_SIGHT_THRESHOLD: f32 = 8000.0;
pub const FAR_SIGHT_THRESHOLD_SQUARED: f32 = FAR_SIGHT_THRESHOLD * FAR_SIGHT_THRESHOLD;

/// Fraction of sight radius inside which the random skip never rejects
pub const SIGHT_SKIP_FRACTION: f32 = 0.4;

/// Smallest delay a timer is armed with
///
/// Used when an update is already overdue. Arming with zero would clear the
/// timer instead, and firing inline could loop if the callback changes the
/// interval again.
pub const MIN_TIMER_DELAY: f32 = 1.0e-4;

/// Distance the facing arrow sits ahead of the sensor origin
pub const FACING_ARROW_OFFSET: f32 = 100.0;

/// Configuration for a pawn-sensing component
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    // === SIGHT ===
    /// Maximum distance at which a pawn can be seen (world units)
    pub sight_radius: f32,

    /// Half-angle of the view cone in degrees
    ///
    /// 90 means anything in front of the sensor plane. The sensor caches the
    /// cosine of this value; change it through
    /// `PawnSensing::set_peripheral_vision_angle` so the cache follows.
    pub peripheral_vision_angle: f32,

    /// Whether this sensor looks for pawns at all
    pub see_pawns: bool,

    // === HEARING ===
    /// Loudness-adjusted distance inside which noise is heard through walls
    pub hearing_threshold: f32,

    /// Loudness-adjusted distance inside which unoccluded noise is heard
    ///
    /// Should be >= hearing_threshold; between the two a visibility trace
    /// decides.
    pub los_hearing_threshold: f32,

    /// Noises older than this (seconds) are ignored
    pub hearing_max_sound_age: f32,

    /// Whether this sensor listens for noise at all
    pub hear_noises: bool,

    // === SCHEDULING ===
    /// Seconds between sensing passes. <= 0 disables the timer.
    pub sensing_interval: f32,

    /// Whether sensing starts enabled when the component initializes
    pub enable_sensing_updates: bool,

    /// Only consider player-controlled pawns as candidates
    pub only_sense_players: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sight_radius: 5000.0,
            peripheral_vision_angle: 90.0,
            see_pawns: true,

            hearing_threshold: 1400.0,
            los_hearing_threshold: 2800.0,
            hearing_max_sound_age: 1.0,
            hear_noises: true,

            sensing_interval: 0.5,
            enable_sensing_updates: true,
            only_sense_players: true,
        }
    }
}

impl SensorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.sight_radius <= 0.0 {
            return Err(StealthError::InvalidConfig(format!(
                "sight_radius ({}) must be positive",
                self.sight_radius
            )));
        }

        if !(0.0..=180.0).contains(&self.peripheral_vision_angle) {
            return Err(StealthError::InvalidConfig(format!(
                "peripheral_vision_angle ({}) must be within [0, 180]",
                self.peripheral_vision_angle
            )));
        }

        if self.hearing_threshold < 0.0 || self.los_hearing_threshold < 0.0 {
            return Err(StealthError::InvalidConfig(
                "hearing thresholds must not be negative".into(),
            ));
        }

        if self.los_hearing_threshold < self.hearing_threshold {
            return Err(StealthError::InvalidConfig(format!(
                "los_hearing_threshold ({}) should be >= hearing_threshold ({})",
                self.los_hearing_threshold, self.hearing_threshold
            )));
        }

        if self.hearing_max_sound_age < 0.0 {
            return Err(StealthError::InvalidConfig(
                "hearing_max_sound_age must not be negative".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration for a laser trip wire
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    /// How far the beam reaches (world units)
    pub distance: f32,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self { distance: 500.0 }
    }
}

impl LaserConfig {
    pub fn validate(&self) -> Result<()> {
        if self.distance <= 0.0 {
            return Err(StealthError::InvalidConfig(format!(
                "laser distance ({}) must be positive",
                self.distance
            )));
        }
        Ok(())
    }
}

/// Configuration for a security camera's scanning sweep
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Centre of the sweep, degrees around Z
    pub default_yaw: f32,

    /// Sweep reaches default_yaw +/- max_yaw. 0 holds the camera still.
    pub max_yaw: f32,

    /// Fixed downward tilt in degrees (negative looks down)
    pub pitch: f32,

    /// Sweep speed in degrees per second
    pub sweep_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_yaw: 0.0,
            max_yaw: 45.0,
            pitch: -15.0,
            sweep_speed: 20.0,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_yaw < 0.0 || self.sweep_speed < 0.0 {
            return Err(StealthError::InvalidConfig(
                "max_yaw and sweep_speed must not be negative".into(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.pitch) {
            return Err(StealthError::InvalidConfig(format!(
                "pitch ({}) must be within [-90, 90]",
                self.pitch
            )));
        }
        Ok(())
    }
}
