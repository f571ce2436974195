//! Noise emission records carried by pawns
//!
//! A pawn remembers the last noise it made itself (local) and the last noise
//! it caused somewhere else (remote, e.g. a thrown object landing). Sensors
//! read these records; they never consume them.

use crate::core::types::{Seconds, Vec3};

/// Noises closer than this to the maker count as made at the maker
pub const LOCAL_NOISE_RADIUS: f32 = 50.0;

/// A stored noise can be replaced by a quieter one once it is this old
pub const NOISE_LIFETIME: Seconds = 1.0;

/// One remembered noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRecord {
    pub location: Vec3,
    pub volume: f32,
    pub time: Seconds,
}

/// Per-pawn noise memory
#[derive(Debug, Clone, Default)]
pub struct NoiseEmitter {
    local: Option<NoiseRecord>,
    remote: Option<NoiseRecord>,
}

impl NoiseEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a noise made by the owning pawn
    ///
    /// Returns true if it replaced the stored record. A louder noise always
    /// wins; a quieter one only once the stored noise has outlived
    /// `NOISE_LIFETIME`.
    pub fn make_noise(
        &mut self,
        maker_location: Vec3,
        loudness: f32,
        location: Vec3,
        now: Seconds,
    ) -> bool {
        let local = maker_location.distance_squared(location)
            <= LOCAL_NOISE_RADIUS * LOCAL_NOISE_RADIUS;
        let slot = if local { &mut self.local } else { &mut self.remote };

        let replace = match slot {
            None => true,
            Some(prev) => now - prev.time > NOISE_LIFETIME || loudness >= prev.volume,
        };

        if replace {
            *slot = Some(NoiseRecord {
                location,
                volume: loudness,
                time: now,
            });
        }
        replace
    }

    /// Last noise of the given kind, if any was ever made
    pub fn last_noise(&self, local: bool) -> Option<NoiseRecord> {
        if local {
            self.local
        } else {
            self.remote
        }
    }

    pub fn last_noise_volume(&self, local: bool) -> f32 {
        self.last_noise(local).map(|n| n.volume).unwrap_or(0.0)
    }

    pub fn last_noise_time(&self, local: bool) -> Seconds {
        self.last_noise(local).map(|n| n.time).unwrap_or(f32::NEG_INFINITY)
    }

    /// Where the last remote noise happened
    pub fn last_remote_noise_position(&self) -> Option<Vec3> {
        self.remote.map(|n| n.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_emitter() {
        let emitter = NoiseEmitter::new();
        assert!(emitter.last_noise(true).is_none());
        assert_eq!(emitter.last_noise_volume(false), 0.0);
        assert!(emitter.last_remote_noise_position().is_none());
    }

    #[test]
    fn test_local_and_remote_classification() {
        let mut emitter = NoiseEmitter::new();
        let maker = Vec3::new(0.0, 0.0, 0.0);

        emitter.make_noise(maker, 1.0, Vec3::new(30.0, 0.0, 0.0), 1.0);
        assert!(emitter.last_noise(true).is_some());
        assert!(emitter.last_noise(false).is_none());

        emitter.make_noise(maker, 0.5, Vec3::new(600.0, 0.0, 0.0), 1.0);
        assert_eq!(
            emitter.last_remote_noise_position(),
            Some(Vec3::new(600.0, 0.0, 0.0))
        );
        assert_eq!(emitter.last_noise_volume(false), 0.5);
    }

    #[test]
    fn test_quieter_noise_waits_for_lifetime() {
        let mut emitter = NoiseEmitter::new();
        let maker = Vec3::ZERO;

        assert!(emitter.make_noise(maker, 1.0, maker, 0.0));
        // Quieter and still fresh: ignored
        assert!(!emitter.make_noise(maker, 0.2, maker, 0.5));
        assert_eq!(emitter.last_noise_volume(true), 1.0);

        // Louder replaces immediately
        assert!(emitter.make_noise(maker, 1.5, maker, 0.6));
        assert_eq!(emitter.last_noise_time(true), 0.6);

        // Quieter replaces once the stored one is stale
        assert!(emitter.make_noise(maker, 0.2, maker, 2.0));
        assert_eq!(emitter.last_noise_volume(true), 0.2);
    }
}
