//! Property tests for sight range, view cone and hearing bands

use proptest::prelude::*;
use stealth_sentry::core::types::direction_from_yaw_pitch;
use stealth_sentry::core::{EntityId, SensorConfig, Vec3};
use stealth_sentry::sensing::PawnSensing;
use stealth_sentry::world::{Aabb, Occluder, Pawn, StealthWorld};

fn sensor(angle: f32, yaw: f32, seed: u64) -> PawnSensing {
    let mut sensing = PawnSensing::seeded(EntityId::new(), SensorConfig::default(), seed);
    sensing.set_peripheral_vision_angle(angle);
    sensing.set_pose(Vec3::ZERO, direction_from_yaw_pitch(yaw, 0.0));
    sensing
}

/// Box enclosing the sensor except for a thin gap nobody aims through
fn walled_world() -> StealthWorld {
    let mut world = StealthWorld::new();
    world.add_occluder(Occluder::solid(Aabb::new(
        Vec3::new(-150.0, -150.0, -150.0),
        Vec3::new(-140.0, 150.0, 150.0),
    )));
    world.add_occluder(Occluder::solid(Aabb::new(
        Vec3::new(140.0, -150.0, -150.0),
        Vec3::new(150.0, 150.0, 150.0),
    )));
    world.add_occluder(Occluder::solid(Aabb::new(
        Vec3::new(-150.0, -150.0, -150.0),
        Vec3::new(150.0, -140.0, 150.0),
    )));
    world.add_occluder(Occluder::solid(Aabb::new(
        Vec3::new(-150.0, 140.0, -150.0),
        Vec3::new(150.0, 150.0, 150.0),
    )));
    world
}

proptest! {
    #[test]
    fn never_sees_beyond_sight_radius(
        extra in 0.5f32..20_000.0,
        yaw in -180.0f32..180.0,
        bearing in -180.0f32..180.0,
        angle in 0.0f32..180.0,
        may_skip in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let mut sensing = sensor(angle, yaw, seed);
        let distance = sensing.config().sight_radius + extra;
        let target = Pawn::player(direction_from_yaw_pitch(bearing, 0.0) * distance);
        prop_assert!(!sensing.could_see_pawn(&target, may_skip));
    }

    #[test]
    fn view_cone_decides_inside_range(
        yaw in -180.0f32..180.0,
        offset in -179.0f32..179.0,
        angle in 1.0f32..179.0,
        distance in 100.0f32..1900.0,
        seed in any::<u64>(),
    ) {
        // Keep clear of the exact edge where float rounding decides
        prop_assume!((offset.abs() - angle).abs() > 0.5);

        let mut sensing = sensor(angle, yaw, seed);
        let target = Pawn::player(direction_from_yaw_pitch(yaw + offset, 0.0) * distance);
        let expected = offset.abs() < angle;
        // Inside 0.4 * radius the random skip never rejects
        prop_assert_eq!(sensing.could_see_pawn(&target, true), expected);
    }

    #[test]
    fn hears_through_walls_inside_hearing_threshold(
        bearing in -180.0f32..180.0,
        loudness in 0.2f32..4.0,
        fraction in 0.2f32..0.99,
        failed_los in any::<bool>(),
    ) {
        let world = walled_world();
        let sensing = sensor(90.0, 0.0, 1);
        let distance = sensing.config().hearing_threshold * loudness * fraction;
        let location = direction_from_yaw_pitch(bearing, 0.0) * distance;
        prop_assert!(sensing.can_hear(location, loudness, failed_los, &world));
    }

    #[test]
    fn never_hears_beyond_los_threshold(
        bearing in -180.0f32..180.0,
        loudness in 0.2f32..4.0,
        fraction in 1.01f32..10.0,
    ) {
        let world = StealthWorld::new();
        let sensing = sensor(90.0, 0.0, 1);
        let distance = sensing.config().los_hearing_threshold * loudness * fraction;
        let location = direction_from_yaw_pitch(bearing, 0.0) * distance;
        prop_assert!(!sensing.can_hear(location, loudness, false, &world));
    }

    #[test]
    fn never_hears_silence(
        loudness in -10.0f32..=0.0,
        x in -100.0f32..100.0,
    ) {
        let world = StealthWorld::new();
        let sensing = sensor(90.0, 0.0, 1);
        prop_assert!(!sensing.can_hear(Vec3::new(x, 0.0, 0.0), loudness, false, &world));
    }
}

#[test]
fn test_cone_edge_is_inclusive() {
    // A zero-width cone still admits a target dead ahead: dot == cos(0)
    let mut sensing = sensor(0.0, 0.0, 3);
    assert_eq!(sensing.peripheral_vision_cosine(), 1.0);

    let ahead = Pawn::player(Vec3::new(1000.0, 0.0, 0.0));
    assert!(sensing.could_see_pawn(&ahead, false));

    let off_axis = Pawn::player(Vec3::new(1000.0, 10.0, 0.0));
    assert!(!sensing.could_see_pawn(&off_axis, false));
}
