//! Integration tests for the ranging-to-position half of the pipeline
//!
//! Drives the beacon registry with synthetic RSSI streams and checks
//! that the least-squares solver turns the ranges into sane fixes.

mod common;

use common::generators::{noisy_rssi, observe_from, register_hall, HALL_SURVEY, TX_POWER};
use common::TestRng;

use wayfarer_core::{
    Beacon, BeaconRegistry, BeaconTriangulator, PositionSource, RangingConfig, RangingError,
};

#[test]
fn ranged_beacons_triangulate_near_truth() {
    let mut rng = TestRng::new(42);
    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    register_hall(&mut registry);

    // Fifteen advertisement rounds from a receiver at (3.0, 4.0)
    let mut now = 0;
    for _ in 0..15 {
        now += 200;
        observe_from(&mut registry, 3.0, 4.0, 2.0, now, &mut rng);
    }

    registry.sweep(now);
    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    assert_eq!(beacons.len(), 4);

    let fix = BeaconTriangulator::default().triangulate(&beacons, now);
    assert!(fix.is_valid());
    assert_eq!(fix.source, PositionSource::Ble);
    assert_eq!(fix.timestamp, now);

    let dx = fix.x - 3.0;
    let dy = fix.y - 4.0;
    let error = (dx * dx + dy * dy).sqrt();
    assert!(error < 1.0, "fix error {} m", error);
    assert!(fix.accuracy < 1.5, "rmse {}", fix.accuracy);

    // Four of six beacons, small residual
    let confidence = fix.confidence.as_float();
    assert!(
        confidence > 0.45 && confidence < 0.72,
        "confidence {}",
        confidence
    );
}

#[test]
fn losing_a_beacon_lowers_confidence() {
    let mut rng = TestRng::new(7);
    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    register_hall(&mut registry);

    let mut now = 0;
    for _ in 0..15 {
        now += 200;
        observe_from(&mut registry, 3.0, 4.0, 2.0, now, &mut rng);
    }
    registry.sweep(now);
    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    let four_beacon_fix = BeaconTriangulator::default().triangulate(&beacons, now);

    // One beacon goes silent; the others keep advertising until its
    // last observation ages out
    let silent = HALL_SURVEY[1].0;
    for _ in 0..10 {
        now += 200;
        for (address, bx, by) in &HALL_SURVEY {
            if *address == silent {
                continue;
            }
            let dx = 3.0 - bx;
            let dy = 4.0 - by;
            let rssi = noisy_rssi((dx * dx + dy * dy).sqrt(), 2.0, &mut rng);
            registry.observe(address, rssi, now).unwrap();
        }
    }
    now += 4000;
    registry.sweep(now);

    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    assert_eq!(beacons.len(), 3);

    let three_beacon_fix = BeaconTriangulator::default().triangulate(&beacons, now);
    assert!(three_beacon_fix.is_valid());
    assert!(
        three_beacon_fix.confidence < four_beacon_fix.confidence,
        "3-beacon confidence {} should trail 4-beacon {}",
        three_beacon_fix.confidence.as_float(),
        four_beacon_fix.confidence.as_float()
    );

    let dx = three_beacon_fix.x - 3.0;
    let dy = three_beacon_fix.y - 4.0;
    assert!((dx * dx + dy * dy).sqrt() < 1.5);
}

#[test]
fn silent_registry_yields_invalid_fix() {
    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    register_hall(&mut registry);

    // Surveyed but never heard: nothing is usable
    registry.sweep(1000);
    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    assert!(beacons.is_empty());

    let fix = BeaconTriangulator::default().triangulate(&beacons, 1000);
    assert!(!fix.is_valid());
    assert_eq!(fix.source, PositionSource::Unknown);
    assert_eq!(fix.timestamp, 1000);
    assert_eq!(fix.accuracy, f32::MAX);
    assert_eq!(fix.confidence.value(), 0);
}

#[test]
fn re_registering_resets_ranging_state() {
    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    let (address, x, y) = HALL_SURVEY[0];
    registry.register(address, Some("door"), x, y, TX_POWER).unwrap();

    // Settle the filter on a nearby reading
    for round in 0..5u64 {
        registry.observe(&address, -65.0, round * 200).unwrap();
    }
    let settled = registry.get(&address).unwrap().estimated_distance;
    assert_close!(settled, 2.0, 0.1);

    // Survey update: same hardware, new calibration pass
    registry.register(address, Some("door"), x, y, TX_POWER).unwrap();
    assert!(registry.get(&address).unwrap().stale);

    // The first observation after a reset seeds the filter directly,
    // so a single packet fully determines the estimate
    let distance = registry.observe(&address, -79.0, 2000).unwrap();
    assert_close!(distance, 10.0, 0.001);
    let beacon = registry.get(&address).unwrap();
    assert!(beacon.distance_confidence.as_float() > 0.99);
    assert!(!beacon.stale);
}

#[test]
fn unknown_beacon_is_rejected() {
    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    register_hall(&mut registry);

    let stranger = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x05];
    assert!(matches!(
        registry.observe(&stranger, -70.0, 100),
        Err(RangingError::UnknownBeacon)
    ));
}
