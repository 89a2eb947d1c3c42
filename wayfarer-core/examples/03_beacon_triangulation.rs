//! Beacon Triangulation Example
//!
//! This example demonstrates BLE beacon ranging and least-squares
//! position solving: RSSI in, meters out.
//!
//! ## What You'll Learn
//!
//! - Registering surveyed beacons with the ranging registry
//! - How RSSI smoothing settles the distance estimate
//! - Solving for position with Gauss-Newton iteration
//! - What staleness does to solution confidence
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 03_beacon_triangulation
//! ```

use wayfarer_core::{Beacon, BeaconAddress, BeaconRegistry, BeaconTriangulator, RangingConfig};

/// Surveyed beacon layout for a small hall, coordinates in meters
const ENTRANCE: BeaconAddress = [0xC8, 0x2B, 0x96, 0x00, 0x00, 0x01];
const CAFE: BeaconAddress = [0xC8, 0x2B, 0x96, 0x00, 0x00, 0x02];
const STAIRS: BeaconAddress = [0xC8, 0x2B, 0x96, 0x00, 0x00, 0x03];
const ATRIUM: BeaconAddress = [0xC8, 0x2B, 0x96, 0x00, 0x00, 0x04];

/// Calibrated RSSI at one meter, dBm
const TX_POWER: f32 = -59.0;

fn main() {
    println!("Wayfarer Beacon Triangulation Example");
    println!("=====================================\n");

    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());

    let survey = [
        (ENTRANCE, "entrance", 0.0, 0.0),
        (CAFE, "cafe", 8.0, 0.0),
        (STAIRS, "stairs", 0.0, 8.0),
        (ATRIUM, "atrium", 8.0, 8.0),
    ];

    println!("Surveyed beacons:");
    for (address, name, x, y) in &survey {
        registry
            .register(*address, Some(*name), *x, *y, TX_POWER)
            .unwrap();
        println!("  {:8} at ({:.1}, {:.1})", name, x, y);
    }

    // A receiver standing at (3.0, 4.0) hears all four beacons. Each
    // advertisement carries a couple of dB of noise; the registry's
    // low-pass filter settles the distance estimates over a few rounds.
    let true_position = (3.0f32, 4.0f32);
    println!("\nTrue receiver position: ({:.1}, {:.1})", true_position.0, true_position.1);
    println!("\nObservation rounds (estimated distance per beacon, meters):\n");
    println!("Round | entrance |   cafe | stairs | atrium");
    println!("------|----------|--------|--------|-------");

    let mut now = 0;
    for round in 0..12 {
        now += 200;
        let mut distances = [0.0f32; 4];
        for (slot, (address, _, x, y)) in survey.iter().enumerate() {
            let true_distance = euclidean(true_position, (*x, *y));
            let rssi = noisy_rssi(true_distance, round * 4 + slot as i32);
            distances[slot] = registry.observe(address, rssi, now).unwrap();
        }
        println!(
            "{:5} | {:8.2} | {:6.2} | {:6.2} | {:6.2}",
            round + 1,
            distances[0],
            distances[1],
            distances[2],
            distances[3]
        );
    }

    println!(
        "\nTrue distances:       {:.2} |   {:.2} |   {:.2} |   {:.2}",
        euclidean(true_position, (0.0, 0.0)),
        euclidean(true_position, (8.0, 0.0)),
        euclidean(true_position, (0.0, 8.0)),
        euclidean(true_position, (8.0, 8.0)),
    );

    // Solve for position from the settled ranges
    let triangulator = BeaconTriangulator::default();
    registry.sweep(now);
    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    let fix = triangulator.triangulate(&beacons, now);

    println!("\nFour-beacon fix:");
    println!("  Position:   ({:.2}, {:.2})", fix.x, fix.y);
    println!(
        "  Error:      {:.2} m from truth",
        euclidean((fix.x, fix.y), true_position)
    );
    println!("  Accuracy:   {:.2} m RMSE", fix.accuracy);
    println!("  Confidence: {:.2}", fix.confidence.as_float());

    // The cafe beacon dies. Five seconds without an advertisement marks
    // it stale and the solver carries on with three.
    println!("\n{}", "=".repeat(60));
    println!("Losing a beacon:\n");

    for round in 0..10 {
        now += 200;
        for (slot, (address, _, x, y)) in survey.iter().enumerate() {
            if *address == CAFE {
                continue;
            }
            let true_distance = euclidean(true_position, (*x, *y));
            let rssi = noisy_rssi(true_distance, 100 + round * 4 + slot as i32);
            registry.observe(address, rssi, now).unwrap();
        }
    }
    now += 4000;
    registry.sweep(now);

    let beacons: Vec<Beacon> = registry.usable().cloned().collect();
    println!("Usable beacons after sweep: {}", beacons.len());

    let fix = triangulator.triangulate(&beacons, now);
    println!("Three-beacon fix:");
    println!("  Position:   ({:.2}, {:.2})", fix.x, fix.y);
    println!("  Confidence: {:.2}  (fewer beacons, lower confidence)", fix.confidence.as_float());

    // Advertisements from unknown hardware are rejected, not ranged
    println!("\n{}", "=".repeat(60));
    println!("Error handling:\n");

    let stranger: BeaconAddress = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x05];
    match registry.observe(&stranger, -70.0, now) {
        Ok(_) => println!("unexpected"),
        Err(e) => println!("  Unknown advertiser: {}", e),
    }

    let mut tiny: BeaconRegistry<2> = BeaconRegistry::new(RangingConfig::default());
    tiny.register([0; 6], None, 0.0, 0.0, TX_POWER).unwrap();
    tiny.register([1; 6], None, 1.0, 0.0, TX_POWER).unwrap();
    match tiny.register([2; 6], None, 2.0, 0.0, TX_POWER) {
        Ok(()) => println!("unexpected"),
        Err(e) => println!("  Survey overflow:    {}", e),
    }

    println!("\n{}", "=".repeat(60));
    println!("Key Insights:");
    println!("- Distance comes from filtered RSSI, never a single packet");
    println!("- Four good ranges pin the fix to within a meter or so");
    println!("- Stale beacons drop out instead of dragging the fix");
    println!("- Confidence reflects beacon count and residual error");
}

fn euclidean(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// RSSI a receiver would hear at this distance, plus ±2 dB of noise
fn noisy_rssi(distance: f32, seed: i32) -> f32 {
    let ideal = TX_POWER - 20.0 * distance.log10();
    let noise = (((seed * 12345 + 6789) % 1000) as f32 / 1000.0 - 0.5) * 4.0;
    ideal + noise
}
