// drift_sim/examples/02_drift_maneuver.rs
//
// Holds a hard turn at full speed and compares the slip model against a car
// that always grips.
//
//   cargo run -p drift_sim --example 02_drift_maneuver

use drift_sim::prelude::*;

const STEPS: usize = 50;

fn run(params: VehicleParams) -> Result<Vec<VehicleState>> {
    let mut vehicle = F110Vehicle::new(params)?;
    (0..STEPS).map(|_| vehicle.step(3.0, 2.0)).collect()
}

fn main() -> Result<()> {
    init_logging();

    let sliding = run(VehicleParams::default())?;
    let gripping = run(VehicleParams {
        enable_slip: false,
        ..Default::default()
    })?;

    for (step, (s, g)) in sliding.iter().zip(&gripping).enumerate().step_by(5) {
        tracing::info!(
            step,
            slip_deg = s.slip_angle().to_degrees(),
            lateral_velocity = s.lateral_velocity,
            yaw_rate = s.angular_velocity,
            grip_yaw_rate = g.angular_velocity,
            separation = (s.position() - g.position()).norm(),
            "drift"
        );
    }

    if let (Some(s), Some(g)) = (sliding.last(), gripping.last()) {
        tracing::info!(
            final_slip_deg = s.slip_angle().to_degrees(),
            separation = (s.position() - g.position()).norm(),
            "maneuver complete"
        );
    }
    Ok(())
}
