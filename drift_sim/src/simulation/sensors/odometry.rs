// drift_sim/src/simulation/sensors/odometry.rs

use super::latency::LatencyBuffer;
use super::{NoiseModel, Sensor};
use crate::simulation::config::OdometryConfig;
use drift_core::error::Result;
use drift_core::messages::{MeasurementData, MeasurementMessage, SensorKind};
use drift_core::types::VehicleState;
use drift_core::utils::angles::angle_diff;
use rand::RngCore;

/// Pose change since the previous reading, in the body frame of the previous pose.
#[derive(Debug, Clone)]
pub struct OdometrySensor {
    noise: NoiseModel,
    buffer: LatencyBuffer,
    /// `(x, y, theta, timestamp)` of the previous reading.
    previous: Option<(f64, f64, f64, f64)>,
}

impl OdometrySensor {
    pub fn new(config: &OdometryConfig, noisy: bool, latency: bool) -> Result<Self> {
        Ok(Self {
            noise: NoiseModel::new(noisy, &config.noise_stddev)?,
            buffer: LatencyBuffer::new(if latency { config.latency_steps } else { 0 }),
            previous: None,
        })
    }
}

impl Sensor for OdometrySensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Odometry
    }

    fn sense(
        &mut self,
        truth: &VehicleState,
        timestamp: f64,
        step: u64,
        rng: &mut dyn RngCore,
    ) -> MeasurementMessage {
        let (mut delta, dt) = match self.previous {
            Some((px, py, ptheta, pt)) => {
                let (sin, cos) = ptheta.sin_cos();
                let (wx, wy) = (truth.x - px, truth.y - py);
                (
                    [
                        cos * wx + sin * wy,
                        -sin * wx + cos * wy,
                        angle_diff(truth.theta, ptheta),
                    ],
                    timestamp - pt,
                )
            }
            None => ([0.0; 3], 0.0),
        };
        self.previous = Some((truth.x, truth.y, truth.theta, timestamp));
        self.noise.apply(&mut delta, rng);

        let message = MeasurementMessage {
            sensor: SensorKind::Odometry,
            timestamp,
            step,
            data: MeasurementData::Odometry {
                dx: delta[0],
                dy: delta[1],
                dtheta: delta[2],
                dt,
            },
            noise_stddev: self.noise.stddevs(),
        };
        self.buffer.push(message)
    }

    fn noise_stddev(&self) -> Vec<f64> {
        self.noise.stddevs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::prng::SimulationRng;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn deltas_are_in_the_previous_body_frame() {
        let mut sensor = OdometrySensor::new(&OdometryConfig::default(), false, false).unwrap();
        let mut rng = SimulationRng::from_seed(0);

        let first = sensor.sense(&VehicleState::at_pose(1.0, 1.0, FRAC_PI_2), 0.0, 0, rng.as_dyn());
        assert_eq!(
            first.data,
            MeasurementData::Odometry {
                dx: 0.0,
                dy: 0.0,
                dtheta: 0.0,
                dt: 0.0
            }
        );

        // Facing +y and moving +y is straight ahead.
        let msg = sensor.sense(&VehicleState::at_pose(1.0, 1.5, FRAC_PI_2 + 0.1), 0.05, 1, rng.as_dyn());
        match msg.data {
            MeasurementData::Odometry { dx, dy, dtheta, dt } => {
                assert_abs_diff_eq!(dx, 0.5, epsilon = 1e-12);
                assert_abs_diff_eq!(dy, 0.0, epsilon = 1e-12);
                assert_abs_diff_eq!(dtheta, 0.1, epsilon = 1e-12);
                assert_abs_diff_eq!(dt, 0.05, epsilon = 1e-12);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn heading_delta_is_wrapped() {
        let mut sensor = OdometrySensor::new(&OdometryConfig::default(), false, false).unwrap();
        let mut rng = SimulationRng::from_seed(0);
        sensor.sense(&VehicleState::at_pose(0.0, 0.0, 3.1), 0.0, 0, rng.as_dyn());
        let msg = sensor.sense(&VehicleState::at_pose(0.0, 0.0, -3.1), 0.05, 1, rng.as_dyn());
        match msg.data {
            MeasurementData::Odometry { dtheta, .. } => {
                assert_abs_diff_eq!(dtheta, 2.0 * std::f64::consts::PI - 6.2, epsilon = 1e-9)
            }
            other => panic!("unexpected data {other:?}"),
        }
    }
}
