// drift_sim/src/simulation/sensors/mod.rs

use crate::simulation::config::SensorsConfig;
use drift_core::error::{DriftError, Result};
use drift_core::messages::{MeasurementMessage, SensorKind};
use drift_core::types::VehicleState;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

pub mod imu;
pub mod latency;
pub mod odometry;
pub mod velocity;

use imu::ImuSensor;
use odometry::OdometrySensor;
use velocity::VelocitySensor;

/// Turns the true vehicle state into one (possibly delayed, possibly noisy) reading.
pub trait Sensor: Send + Sync {
    fn kind(&self) -> SensorKind;

    /// Produces this step's message. `timestamp` and `step` describe when the reading
    /// was generated; a delayed sensor may return an older message.
    fn sense(
        &mut self,
        truth: &VehicleState,
        timestamp: f64,
        step: u64,
        rng: &mut dyn RngCore,
    ) -> MeasurementMessage;

    /// Per-channel standard deviations; all zero for a perfect sensor.
    fn noise_stddev(&self) -> Vec<f64>;
}

// =========================================================================
// == Noise ==
// =========================================================================

/// Additive noise, chosen once when the sensor is built.
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// Readings are the true values and no random numbers are drawn.
    Perfect { channels: usize },
    /// Independent zero-mean Gaussian noise per channel.
    Gaussian(Vec<Normal<f64>>),
}

impl NoiseModel {
    pub fn new(noisy: bool, stddevs: &[f64]) -> Result<Self> {
        if !noisy {
            return Ok(NoiseModel::Perfect {
                channels: stddevs.len(),
            });
        }
        stddevs
            .iter()
            .map(|s| {
                Normal::new(0.0, *s).map_err(|e| {
                    DriftError::InvalidConfig(format!("noise stddev {s} rejected: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(NoiseModel::Gaussian)
    }

    /// Adds one draw per channel, in channel order.
    pub fn apply(&self, values: &mut [f64], rng: &mut dyn RngCore) {
        if let NoiseModel::Gaussian(dists) = self {
            for (value, dist) in values.iter_mut().zip(dists) {
                *value += dist.sample(rng);
            }
        }
    }

    pub fn stddevs(&self) -> Vec<f64> {
        match self {
            NoiseModel::Perfect { channels } => vec![0.0; *channels],
            NoiseModel::Gaussian(dists) => dists.iter().map(|d| d.std_dev()).collect(),
        }
    }

    pub fn is_perfect(&self) -> bool {
        matches!(self, NoiseModel::Perfect { .. })
    }
}

// =========================================================================
// == Sensor Suite ==
// =========================================================================

/// The three sensors of the car, polled in a fixed order.
pub struct SensorSuite {
    pub imu: ImuSensor,
    pub velocity: VelocitySensor,
    pub odometry: OdometrySensor,
}

impl SensorSuite {
    pub fn new(config: &SensorsConfig, noisy: bool, latency: bool) -> Result<Self> {
        Ok(Self {
            imu: ImuSensor::new(&config.imu, noisy, latency)?,
            velocity: VelocitySensor::new(&config.velocity, noisy, latency)?,
            odometry: OdometrySensor::new(&config.odometry, noisy, latency)?,
        })
    }

    /// One message per sensor: IMU, velocity, odometry.
    pub fn sense_all(
        &mut self,
        truth: &VehicleState,
        timestamp: f64,
        step: u64,
        rng: &mut dyn RngCore,
    ) -> Vec<MeasurementMessage> {
        vec![
            self.imu.sense(truth, timestamp, step, rng),
            self.velocity.sense(truth, timestamp, step, rng),
            self.odometry.sense(truth, timestamp, step, rng),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::prng::SimulationRng;
    use rand::Rng;

    fn moving_state() -> VehicleState {
        VehicleState {
            x: 1.0,
            y: 2.0,
            theta: 0.4,
            velocity: 1.5,
            lateral_velocity: -0.2,
            angular_velocity: 0.7,
            longitudinal_acceleration: 0.5,
            lateral_acceleration: 1.1,
            ..Default::default()
        }
    }

    #[test]
    fn perfect_sensors_draw_no_random_numbers() {
        let mut suite = SensorSuite::new(&SensorsConfig::default(), false, false).unwrap();
        let mut rng = SimulationRng::from_seed(1);
        let mut reference = SimulationRng::from_seed(1);
        let batch = suite.sense_all(&moving_state(), 0.05, 1, rng.as_dyn());
        assert!(batch.iter().all(|m| m.is_perfect()));
        assert_eq!(rng.0.gen::<u64>(), reference.0.gen::<u64>());
    }

    #[test]
    fn suite_order_is_fixed() {
        let mut suite = SensorSuite::new(&SensorsConfig::default(), true, true).unwrap();
        let mut rng = SimulationRng::from_seed(1);
        let kinds: Vec<_> = suite
            .sense_all(&moving_state(), 0.05, 1, rng.as_dyn())
            .iter()
            .map(|m| m.sensor)
            .collect();
        assert_eq!(
            kinds,
            vec![SensorKind::Imu, SensorKind::Velocity, SensorKind::Odometry]
        );
    }

    #[test]
    fn noisy_readings_scatter_around_truth() {
        let noise = NoiseModel::new(true, &[0.1]).unwrap();
        let mut rng = SimulationRng::from_seed(5);
        let n = 4000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let mut v = [2.0];
            noise.apply(&mut v, rng.as_dyn());
            sum += v[0];
            sum_sq += v[0] * v[0];
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!((mean - 2.0).abs() < 0.01);
        assert!((var.sqrt() - 0.1).abs() < 0.01);
    }

    #[test]
    fn negative_stddev_is_a_config_error() {
        assert!(matches!(
            NoiseModel::new(true, &[-1.0]),
            Err(DriftError::InvalidConfig(_))
        ));
        // Perfect sensors never look at the values.
        assert!(NoiseModel::new(false, &[-1.0]).unwrap().is_perfect());
    }
}
