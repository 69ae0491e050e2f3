// drift_sim/src/simulation/sensors/imu.rs

use super::latency::LatencyBuffer;
use super::{NoiseModel, Sensor};
use crate::simulation::config::ImuConfig;
use drift_core::error::Result;
use drift_core::messages::{MeasurementData, MeasurementMessage, SensorKind};
use drift_core::types::VehicleState;
use rand::RngCore;

/// Planar IMU: body-frame longitudinal and lateral acceleration plus the yaw rate.
#[derive(Debug, Clone)]
pub struct ImuSensor {
    noise: NoiseModel,
    buffer: LatencyBuffer,
}

impl ImuSensor {
    pub fn new(config: &ImuConfig, noisy: bool, latency: bool) -> Result<Self> {
        let stddevs = [
            config.accel_noise_stddev,
            config.accel_noise_stddev,
            config.gyro_noise_stddev,
        ];
        Ok(Self {
            noise: NoiseModel::new(noisy, &stddevs)?,
            buffer: LatencyBuffer::new(if latency { config.latency_steps } else { 0 }),
        })
    }
}

impl Sensor for ImuSensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Imu
    }

    fn sense(
        &mut self,
        truth: &VehicleState,
        timestamp: f64,
        step: u64,
        rng: &mut dyn RngCore,
    ) -> MeasurementMessage {
        let mut z = [
            truth.longitudinal_acceleration,
            truth.lateral_acceleration,
            truth.angular_velocity,
        ];
        self.noise.apply(&mut z, rng);

        let message = MeasurementMessage {
            sensor: SensorKind::Imu,
            timestamp,
            step,
            data: MeasurementData::Imu {
                longitudinal_accel: z[0],
                lateral_accel: z[1],
                yaw_rate: z[2],
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

    #[test]
    fn perfect_imu_reports_truth() {
        let mut imu = ImuSensor::new(&ImuConfig::default(), false, false).unwrap();
        let truth = VehicleState {
            angular_velocity: 0.8,
            longitudinal_acceleration: -1.0,
            lateral_acceleration: 2.0,
            ..Default::default()
        };
        let msg = imu.sense(&truth, 0.1, 2, SimulationRng::from_seed(0).as_dyn());
        assert_eq!(
            msg.data,
            MeasurementData::Imu {
                longitudinal_accel: -1.0,
                lateral_accel: 2.0,
                yaw_rate: 0.8,
            }
        );
        assert_eq!(msg.noise_stddev, vec![0.0; 3]);
    }

    #[test]
    fn noisy_imu_carries_its_noise_parameters() {
        let mut imu = ImuSensor::new(&ImuConfig::default(), true, false).unwrap();
        let msg = imu.sense(&VehicleState::default(), 0.1, 2, SimulationRng::from_seed(0).as_dyn());
        assert_eq!(msg.noise_stddev, vec![0.3, 0.3, 0.05]);
        assert_ne!(msg.data.channels(), nalgebra::DVector::zeros(3));
    }
}
