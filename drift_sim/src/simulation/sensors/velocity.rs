// drift_sim/src/simulation/sensors/velocity.rs

use super::latency::LatencyBuffer;
use super::{NoiseModel, Sensor};
use crate::simulation::config::VelocitySensorConfig;
use drift_core::error::Result;
use drift_core::messages::{MeasurementData, MeasurementMessage, SensorKind};
use drift_core::types::VehicleState;
use rand::RngCore;

/// Signed planar speed, negative when reversing.
#[derive(Debug, Clone)]
pub struct VelocitySensor {
    noise: NoiseModel,
    buffer: LatencyBuffer,
}

impl VelocitySensor {
    pub fn new(config: &VelocitySensorConfig, noisy: bool, latency: bool) -> Result<Self> {
        Ok(Self {
            noise: NoiseModel::new(noisy, &[config.noise_stddev])?,
            buffer: LatencyBuffer::new(if latency { config.latency_steps } else { 0 }),
        })
    }
}

impl Sensor for VelocitySensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Velocity
    }

    fn sense(
        &mut self,
        truth: &VehicleState,
        timestamp: f64,
        step: u64,
        rng: &mut dyn RngCore,
    ) -> MeasurementMessage {
        let mut z = [truth.velocity.signum() * truth.speed()];
        self.noise.apply(&mut z, rng);

        let message = MeasurementMessage {
            sensor: SensorKind::Velocity,
            timestamp,
            step,
            data: MeasurementData::Velocity { speed: z[0] },
            noise_stddev: self.noise.stddevs(),
        };
        self.buffer.push(message)
    }

    fn noise_stddev(&self) -> Vec<f64> {
        self.noise.stddevs()
    }
}
