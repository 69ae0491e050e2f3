// drift_sim/src/simulation/estimation.rs

use crate::simulation::config::{EstimatorConfig, SensorsConfig};
use drift_core::error::Result;
use drift_core::estimation::filters::ekf::ExtendedKalmanFilter;
use drift_core::estimation::state::FilterState;
use drift_core::estimation::{EstimateState, StateEstimator};
use drift_core::messages::MeasurementMessage;
use drift_core::models::dynamics::f110::VehicleParams;
use drift_core::models::estimation::dynamics::actuator::FirstOrderActuatorModel;
use drift_core::models::estimation::dynamics::EstimationDynamics;
use drift_core::models::estimation::measurement::imu::ImuModel;
use drift_core::models::estimation::measurement::odometry::OdometryModel;
use drift_core::models::estimation::measurement::velocity::VelocityModel;
use drift_core::models::estimation::measurement::MeasurementModel;
use drift_core::types::{ControlCommand, VehicleState};
use nalgebra::{DMatrix, DVector};

/// Where the control-loop state comes from, chosen once per environment.
pub enum StateEstimation {
    /// Ground truth with zero uncertainty.
    Perfect,
    /// EKF over noisy sensor readings.
    Filtered(Box<ExtendedKalmanFilter>),
}

impl StateEstimation {
    pub fn perfect() -> Self {
        StateEstimation::Perfect
    }

    /// An EKF whose models mirror the configured sensors and vehicle lags.
    pub fn filtered(
        estimator: &EstimatorConfig,
        sensors: &SensorsConfig,
        vehicle: &VehicleParams,
    ) -> Result<Self> {
        let dynamics = FirstOrderActuatorModel {
            velocity_time_constant: vehicle.velocity_time_constant,
            yaw_rate_time_constant: vehicle.yaw_rate_time_constant,
        };
        let initial_state =
            FilterState::new(dynamics.get_state_layout(), estimator.initial_variance, 0.0);
        let q = DMatrix::from_diagonal(&DVector::from_row_slice(&estimator.process_noise));

        let odom = sensors.odometry.noise_stddev;
        let models: Vec<Box<dyn MeasurementModel>> = vec![
            Box::new(ImuModel::new(
                sensors.imu.accel_noise_stddev,
                sensors.imu.gyro_noise_stddev,
                vehicle.velocity_time_constant,
            )),
            Box::new(VelocityModel::new(sensors.velocity.noise_stddev)),
            Box::new(
                OdometryModel::new(odom[0], odom[2]).with_actuator_lags(
                    vehicle.velocity_time_constant,
                    vehicle.yaw_rate_time_constant,
                ),
            ),
        ];

        let ekf = ExtendedKalmanFilter::new(initial_state, q, Box::new(dynamics), models)?;
        Ok(StateEstimation::Filtered(Box::new(ekf)))
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, StateEstimation::Filtered(_))
    }

    /// Runs one estimation cycle: predict under the applied command, then fuse the batch.
    pub fn step(
        &mut self,
        dt: f64,
        control: &ControlCommand,
        truth: &VehicleState,
        timestamp: f64,
        measurements: &[MeasurementMessage],
    ) -> EstimateState {
        match self {
            StateEstimation::Perfect => Self::from_truth(truth, timestamp),
            StateEstimation::Filtered(ekf) => {
                ekf.predict(dt, control);
                ekf.update(measurements)
            }
        }
    }

    /// The estimate before the first step.
    pub fn initial(&self, truth: &VehicleState) -> EstimateState {
        match self {
            StateEstimation::Perfect => Self::from_truth(truth, 0.0),
            StateEstimation::Filtered(ekf) => ekf.estimate(),
        }
    }

    fn from_truth(truth: &VehicleState, timestamp: f64) -> EstimateState {
        EstimateState {
            timestamp,
            velocity: truth.velocity,
            angular_velocity: truth.angular_velocity,
            velocity_std: 0.0,
            angular_velocity_std: 0.0,
            fallback_used: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::prng::SimulationRng;
    use crate::simulation::sensors::SensorSuite;
    use drift_core::models::dynamics::vehicle::F110Vehicle;

    #[test]
    fn perfect_estimate_is_the_truth() {
        let mut estimation = StateEstimation::perfect();
        let truth = VehicleState {
            velocity: 1.7,
            angular_velocity: -0.4,
            ..Default::default()
        };
        let est = estimation.step(0.05, &ControlCommand::new(2.0, 0.0), &truth, 0.05, &[]);
        assert_eq!(est.velocity, 1.7);
        assert_eq!(est.angular_velocity, -0.4);
        assert_eq!(est.velocity_std, 0.0);
        assert_eq!(est.angular_velocity_std, 0.0);
        assert!(!estimation.is_filtered());
    }

    #[test]
    fn filtered_estimate_starts_at_rest_with_configured_uncertainty() {
        let estimation = StateEstimation::filtered(
            &EstimatorConfig::default(),
            &SensorsConfig::default(),
            &VehicleParams::default(),
        )
        .unwrap();
        let est = estimation.initial(&VehicleState::default());
        assert_eq!(est.velocity, 0.0);
        assert!((est.velocity_std - 0.1).abs() < 1e-12);
        assert!(estimation.is_filtered());
    }

    #[test]
    fn noisy_step_response_is_consistent_with_reported_uncertainty() {
        let params = VehicleParams::default();
        let sensors = SensorsConfig::default();
        let command = ControlCommand::new(params.max_velocity, 0.0);
        let runs = 200;
        let steps = 10;
        let mut error_sum = vec![0.0; steps];
        let mut error_sq_sum = vec![0.0; steps];
        let mut std_sum = vec![0.0; steps];

        for seed in 0..runs {
            let mut rng = SimulationRng::from_seed(seed);
            let mut car = F110Vehicle::new(params).unwrap();
            car.reset(0.0, 0.0, 0.0).unwrap();
            let mut suite = SensorSuite::new(&sensors, true, false).unwrap();
            let mut estimation =
                StateEstimation::filtered(&EstimatorConfig::default(), &sensors, &params).unwrap();

            for k in 0..steps {
                let truth = car.step(command.velocity, command.angular_velocity).unwrap();
                let t = car.time();
                let batch = suite.sense_all(&truth, t, k as u64 + 1, rng.as_dyn());
                let est = estimation.step(params.dt, &command, &truth, t, &batch);
                let error = est.velocity - truth.velocity;
                error_sum[k] += error;
                error_sq_sum[k] += error * error;
                std_sum[k] += est.velocity_std;
            }
        }

        let n = runs as f64;
        for k in 0..steps {
            let bias = error_sum[k] / n;
            let rms = (error_sq_sum[k] / n).sqrt();
            let std = std_sum[k] / n;
            assert!(bias.abs() < 0.5 * std, "step {}: bias {bias:.4} vs std {std:.4}", k + 1);
            assert!(rms < 2.0 * std, "step {}: rms {rms:.4} vs std {std:.4}", k + 1);
        }
    }
}
