// drift_core/src/estimation/filters/ekf.rs

use std::collections::HashMap;

use crate::error::{DriftError, Result};
use crate::estimation::state::{FilterState, StateVariable};
use crate::estimation::{EstimateState, FilterContext, StateEstimator};
use crate::messages::{MeasurementMessage, SensorKind};
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::models::estimation::measurement::MeasurementModel;
use crate::types::ControlCommand;
use crate::utils::integrators::RK4;
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Extended Kalman filter over the car's velocity and yaw rate.
pub struct ExtendedKalmanFilter {
    /// The current state of the filter (x, P, t).
    state: FilterState,
    /// The process noise covariance matrix (Q), modeling uncertainty in the dynamics.
    process_noise_q: DMatrix<f64>,

    dynamics: Box<dyn EstimationDynamics>,

    // One model per sensor; messages from sensors without a model are ignored.
    measurement_models: HashMap<SensorKind, Box<dyn MeasurementModel>>,

    /// Timestamp of the last fused message per sensor. Delayed sensors repeat their
    /// oldest buffered reading, and a repeat must not be fused twice.
    last_fused: HashMap<SensorKind, f64>,
    context: FilterContext,
    fallback_used: bool,
}

impl ExtendedKalmanFilter {
    pub fn new(
        initial_state: FilterState,
        process_noise_q: DMatrix<f64>,
        dynamics: Box<dyn EstimationDynamics>,
        measurement_models: Vec<Box<dyn MeasurementModel>>,
    ) -> Result<Self> {
        let dim = initial_state.dim();
        if process_noise_q.nrows() != dim || process_noise_q.ncols() != dim {
            return Err(DriftError::InvalidConfig(format!(
                "process noise must be {dim}x{dim}, got {}x{}",
                process_noise_q.nrows(),
                process_noise_q.ncols()
            )));
        }
        if dynamics.get_state_layout() != initial_state.layout {
            return Err(DriftError::InvalidConfig(
                "dynamics layout does not match the filter state".to_string(),
            ));
        }

        let measurement_models = measurement_models
            .into_iter()
            .map(|m| (m.sensor(), m))
            .collect();

        Ok(Self {
            state: initial_state,
            process_noise_q,
            dynamics,
            measurement_models,
            last_fused: HashMap::new(),
            context: FilterContext::default(),
            fallback_used: false,
        })
    }

    pub fn get_state(&self) -> &FilterState {
        &self.state
    }

    /// Fuses one message. On failure the state is left exactly as it was.
    fn correct(&mut self, message: &MeasurementMessage) -> Result<()> {
        let model = match self.measurement_models.get(&message.sensor) {
            Some(m) => m,
            None => return Ok(()),
        };
        let z = match model.measurement_vector(message) {
            Some(z) => z,
            None => return Ok(()),
        };

        // --- Standard EKF Update Equations ---
        let z_pred = model.predict_measurement(&self.state, &self.context);
        let h_jac = model.calculate_jacobian(&self.state, &self.context);
        let r_mat = model.get_r(message);

        let p = &self.state.covariance;
        let y = z - z_pred;
        let s = &h_jac * p * h_jac.transpose() + &r_mat;

        let s_inv = s.try_inverse().ok_or_else(|| DriftError::EstimationSingularity {
            sensor: message.sensor.to_string(),
            details: "innovation covariance is not invertible".to_string(),
        })?;
        let k_gain = p * h_jac.transpose() * s_inv;

        let x_new = &self.state.vector + &k_gain * y;

        // Joseph form keeps P positive semi-definite under round-off.
        let dim = self.state.dim();
        let i_kh = DMatrix::<f64>::identity(dim, dim) - &k_gain * &h_jac;
        let p_new = &i_kh * p * i_kh.transpose() + &k_gain * &r_mat * k_gain.transpose();
        let p_new = (&p_new + p_new.transpose()) * 0.5;

        if x_new.iter().chain(p_new.iter()).any(|v| !v.is_finite()) {
            return Err(DriftError::EstimationSingularity {
                sensor: message.sensor.to_string(),
                details: "correction produced a non-finite estimate".to_string(),
            });
        }

        self.state.vector = x_new;
        self.state.covariance = p_new;
        Ok(())
    }
}

impl StateEstimator for ExtendedKalmanFilter {
    fn predict(&mut self, dt: f64, control: &ControlCommand) {
        self.context.control = *control;
        self.context.dt = dt.max(0.0);
        if dt <= 0.0 {
            return;
        }

        let x = &self.state.vector;
        let p = &self.state.covariance;
        let u = control.as_control();

        // 1. Predict the state vector using the dynamics model and an integrator.
        let x_pred = self.dynamics.propagate(x, &u, dt, &RK4);

        // 2. Linearize and discretize: F = I + A dt.
        let (a_jac, _b_jac) = self.dynamics.calculate_jacobian(x, &u);
        let dim = self.state.dim();
        let f_jac = DMatrix::<f64>::identity(dim, dim) + a_jac * dt;

        // 3. P = F P F^T + Q dt
        let p_pred = &f_jac * p * f_jac.transpose() + &self.process_noise_q * dt;

        self.state.vector = x_pred;
        self.state.covariance = p_pred;
        self.state.last_update_timestamp += dt;
    }

    fn update(&mut self, measurements: &[MeasurementMessage]) -> EstimateState {
        self.fallback_used = false;

        for message in measurements {
            if let Some(last) = self.last_fused.get(&message.sensor) {
                if message.timestamp <= *last {
                    debug!(
                        sensor = %message.sensor,
                        timestamp = message.timestamp,
                        "skipping stale measurement"
                    );
                    continue;
                }
            }

            match self.correct(message) {
                Ok(()) => {
                    self.last_fused.insert(message.sensor, message.timestamp);
                }
                Err(err) => {
                    warn!(error = %err, "EKF correction discarded, keeping prior estimate");
                    self.fallback_used = true;
                }
            }
        }

        self.estimate()
    }

    fn estimate(&self) -> EstimateState {
        EstimateState {
            timestamp: self.state.last_update_timestamp,
            velocity: self.state.get(StateVariable::Velocity),
            angular_velocity: self.state.get(StateVariable::YawRate),
            velocity_std: self.state.std_dev(StateVariable::Velocity),
            angular_velocity_std: self.state.std_dev(StateVariable::YawRate),
            fallback_used: self.fallback_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MeasurementData;
    use crate::models::estimation::dynamics::actuator::FirstOrderActuatorModel;
    use crate::models::estimation::measurement::imu::ImuModel;
    use crate::models::estimation::measurement::odometry::OdometryModel;
    use crate::models::estimation::measurement::velocity::VelocityModel;
    use crate::models::dynamics::f110::VehicleParams;
    use crate::models::dynamics::vehicle::F110Vehicle;
    use crate::types::VehicleState;
    use crate::utils::angles::wrap_angle;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    const DT: f64 = 0.05;

    fn filter(
        initial_variance: f64,
        models: Vec<Box<dyn MeasurementModel>>,
    ) -> ExtendedKalmanFilter {
        let layout = vec![StateVariable::Velocity, StateVariable::YawRate];
        ExtendedKalmanFilter::new(
            FilterState::new(layout, initial_variance, 0.0),
            DMatrix::identity(2, 2) * 0.5,
            Box::new(FirstOrderActuatorModel {
                velocity_time_constant: 0.2,
                yaw_rate_time_constant: 0.1,
            }),
            models,
        )
        .unwrap()
    }

    fn speed(step: u64, speed: f64) -> MeasurementMessage {
        MeasurementMessage {
            sensor: SensorKind::Velocity,
            timestamp: step as f64 * DT,
            step,
            data: MeasurementData::Velocity { speed },
            noise_stddev: vec![0.1],
        }
    }

    fn odometry(step: u64, v: f64, w: f64) -> MeasurementMessage {
        MeasurementMessage {
            sensor: SensorKind::Odometry,
            timestamp: step as f64 * DT,
            step,
            data: MeasurementData::Odometry {
                dx: v * DT,
                dy: 0.0,
                dtheta: w * DT,
                dt: DT,
            },
            noise_stddev: vec![0.02, 0.02, 0.01],
        }
    }

    #[test]
    fn consecutive_corrections_reduce_uncertainty() {
        let mut ekf = filter(
            1.0,
            vec![
                Box::new(VelocityModel::new(0.1)),
                Box::new(OdometryModel::new(0.02, 0.01)),
            ],
        );
        let mut last_v_std = ekf.estimate().velocity_std;
        let mut last_w_std = ekf.estimate().angular_velocity_std;
        // Same timestamp, several consistent readings from different sensors.
        for (i, msg) in [speed(1, 0.0), odometry(1, 0.0, 0.0)].iter().enumerate() {
            let est = ekf.update(std::slice::from_ref(msg));
            assert!(est.velocity_std <= last_v_std + 1e-12, "correction {i} raised std");
            assert!(est.angular_velocity_std <= last_w_std + 1e-12);
            assert!(est.velocity_std >= 0.0);
            last_v_std = est.velocity_std;
            last_w_std = est.angular_velocity_std;
        }
        assert!(last_v_std < 0.2);
    }

    #[test]
    fn uncertainty_trends_down_then_settles_under_consistent_readings() {
        let mut ekf = filter(1.0, vec![Box::new(VelocityModel::new(0.1))]);
        let control = ControlCommand::new(1.0, 0.0);
        let mut stds = Vec::new();
        let mut truth = 0.0;
        for step in 1..=40 {
            ekf.predict(DT, &control);
            truth += (1.0 - truth) * (1.0 - (-DT / 0.2_f64).exp());
            let est = ekf.update(&[speed(step, truth)]);
            stds.push(est.velocity_std);
        }
        assert!(stds[39] < stds[0]);
        assert!(stds.iter().all(|s| *s >= 0.0 && s.is_finite()));
        assert_abs_diff_eq!(ekf.estimate().velocity, truth, epsilon = 0.05);
    }

    #[test]
    fn prediction_only_steps_increase_uncertainty() {
        let mut ekf = filter(0.01, vec![Box::new(VelocityModel::new(0.1))]);
        let control = ControlCommand::new(0.5, 0.2);
        let mut last = ekf.estimate();
        for _ in 0..10 {
            ekf.predict(DT, &control);
            let est = ekf.update(&[]);
            assert!(est.velocity_std > last.velocity_std);
            assert!(est.angular_velocity_std > last.angular_velocity_std);
            last = est;
        }
    }

    #[test]
    fn stale_messages_are_skipped() {
        let mut ekf = filter(1.0, vec![Box::new(VelocityModel::new(0.1))]);
        ekf.update(&[speed(3, 1.0)]);
        let after_first = ekf.get_state().clone();
        // A latency buffer repeating the same reading.
        ekf.update(&[speed(3, 1.0)]);
        assert_eq!(ekf.get_state().vector, after_first.vector);
        assert_eq!(ekf.get_state().covariance, after_first.covariance);
        // An older one as well.
        ekf.update(&[speed(2, 5.0)]);
        assert_eq!(ekf.get_state().vector, after_first.vector);
    }

    #[test]
    fn non_finite_reading_falls_back_to_prior() {
        let mut ekf = filter(1.0, vec![Box::new(VelocityModel::new(0.1))]);
        ekf.predict(DT, &ControlCommand::new(1.0, 0.0));
        let prior = ekf.get_state().clone();
        let est = ekf.update(&[speed(1, f64::NAN)]);
        assert!(est.fallback_used);
        assert!(est.velocity.is_finite());
        assert_eq!(ekf.get_state().vector, prior.vector);
        assert_eq!(ekf.get_state().covariance, prior.covariance);

        // The flag is per update.
        let est = ekf.update(&[speed(2, 1.0)]);
        assert!(!est.fallback_used);
    }

    /// A sensor with no noise at all.
    #[derive(Debug, Clone)]
    struct ExactSpeed;

    impl MeasurementModel for ExactSpeed {
        fn sensor(&self) -> SensorKind {
            SensorKind::Velocity
        }
        fn measurement_vector(&self, message: &MeasurementMessage) -> Option<DVector<f64>> {
            match message.data {
                MeasurementData::Velocity { speed } => Some(DVector::from_vec(vec![speed])),
                _ => None,
            }
        }
        fn get_r(&self, _message: &MeasurementMessage) -> DMatrix<f64> {
            DMatrix::zeros(1, 1)
        }
        fn predict_measurement(&self, state: &FilterState, _context: &FilterContext) -> DVector<f64> {
            DVector::from_vec(vec![state.vector[0]])
        }
        fn calculate_jacobian(&self, _state: &FilterState, _context: &FilterContext) -> DMatrix<f64> {
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0])
        }
    }

    #[test]
    fn singular_innovation_keeps_prior() {
        // Zero prior covariance and a noise-free sensor make S = 0.
        let mut ekf = filter(0.0, vec![Box::new(ExactSpeed)]);
        let est = ekf.update(&[speed(1, 2.0)]);
        assert!(est.fallback_used);
        assert_eq!(est.velocity, 0.0);
        assert_eq!(est.velocity_std, 0.0);
    }

    /// One noise-free batch describing the step from `prev` to `now`.
    fn vehicle_batch(step: u64, prev: &VehicleState, now: &VehicleState) -> Vec<MeasurementMessage> {
        let timestamp = step as f64 * DT;
        let (sin_p, cos_p) = prev.theta.sin_cos();
        let (ddx, ddy) = (now.x - prev.x, now.y - prev.y);
        vec![
            MeasurementMessage {
                sensor: SensorKind::Imu,
                timestamp,
                step,
                data: MeasurementData::Imu {
                    longitudinal_accel: now.longitudinal_acceleration,
                    lateral_accel: now.lateral_acceleration,
                    yaw_rate: now.angular_velocity,
                },
                noise_stddev: vec![0.3, 0.3, 0.05],
            },
            speed(step, now.velocity),
            MeasurementMessage {
                sensor: SensorKind::Odometry,
                timestamp,
                step,
                data: MeasurementData::Odometry {
                    dx: cos_p * ddx + sin_p * ddy,
                    dy: -sin_p * ddx + cos_p * ddy,
                    dtheta: wrap_angle(now.theta - prev.theta),
                    dt: DT,
                },
                noise_stddev: vec![0.02, 0.02, 0.01],
            },
        ]
    }

    fn vehicle_filter() -> ExtendedKalmanFilter {
        filter(
            0.01,
            vec![
                Box::new(ImuModel::new(0.3, 0.05, 0.2)),
                Box::new(VelocityModel::new(0.1)),
                Box::new(OdometryModel::new(0.02, 0.01).with_actuator_lags(0.2, 0.1)),
            ],
        )
    }

    #[test]
    fn step_response_error_stays_within_reported_uncertainty() {
        let mut car = F110Vehicle::new(VehicleParams::default()).unwrap();
        car.reset(0.0, 0.0, 0.0).unwrap();
        let mut ekf = vehicle_filter();
        let control = ControlCommand::new(3.0, 0.0);

        for step in 1..=30 {
            let prev = *car.state();
            let now = car.step(control.velocity, control.angular_velocity).unwrap();
            ekf.predict(DT, &control);
            let est = ekf.update(&vehicle_batch(step, &prev, &now));

            assert!(!est.fallback_used);
            let error = est.velocity - now.velocity;
            assert!(
                error.abs() < 2.0 * est.velocity_std,
                "step {step}: error {error:.4} vs std {:.4}",
                est.velocity_std
            );
        }
    }

    #[test]
    fn imu_and_odometry_track_a_turn() {
        let mut car = F110Vehicle::new(VehicleParams::default()).unwrap();
        car.reset(0.0, 0.0, 0.0).unwrap();
        let mut ekf = vehicle_filter();
        let control = ControlCommand::new(1.0, 0.5);

        for step in 1..=60 {
            let prev = *car.state();
            let now = car.step(control.velocity, control.angular_velocity).unwrap();
            ekf.predict(DT, &control);
            let est = ekf.update(&vehicle_batch(step, &prev, &now));
            assert!(!est.fallback_used);
            assert!((est.angular_velocity - now.angular_velocity).abs() < 0.1);
        }
        let est = ekf.estimate();
        assert_abs_diff_eq!(est.velocity, car.state().velocity, epsilon = 0.02);
        assert_abs_diff_eq!(est.angular_velocity, 0.5, epsilon = 0.05);
    }

    #[test]
    fn mismatched_process_noise_is_rejected() {
        let layout = vec![StateVariable::Velocity, StateVariable::YawRate];
        let result = ExtendedKalmanFilter::new(
            FilterState::new(layout, 1.0, 0.0),
            DMatrix::identity(3, 3),
            Box::new(FirstOrderActuatorModel {
                velocity_time_constant: 0.2,
                yaw_rate_time_constant: 0.1,
            }),
            Vec::new(),
        );
        assert!(matches!(result, Err(DriftError::InvalidConfig(_))));
    }
}
