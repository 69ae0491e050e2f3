// drift_core/src/models/estimation/measurement/odometry.rs

use super::{diagonal_r, MeasurementModel};
use crate::estimation::state::{FilterState, StateVariable};
use crate::estimation::FilterContext;
use crate::messages::{MeasurementData, MeasurementMessage, SensorKind};
use nalgebra::{DMatrix, DVector};

/// Odometry pose deltas turned into rates: `z = [dx/dt, dθ/dt]`.
///
/// A pose delta is the mean rate over the last step, while the filter state holds the
/// rate at its end. With first-order actuator lags and a command held over the step,
/// the mean is `u + (x − u)·g` with `g = (e^r − 1)/r`, `r = dt/τ`. A zero time
/// constant means no lag (`g = 1`, `h(x) = [v, ω]`).
///
/// The lateral delta is not fused since the filter carries no slip state.
#[derive(Debug, Clone)]
pub struct OdometryModel {
    /// Standard deviations of `dx` and `dθ` per message.
    pub dx_stddev: f64,
    pub dtheta_stddev: f64,
    pub velocity_time_constant: f64,
    pub yaw_rate_time_constant: f64,
}

impl OdometryModel {
    pub fn new(dx_stddev: f64, dtheta_stddev: f64) -> Self {
        Self {
            dx_stddev,
            dtheta_stddev,
            velocity_time_constant: 0.0,
            yaw_rate_time_constant: 0.0,
        }
    }

    /// Accounts for the actuator lags when relating pose deltas to end-of-step rates.
    pub fn with_actuator_lags(mut self, velocity_tau: f64, yaw_rate_tau: f64) -> Self {
        self.velocity_time_constant = velocity_tau;
        self.yaw_rate_time_constant = yaw_rate_tau;
        self
    }

    fn gains(&self, context: &FilterContext) -> (f64, f64) {
        (
            mean_rate_gain(self.velocity_time_constant, context.dt),
            mean_rate_gain(self.yaw_rate_time_constant, context.dt),
        )
    }
}

fn mean_rate_gain(tau: f64, dt: f64) -> f64 {
    if tau <= 0.0 || dt <= 0.0 {
        return 1.0;
    }
    let r = dt / tau;
    r.exp_m1() / r
}

impl MeasurementModel for OdometryModel {
    fn sensor(&self) -> SensorKind {
        SensorKind::Odometry
    }

    fn measurement_vector(&self, message: &MeasurementMessage) -> Option<DVector<f64>> {
        match message.data {
            // A zero-length interval (first reading after reset) carries no rate.
            MeasurementData::Odometry { dx, dtheta, dt, .. } if dt > 0.0 => {
                Some(DVector::from_vec(vec![dx / dt, dtheta / dt]))
            }
            _ => None,
        }
    }

    fn get_r(&self, message: &MeasurementMessage) -> DMatrix<f64> {
        let dt = match message.data {
            MeasurementData::Odometry { dt, .. } if dt > 0.0 => dt,
            _ => 1.0,
        };
        diagonal_r(&[self.dx_stddev / dt, self.dtheta_stddev / dt], 1e-9)
    }

    fn predict_measurement(&self, state: &FilterState, context: &FilterContext) -> DVector<f64> {
        let (gv, gw) = self.gains(context);
        let u = &context.control;
        DVector::from_vec(vec![
            u.velocity + (state.get(StateVariable::Velocity) - u.velocity) * gv,
            u.angular_velocity + (state.get(StateVariable::YawRate) - u.angular_velocity) * gw,
        ])
    }

    fn calculate_jacobian(&self, state: &FilterState, context: &FilterContext) -> DMatrix<f64> {
        let (gv, gw) = self.gains(context);
        let mut h = DMatrix::zeros(2, state.dim());
        if let Some(iv) = state.find_idx(StateVariable::Velocity) {
            h[(0, iv)] = gv;
        }
        if let Some(iw) = state.find_idx(StateVariable::YawRate) {
            h[(1, iw)] = gw;
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlCommand;
    use approx::assert_abs_diff_eq;

    fn message(dx: f64, dt: f64) -> MeasurementMessage {
        MeasurementMessage {
            sensor: SensorKind::Odometry,
            timestamp: 0.1,
            step: 2,
            data: MeasurementData::Odometry {
                dx,
                dy: 0.0,
                dtheta: 0.01,
                dt,
            },
            noise_stddev: vec![0.02, 0.02, 0.01],
        }
    }

    #[test]
    fn deltas_become_rates() {
        let model = OdometryModel::new(0.02, 0.01);
        let z = model.measurement_vector(&message(0.1, 0.05)).unwrap();
        assert!((z[0] - 2.0).abs() < 1e-12);
        assert!((z[1] - 0.2).abs() < 1e-12);
        let r = model.get_r(&message(0.1, 0.05));
        assert!((r[(0, 0)] - 0.16).abs() < 1e-12);
    }

    #[test]
    fn lagged_prediction_is_the_mean_rate_over_the_step() {
        let tau = 0.2;
        let dt = 0.05;
        let model = OdometryModel::new(0.02, 0.01).with_actuator_lags(tau, 0.1);
        let context = FilterContext {
            control: ControlCommand::new(3.0, 0.0),
            dt,
        };
        // One step from rest under the exact lag.
        let v_end = 3.0 * (1.0 - (-dt / tau).exp());
        let mean = 3.0 - 3.0 * tau / dt * (1.0 - (-dt / tau).exp());
        let mut state = FilterState::new(vec![StateVariable::Velocity, StateVariable::YawRate], 1.0, 0.0);
        state.vector[0] = v_end;

        let z = model.predict_measurement(&state, &context);
        assert_abs_diff_eq!(z[0], mean, epsilon = 1e-12);
        assert!(z[0] < v_end);
        assert_abs_diff_eq!(z[1], 0.0, epsilon = 1e-12);

        let h = model.calculate_jacobian(&state, &context);
        assert_abs_diff_eq!(h[(0, 0)], (dt / tau).exp_m1() * tau / dt, epsilon = 1e-12);
    }

    #[test]
    fn without_lags_or_interval_the_rate_is_the_state() {
        let mut state = FilterState::new(vec![StateVariable::Velocity, StateVariable::YawRate], 1.0, 0.0);
        state.vector[0] = 1.2;
        state.vector[1] = -0.3;
        let plain = OdometryModel::new(0.02, 0.01);
        let context = FilterContext {
            control: ControlCommand::new(3.0, 1.0),
            dt: 0.05,
        };
        let z = plain.predict_measurement(&state, &context);
        assert_abs_diff_eq!(z[0], 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(z[1], -0.3, epsilon = 1e-12);

        let lagged = plain.with_actuator_lags(0.2, 0.1);
        let z = lagged.predict_measurement(&state, &FilterContext::default());
        assert_abs_diff_eq!(z[0], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn zero_interval_is_not_fused() {
        let model = OdometryModel::new(0.02, 0.01);
        assert!(model.measurement_vector(&message(0.0, 0.0)).is_none());
    }
}
