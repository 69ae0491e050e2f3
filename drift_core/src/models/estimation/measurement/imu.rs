// drift_core/src/models/estimation/measurement/imu.rs

use super::{diagonal_r, MeasurementModel};
use crate::estimation::state::{FilterState, StateVariable};
use crate::estimation::FilterContext;
use crate::messages::{MeasurementData, MeasurementMessage, SensorKind};
use nalgebra::{DMatrix, DVector};

/// Planar IMU: `z = [a_long, a_lat, ω_gyro]`.
///
/// The accelerometer reads the instantaneous body acceleration at the end of the step.
/// The longitudinal channel is predicted from the actuator lag and the last command,
/// `a_long = (v_cmd − v)/τ_v`, and the lateral channel from the centripetal term
/// `a_lat = v ω`. Slip adds an unmodeled lateral component, which is absorbed by `R`.
#[derive(Debug, Clone)]
pub struct ImuModel {
    pub r_matrix: DMatrix<f64>,
    pub velocity_time_constant: f64,
}

impl ImuModel {
    pub fn new(accel_stddev: f64, gyro_stddev: f64, velocity_time_constant: f64) -> Self {
        Self {
            r_matrix: diagonal_r(&[accel_stddev, accel_stddev, gyro_stddev], 1e-9),
            velocity_time_constant,
        }
    }
}

impl MeasurementModel for ImuModel {
    fn sensor(&self) -> SensorKind {
        SensorKind::Imu
    }

    fn measurement_vector(&self, message: &MeasurementMessage) -> Option<DVector<f64>> {
        match message.data {
            MeasurementData::Imu { .. } => Some(message.data.channels()),
            _ => None,
        }
    }

    fn get_r(&self, _message: &MeasurementMessage) -> DMatrix<f64> {
        self.r_matrix.clone()
    }

    fn predict_measurement(&self, state: &FilterState, context: &FilterContext) -> DVector<f64> {
        let v = state.get(StateVariable::Velocity);
        let w = state.get(StateVariable::YawRate);
        DVector::from_vec(vec![
            (context.control.velocity - v) / self.velocity_time_constant,
            v * w,
            w,
        ])
    }

    fn calculate_jacobian(&self, state: &FilterState, _context: &FilterContext) -> DMatrix<f64> {
        let v = state.get(StateVariable::Velocity);
        let w = state.get(StateVariable::YawRate);
        let mut h = DMatrix::zeros(3, state.dim());
        if let Some(iv) = state.find_idx(StateVariable::Velocity) {
            h[(0, iv)] = -1.0 / self.velocity_time_constant;
            h[(1, iv)] = w;
        }
        if let Some(iw) = state.find_idx(StateVariable::YawRate) {
            h[(1, iw)] = v;
            h[(2, iw)] = 1.0;
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlCommand;
    use approx::assert_abs_diff_eq;

    #[test]
    fn jacobian_matches_finite_difference() {
        let model = ImuModel::new(0.3, 0.05, 0.2);
        let context = FilterContext {
            control: ControlCommand::new(2.0, 0.5),
            ..Default::default()
        };
        let mut state = FilterState::new(vec![StateVariable::Velocity, StateVariable::YawRate], 1.0, 0.0);
        state.vector[0] = 1.5;
        state.vector[1] = 0.8;

        let h = model.calculate_jacobian(&state, &context);
        let base = model.predict_measurement(&state, &context);
        let eps = 1e-6;
        for j in 0..2 {
            let mut perturbed = state.clone();
            perturbed.vector[j] += eps;
            let z = model.predict_measurement(&perturbed, &context);
            for i in 0..3 {
                assert_abs_diff_eq!((z[i] - base[i]) / eps, h[(i, j)], epsilon = 1e-4);
            }
        }
    }
}
