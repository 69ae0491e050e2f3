// drift_core/src/models/estimation/measurement/velocity.rs

use super::{diagonal_r, MeasurementModel};
use crate::estimation::state::{FilterState, StateVariable};
use crate::estimation::FilterContext;
use crate::messages::{MeasurementData, MeasurementMessage, SensorKind};
use nalgebra::{DMatrix, DVector};

/// Wheel-speed style sensor: `h(x) = v`.
#[derive(Debug, Clone)]
pub struct VelocityModel {
    pub r_matrix: DMatrix<f64>,
}

impl VelocityModel {
    pub fn new(speed_stddev: f64) -> Self {
        Self {
            r_matrix: diagonal_r(&[speed_stddev], 1e-9),
        }
    }
}

impl MeasurementModel for VelocityModel {
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
        self.r_matrix.clone()
    }

    fn predict_measurement(&self, state: &FilterState, _context: &FilterContext) -> DVector<f64> {
        DVector::from_vec(vec![state.get(StateVariable::Velocity)])
    }

    fn calculate_jacobian(&self, state: &FilterState, _context: &FilterContext) -> DMatrix<f64> {
        let mut h = DMatrix::zeros(1, state.dim());
        if let Some(i) = state.find_idx(StateVariable::Velocity) {
            h[(0, i)] = 1.0;
        }
        h
    }
}
