// drift_core/src/models/estimation/dynamics/actuator.rs

use crate::estimation::state::StateVariable;
use crate::models::dynamics::Dynamics;
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::types::{Control, State};
use nalgebra::{DMatrix, DVector};

/// Velocity and yaw rate following their commands through first-order lags.
///
/// State `[v, ω]`, control `[v_cmd, ω_cmd]`:
/// `v̇ = (v_cmd − v)/τ_v`, `ω̇ = (ω_cmd − ω)/τ_ω`.
#[derive(Debug, Clone)]
pub struct FirstOrderActuatorModel {
    pub velocity_time_constant: f64,
    pub yaw_rate_time_constant: f64,
}

impl Dynamics for FirstOrderActuatorModel {
    fn get_state_dim(&self) -> usize {
        2
    }

    fn get_control_dim(&self) -> usize {
        2
    }

    fn get_derivatives(&self, x: &State, u: &Control) -> State {
        DVector::from_vec(vec![
            (u[0] - x[0]) / self.velocity_time_constant,
            (u[1] - x[1]) / self.yaw_rate_time_constant,
        ])
    }
}

impl EstimationDynamics for FirstOrderActuatorModel {
    fn get_state_layout(&self) -> Vec<StateVariable> {
        vec![StateVariable::Velocity, StateVariable::YawRate]
    }

    fn calculate_jacobian(&self, _x: &State, _u: &Control) -> (DMatrix<f64>, DMatrix<f64>) {
        let inv_tv = 1.0 / self.velocity_time_constant;
        let inv_tw = 1.0 / self.yaw_rate_time_constant;
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![-inv_tv, -inv_tw]));
        let b = DMatrix::from_diagonal(&DVector::from_vec(vec![inv_tv, inv_tw]));
        (a, b)
    }
}
