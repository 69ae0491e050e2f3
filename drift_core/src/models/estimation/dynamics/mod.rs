// drift_core/src/models/estimation/dynamics/mod.rs

use crate::estimation::state::StateVariable;
use crate::models::dynamics::Dynamics;
use crate::types::{Control, State};
use nalgebra::DMatrix;

/// A dynamics model used inside a state estimator.
///
/// On top of `Dynamics` it names the variables of its state vector and provides the
/// Jacobians needed to linearize the system for the EKF covariance prediction.
pub trait EstimationDynamics: Dynamics {
    /// The ordered variables of the state vector this model propagates.
    fn get_state_layout(&self) -> Vec<StateVariable>;

    /// Jacobians `(A, B)` of `f(x, u)`: `A = ∂f/∂x` (N×N), `B = ∂f/∂u` (N×M).
    fn calculate_jacobian(&self, x: &State, u: &Control) -> (DMatrix<f64>, DMatrix<f64>);
}

pub mod actuator;
