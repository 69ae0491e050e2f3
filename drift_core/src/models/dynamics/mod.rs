// drift_core/src/models/dynamics/mod.rs

use crate::types::{Control, State};
use crate::utils::integrators::Integrator;
use std::fmt::Debug;

// --- DYNAMICS MODEL TRAIT ---
/// Represents the physics model of the simulated car: `x_dot = f(x, u)`.
///
/// Implementations describe the continuous-time derivatives only; stepping is done by
/// an `Integrator`, with the control input held constant over the step.
pub trait Dynamics: Debug + Send + Sync {
    /// Returns the total number of states (the length of the state vector `x`).
    fn get_state_dim(&self) -> usize;

    /// Returns the number of dimensions in the control input vector `u`.
    fn get_control_dim(&self) -> usize;

    /// Computes the time derivative of the state vector.
    fn get_derivatives(&self, x: &State, u: &Control) -> State;

    /// Propagates the state forward by `dt` with the given integrator.
    ///
    /// A control vector of the wrong size is replaced by zeros rather than indexed out
    /// of bounds.
    fn propagate(&self, x: &State, u: &Control, dt: f64, integrator: &dyn Integrator) -> State {
        debug_assert!(dt >= 0.0, "Dynamics::propagate: dt cannot be negative");

        let zeros;
        let u_actual = if u.nrows() == self.get_control_dim() {
            u
        } else {
            tracing::warn!(
                expected = self.get_control_dim(),
                got = u.nrows(),
                "control dimension mismatch, propagating with zero input"
            );
            zeros = Control::zeros(self.get_control_dim());
            &zeros
        };

        let func = |func_x: &State| -> State { self.get_derivatives(func_x, u_actual) };
        integrator.step(&func, x, dt)
    }
}

pub mod f110;
pub mod vehicle;
