// drift_core/src/estimation/state.rs

use nalgebra::{DMatrix, DVector};

/// Every variable an estimator state vector can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
    /// Longitudinal body velocity.
    Velocity,
    /// Yaw rate.
    YawRate,
}

/// The state object used by filters. It bundles the state vector with its layout,
/// covariance, and timestamp.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// The ordered schema of the state vector.
    pub layout: Vec<StateVariable>,
    /// The state vector `x`.
    pub vector: DVector<f64>,
    /// The covariance matrix `P`.
    pub covariance: DMatrix<f64>,
    /// The timestamp of the last predict or update.
    pub last_update_timestamp: f64,
}

impl FilterState {
    /// A zero state with a diagonal covariance of `initial_variance`.
    pub fn new(layout: Vec<StateVariable>, initial_variance: f64, timestamp: f64) -> Self {
        let dim = layout.len();
        Self {
            layout,
            vector: DVector::zeros(dim),
            covariance: DMatrix::identity(dim, dim) * initial_variance,
            last_update_timestamp: timestamp,
        }
    }

    pub fn dim(&self) -> usize {
        self.layout.len()
    }

    pub fn find_idx(&self, var: StateVariable) -> Option<usize> {
        self.layout.iter().position(|v| *v == var)
    }

    /// Value of a variable, zero if the layout does not carry it.
    pub fn get(&self, var: StateVariable) -> f64 {
        self.find_idx(var).map_or(0.0, |i| self.vector[i])
    }

    /// Standard deviation of a variable. Round-off can leave a tiny negative
    /// variance on the diagonal, which is reported as zero.
    pub fn std_dev(&self, var: StateVariable) -> f64 {
        self.find_idx(var)
            .map_or(0.0, |i| self.covariance[(i, i)].max(0.0).sqrt())
    }

    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_clamps_negative_variance() {
        let mut state = FilterState::new(vec![StateVariable::Velocity, StateVariable::YawRate], 0.04, 0.0);
        assert!((state.std_dev(StateVariable::Velocity) - 0.2).abs() < 1e-12);
        state.covariance[(1, 1)] = -1e-15;
        assert_eq!(state.std_dev(StateVariable::YawRate), 0.0);
    }

    #[test]
    fn missing_variable_reads_as_zero() {
        let state = FilterState::new(vec![StateVariable::Velocity], 1.0, 0.0);
        assert_eq!(state.find_idx(StateVariable::YawRate), None);
        assert_eq!(state.get(StateVariable::YawRate), 0.0);
    }
}
