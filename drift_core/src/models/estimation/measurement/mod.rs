// drift_core/src/models/estimation/measurement/mod.rs

use crate::estimation::state::FilterState;
use crate::estimation::FilterContext;
use crate::messages::{MeasurementMessage, SensorKind};
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

// --- MEASUREMENT MODEL TRAIT ---
// The mathematical model of a sensor: `z = h(x) + v`
pub trait MeasurementModel: DynClone + Debug + Send + Sync {
    /// The sensor whose messages this model interprets.
    fn sensor(&self) -> SensorKind;

    /// Extracts the measurement vector `z` from a message.
    ///
    /// Returns `None` when the message carries data this model cannot fuse.
    fn measurement_vector(&self, message: &MeasurementMessage) -> Option<DVector<f64>>;

    /// Measurement noise covariance `R` for this message.
    fn get_r(&self, message: &MeasurementMessage) -> DMatrix<f64>;

    /// Predicts the ideal measurement `z_pred = h(x)`.
    fn predict_measurement(&self, state: &FilterState, context: &FilterContext) -> DVector<f64>;

    /// Measurement Jacobian `H = ∂h/∂x`.
    fn calculate_jacobian(&self, state: &FilterState, context: &FilterContext) -> DMatrix<f64>;
}

dyn_clone::clone_trait_object!(MeasurementModel);

/// Diagonal covariance from per-channel standard deviations.
///
/// Every variance is floored so a noise-free configuration still yields an
/// invertible innovation covariance in the common case.
pub(crate) fn diagonal_r(stddevs: &[f64], floor: f64) -> DMatrix<f64> {
    let variances: Vec<f64> = stddevs.iter().map(|s| (s * s).max(floor)).collect();
    DMatrix::from_diagonal(&DVector::from_vec(variances))
}

pub mod imu;
pub mod odometry;
pub mod velocity;
