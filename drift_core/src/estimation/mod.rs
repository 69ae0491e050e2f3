// drift_core/src/estimation/mod.rs

use crate::messages::MeasurementMessage;
use crate::types::ControlCommand;
use serde::Serialize;

/// World context an estimator needs besides the measurements themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterContext {
    /// The command applied over the last step.
    pub control: ControlCommand,
    /// Length of the last prediction interval, 0 before the first one.
    pub dt: f64,
}

/// Filtered velocity and yaw rate with their uncertainty.
///
/// Re-derived every step; never carried across episodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EstimateState {
    pub timestamp: f64,
    pub velocity: f64,
    pub angular_velocity: f64,
    /// Always non-negative.
    pub velocity_std: f64,
    pub angular_velocity_std: f64,
    /// At least one correction this step was discarded and the prior kept.
    pub fallback_used: bool,
}

/// The contract for any algorithm that performs the state estimator role.
pub trait StateEstimator: Send + Sync {
    /// Advances the estimate by `dt` under the command that was applied over it.
    fn predict(&mut self, dt: f64, control: &ControlCommand);

    /// Fuses one step's batch of measurements and returns the new estimate.
    fn update(&mut self, measurements: &[MeasurementMessage]) -> EstimateState;

    /// The current estimate without changing it.
    fn estimate(&self) -> EstimateState;
}

pub mod filters;
pub mod state;
