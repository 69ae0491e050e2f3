// drift_core/src/error.rs

use thiserror::Error;

/// Every failure the simulation can report.
///
/// Only `InvalidAction` and `InvalidTransition` are meant to reach the caller of an
/// environment; `InvalidState` ends the episode and `EstimationSingularity` is absorbed
/// by the estimator, which falls back to its prior.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    /// A non-finite or out-of-range vehicle state, either given as input or produced
    /// by an integration step.
    #[error("Invalid vehicle state: {0}")]
    InvalidState(String),

    /// An action that cannot be interpreted (wrong shape).
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// `step` was called while the episode is not running.
    #[error("Invalid transition: cannot step while the episode is {phase}; call reset first")]
    InvalidTransition { phase: &'static str },

    /// The innovation covariance of the filter could not be inverted, or the corrected
    /// estimate was not finite.
    #[error("Estimation singularity from {sensor}: {details}")]
    EstimationSingularity { sensor: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DriftError>;
