// drift_sim/src/prelude.rs

// Re-export the entire drift_core prelude so callers get the vehicle model,
// message types and estimator traits from one place.
pub use drift_core::prelude::*;

// The environment and its results.
pub use crate::env::{
    DriftCarEnv, Observation, ObservationLayout, StepInfo, StepOutcome, TerminationReason,
};

// Configuration and episode plumbing.
pub use crate::cli::Cli;
pub use crate::logging::init_logging;
pub use crate::simulation::config::*;
pub use crate::simulation::core::app_state::EpisodePhase;
pub use crate::simulation::core::prng::SimulationRng;
pub use crate::simulation::perception::{Detection, PerceptionMode, PerceptionPipeline};
pub use crate::simulation::scenario::{ArenaBounds, Scenario};
pub use crate::simulation::world::obstacles::Obstacle;
