// drift_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the drift_sim crate
// and for binaries driving the environment.
pub mod prelude;

pub mod cli;
pub mod env;
pub mod logging;
// Everything the environment composes: scenarios, sensors, perception, estimation.
pub mod simulation;

pub use env::{DriftCarEnv, StepInfo, StepOutcome, TerminationReason};
