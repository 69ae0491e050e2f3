// drift_core/src/lib.rs

// Framework-agnostic math for the drift car: dynamics, messages and estimation.
pub mod error;
pub mod estimation;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod types;
pub mod utils;
