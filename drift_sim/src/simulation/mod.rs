// drift_sim/src/simulation/mod.rs

pub mod config;
pub mod core;
pub mod estimation;
pub mod perception;
pub mod scenario;
pub mod sensors;
pub mod world;
