// drift_sim/src/simulation/world/mod.rs

pub mod obstacles;
