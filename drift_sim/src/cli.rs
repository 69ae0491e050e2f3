// drift_sim/src/cli.rs

use crate::simulation::config::{EnvConfig, ScenarioKind};
use clap::Parser;

/// Drift: a seeded drift-car environment for reinforcement learning research.
///
/// This struct defines the command-line arguments shared by every binary that
/// drives `DriftCarEnv` from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The course to run: loose, tight or slalom.
    #[arg(short, long, default_value = "loose")]
    pub scenario: ScenarioKind,

    /// Seed for the first episode.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Step budget per episode.
    #[arg(long, default_value_t = 400)]
    pub max_steps: u64,

    /// Number of episodes to roll out.
    #[arg(short, long, default_value_t = 1)]
    pub episodes: u32,

    /// Gaussian sensor noise with EKF state estimation.
    #[arg(long, default_value_t = false)]
    pub noisy_sensors: bool,

    /// Range-dependent misses and noise in obstacle detections.
    #[arg(long, default_value_t = false)]
    pub perception: bool,

    /// Per-sensor measurement delays.
    #[arg(long, default_value_t = false)]
    pub latency: bool,

    /// Roll, pitch and load transfer.
    #[arg(long, default_value_t = false)]
    pub dynamics_3d: bool,

    /// Obstacles that wander the arena.
    #[arg(long, default_value_t = false)]
    pub moving_agents: bool,
}

impl Cli {
    pub fn to_config(&self) -> EnvConfig {
        EnvConfig {
            scenario: self.scenario,
            use_noisy_sensors: self.noisy_sensors,
            use_perception_pipeline: self.perception,
            use_latency: self.latency,
            use_3d_dynamics: self.dynamics_3d,
            use_moving_agents: self.moving_agents,
            max_steps: self.max_steps,
            seed: Some(self.seed),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_baseline_configuration() {
        let cli = Cli::try_parse_from(["drift"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.scenario, ScenarioKind::Loose);
        assert!(!config.use_noisy_sensors && !config.use_moving_agents);
        assert_eq!(config.max_steps, 400);
        assert_eq!(config.seed, Some(0));
    }

    #[test]
    fn flags_map_onto_the_config() {
        let cli = Cli::try_parse_from([
            "drift",
            "--scenario",
            "slalom",
            "--seed",
            "9",
            "--noisy-sensors",
            "--dynamics-3d",
            "--moving-agents",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.scenario, ScenarioKind::Slalom);
        assert_eq!(config.seed, Some(9));
        assert!(config.use_noisy_sensors && config.use_3d_dynamics && config.use_moving_agents);
        assert!(!config.use_latency && !config.use_perception_pipeline);
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        assert!(Cli::try_parse_from(["drift", "--scenario", "ice"]).is_err());
    }
}
