// drift_sim/examples/01_basic_episode.rs
//
// Rolls out episodes with a simple goal-seeking policy.
//
//   cargo run -p drift_sim --example 01_basic_episode -- --scenario tight --noisy-sensors

use clap::Parser;
use drift_sim::prelude::*;

/// Steer toward the goal bearing, slow down when it is off to the side.
fn goal_seeking_policy(observation: &Observation, layout: &ObservationLayout) -> [f64; 2] {
    let goal = &layout.goal;
    let sin_bearing = observation[goal.start + 2];
    let cos_bearing = observation[goal.start + 3];
    let bearing = sin_bearing.atan2(cos_bearing);
    let throttle = 0.3 + 0.4 * cos_bearing.max(0.0);
    [throttle, (1.5 * bearing).clamp(-1.0, 1.0)]
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut env = DriftCarEnv::new(cli.to_config())?;
    let layout = env.observation_layout().clone();

    for episode in 0..cli.episodes {
        let seed = (episode == 0).then_some(cli.seed);
        let (mut observation, _) = env.reset(seed)?;
        let mut total_reward = 0.0;

        let last = loop {
            let action = goal_seeking_policy(&observation, &layout);
            let outcome = env.step(&action)?;
            total_reward += outcome.reward;
            observation = outcome.observation;
            if outcome.terminated || outcome.truncated {
                break outcome.info;
            }
        };

        tracing::info!(
            episode,
            steps = last.step,
            total_reward,
            reason = last.termination_reason.map_or("truncated", |r| r.as_str()),
            goal_distance = last.goal_distance,
            "episode finished"
        );
    }

    env.close();
    Ok(())
}
