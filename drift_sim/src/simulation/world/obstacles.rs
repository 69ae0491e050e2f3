// drift_sim/src/simulation/world/obstacles.rs

use crate::simulation::config::MovingAgentsConfig;
use crate::simulation::scenario::{ArenaBounds, Scenario};
use nalgebra::Vector2;
use rand::{Rng, RngCore};
use std::f64::consts::TAU;
use tracing::debug;

/// A circular obstacle. Static ones come from the scenario; moving agents carry a
/// world-frame velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: usize,
    pub position: Vector2<f64>,
    pub velocity: Option<Vector2<f64>>,
    pub radius: f64,
}

impl Obstacle {
    pub fn fixed(id: usize, x: f64, y: f64, radius: f64) -> Self {
        Self {
            id,
            position: Vector2::new(x, y),
            velocity: None,
            radius,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.is_some()
    }

    /// Advances a moving agent at constant velocity, reflecting off the arena walls.
    pub fn advance(&mut self, dt: f64, bounds: &ArenaBounds) {
        let Some(velocity) = self.velocity.as_mut() else {
            return;
        };
        self.position += *velocity * dt;

        let (lo_x, hi_x) = (bounds.x_min + self.radius, bounds.x_max - self.radius);
        let (lo_y, hi_y) = (bounds.y_min + self.radius, bounds.y_max - self.radius);
        if self.position.x < lo_x {
            self.position.x = 2.0 * lo_x - self.position.x;
            velocity.x = velocity.x.abs();
        } else if self.position.x > hi_x {
            self.position.x = 2.0 * hi_x - self.position.x;
            velocity.x = -velocity.x.abs();
        }
        if self.position.y < lo_y {
            self.position.y = 2.0 * lo_y - self.position.y;
            velocity.y = velocity.y.abs();
        } else if self.position.y > hi_y {
            self.position.y = 2.0 * hi_y - self.position.y;
            velocity.y = -velocity.y.abs();
        }
        // A reflection can overshoot in a very narrow arena.
        self.position.x = self.position.x.clamp(lo_x.min(hi_x), hi_x.max(lo_x));
        self.position.y = self.position.y.clamp(lo_y.min(hi_y), hi_y.max(lo_y));
    }
}

const MAX_SPAWN_ATTEMPTS: usize = 64;

/// Places `config.count` agents at random positions with random headings and speeds.
///
/// Candidates too close to the start pose, the goal or another obstacle are rejected;
/// after a bounded number of attempts the last candidate is kept so spawning always
/// terminates and consumes a bounded number of draws.
pub fn spawn_moving_agents(
    config: &MovingAgentsConfig,
    scenario: &Scenario,
    first_id: usize,
    existing: &[Obstacle],
    rng: &mut dyn RngCore,
) -> Vec<Obstacle> {
    let bounds = &scenario.bounds;
    let start = Vector2::new(scenario.start.0, scenario.start.1);
    let mut agents: Vec<Obstacle> = Vec::with_capacity(config.count);

    for i in 0..config.count {
        let mut position = Vector2::zeros();
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            position = Vector2::new(
                sample_between(rng, bounds.x_min + config.radius, bounds.x_max - config.radius),
                sample_between(rng, bounds.y_min + config.radius, bounds.y_max - config.radius),
            );
            let clear_of = |p: &Vector2<f64>, r: f64| {
                (position - p).norm() > config.spawn_clearance + r
            };
            if clear_of(&start, 0.0)
                && clear_of(&scenario.goal, scenario.goal_radius)
                && existing
                    .iter()
                    .chain(agents.iter())
                    .all(|o| clear_of(&o.position, o.radius))
            {
                break;
            }
        }

        let heading = rng.gen::<f64>() * TAU;
        let speed = sample_between(rng, config.min_speed, config.max_speed);
        let agent = Obstacle {
            id: first_id + i,
            position,
            velocity: Some(Vector2::new(heading.cos(), heading.sin()) * speed),
            radius: config.radius,
        };
        debug!(id = agent.id, x = position.x, y = position.y, speed, "spawned moving agent");
        agents.push(agent);
    }
    agents
}

fn sample_between(rng: &mut dyn RngCore, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    lo + rng.gen::<f64>() * (hi - lo)
}
