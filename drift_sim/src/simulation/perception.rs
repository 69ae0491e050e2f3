// drift_sim/src/simulation/perception.rs

use crate::simulation::config::PerceptionConfig;
use crate::simulation::world::obstacles::Obstacle;
use drift_core::types::VehicleState;
use nalgebra::{Rotation2, Vector2};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};

/// One obstacle as seen from the car, in the ego frame (x forward, y left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub rel_x: f64,
    pub rel_y: f64,
    /// Center distance.
    pub range: f64,
    /// Obstacle velocity relative to the car, ego frame.
    pub rel_vx: f64,
    pub rel_vy: f64,
    /// Probability that this detection is real, 1 in perfect mode.
    pub confidence: f64,
    pub present: bool,
}

impl Detection {
    /// Padding for unused slots.
    pub const EMPTY: Detection = Detection {
        rel_x: 0.0,
        rel_y: 0.0,
        range: 0.0,
        rel_vx: 0.0,
        rel_vy: 0.0,
        confidence: 0.0,
        present: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionMode {
    /// Exact positions of every obstacle in range.
    Perfect,
    /// Range-dependent misses and position noise.
    Noisy,
}

/// Turns obstacle ground truth into a fixed-size detection list.
#[derive(Debug, Clone)]
pub struct PerceptionPipeline {
    mode: PerceptionMode,
    config: PerceptionConfig,
}

impl PerceptionPipeline {
    pub fn new(config: &PerceptionConfig, mode: PerceptionMode) -> Self {
        Self {
            mode,
            config: config.clone(),
        }
    }

    pub fn mode(&self) -> PerceptionMode {
        self.mode
    }

    pub fn max_detections(&self) -> usize {
        self.config.max_detections
    }

    pub fn sensing_range(&self) -> f64 {
        self.config.sensing_range
    }

    /// `p(d) = p_near + (p_far − p_near)(d / range)²`.
    pub fn detection_probability(&self, distance: f64) -> f64 {
        let c = &self.config;
        let ratio = (distance / c.sensing_range).clamp(0.0, 1.0);
        c.detection_prob_near + (c.detection_prob_far - c.detection_prob_near) * ratio * ratio
    }

    /// Detections sorted by ascending range, always exactly `max_detections` long.
    ///
    /// In noisy mode every in-range obstacle consumes one uniform and two normal draws,
    /// whether or not it ends up detected.
    pub fn perceive(
        &self,
        obstacles: &[Obstacle],
        ego: &VehicleState,
        rng: &mut dyn RngCore,
    ) -> Vec<Detection> {
        let to_ego = Rotation2::new(-ego.theta);
        let ego_position = ego.position();
        let ego_velocity = ego.world_velocity();

        let mut detections: Vec<Detection> = Vec::new();
        for obstacle in obstacles {
            let offset = obstacle.position - ego_position;
            let distance = offset.norm();
            if distance > self.config.sensing_range {
                continue;
            }

            let mut rel = to_ego * offset;
            let confidence = match self.mode {
                PerceptionMode::Perfect => 1.0,
                PerceptionMode::Noisy => {
                    let p = self.detection_probability(distance);
                    let roll: f64 = rng.gen();
                    let sigma = self.config.position_noise_base
                        + self.config.position_noise_per_meter * distance;
                    let nx: f64 = StandardNormal.sample(rng);
                    let ny: f64 = StandardNormal.sample(rng);
                    if roll >= p {
                        continue;
                    }
                    rel += Vector2::new(nx, ny) * sigma;
                    p
                }
            };

            let obstacle_velocity = obstacle.velocity.unwrap_or_else(Vector2::zeros);
            let rel_velocity = to_ego * (obstacle_velocity - ego_velocity);
            detections.push(Detection {
                rel_x: rel.x,
                rel_y: rel.y,
                range: rel.norm(),
                rel_vx: rel_velocity.x,
                rel_vy: rel_velocity.y,
                confidence,
                present: true,
            });
        }

        detections.sort_by(|a, b| a.range.total_cmp(&b.range));
        detections.truncate(self.config.max_detections);
        detections.resize(self.config.max_detections, Detection::EMPTY);
        detections
    }
}
