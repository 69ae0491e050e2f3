// drift_sim/src/simulation/scenario.rs

use crate::simulation::config::ScenarioKind;
use crate::simulation::world::obstacles::Obstacle;
use nalgebra::Vector2;

/// Axis-aligned rectangle the car must stay inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ArenaBounds {
    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn diagonal(&self) -> f64 {
        (self.x_max - self.x_min).hypot(self.y_max - self.y_min)
    }
}

/// A static course: where the car starts, where it must go, and what is in the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub kind: ScenarioKind,
    /// `(x, y, theta)`.
    pub start: (f64, f64, f64),
    pub goal: Vector2<f64>,
    pub goal_radius: f64,
    pub bounds: ArenaBounds,
    pub obstacles: Vec<Obstacle>,
    /// Multiplier on the vehicle friction coefficient for this surface.
    pub surface_grip: f64,
}

impl Scenario {
    pub fn from_kind(kind: ScenarioKind) -> Self {
        match kind {
            // Loose gravel: a wide open course, little grip, a few scattered rocks.
            ScenarioKind::Loose => Self {
                kind,
                start: (0.0, 0.0, 0.0),
                goal: Vector2::new(8.0, 4.0),
                goal_radius: 0.6,
                bounds: ArenaBounds {
                    x_min: -2.0,
                    x_max: 12.0,
                    y_min: -5.0,
                    y_max: 8.0,
                },
                obstacles: vec![
                    Obstacle::fixed(0, 3.0, 2.0, 0.3),
                    Obstacle::fixed(1, 5.5, 0.8, 0.35),
                    Obstacle::fixed(2, 6.0, 5.5, 0.3),
                ],
                surface_grip: 0.6,
            },
            // A narrow corridor with staggered posts on high-grip tarmac.
            ScenarioKind::Tight => Self {
                kind,
                start: (0.0, 0.0, 0.0),
                goal: Vector2::new(10.0, 0.0),
                goal_radius: 0.4,
                bounds: ArenaBounds {
                    x_min: -1.0,
                    x_max: 11.0,
                    y_min: -1.5,
                    y_max: 1.5,
                },
                obstacles: vec![
                    Obstacle::fixed(0, 3.0, 0.7, 0.25),
                    Obstacle::fixed(1, 5.0, -0.7, 0.25),
                    Obstacle::fixed(2, 7.0, 0.7, 0.25),
                ],
                surface_grip: 1.2,
            },
            ScenarioKind::Slalom => Self {
                kind,
                start: (0.0, 0.0, 0.0),
                goal: Vector2::new(13.0, 0.0),
                goal_radius: 0.5,
                bounds: ArenaBounds {
                    x_min: -1.0,
                    x_max: 14.0,
                    y_min: -3.0,
                    y_max: 3.0,
                },
                obstacles: (0..4)
                    .map(|i| Obstacle::fixed(i, 3.0 + 2.5 * i as f64, 0.0, 0.2))
                    .collect(),
                surface_grip: 1.0,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Scale used to normalize goal-relative features.
    pub fn distance_scale(&self) -> f64 {
        self.bounds.diagonal().max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_is_consistent() {
        for kind in [ScenarioKind::Loose, ScenarioKind::Tight, ScenarioKind::Slalom] {
            let s = Scenario::from_kind(kind);
            let start = Vector2::new(s.start.0, s.start.1);
            assert!(s.bounds.contains(&start), "{kind}: start outside arena");
            assert!(s.bounds.contains(&s.goal), "{kind}: goal outside arena");
            for o in &s.obstacles {
                assert!(s.bounds.contains(&o.position));
                assert!((o.position - start).norm() > o.radius + 1.0);
                assert!((o.position - s.goal).norm() > o.radius + s.goal_radius);
                assert!(!o.is_moving());
            }
            assert_eq!(s.name(), kind.as_str());
        }
    }

    #[test]
    fn loose_gravel_has_less_grip() {
        let loose = Scenario::from_kind(ScenarioKind::Loose);
        let tight = Scenario::from_kind(ScenarioKind::Tight);
        assert!(loose.surface_grip < tight.surface_grip);
    }
}
