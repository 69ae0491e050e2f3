// drift_core/src/types.rs

use nalgebra::{DVector, Vector2};
use serde::Serialize;

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Control = DVector<f64>;

/// Ground-truth state of the car.
///
/// Plain data: produced by `F110Vehicle`, read by sensors, perception and the
/// environment. Positions are in the world frame, velocities in the body frame
/// (x forward, y left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    /// Heave of the chassis relative to its rest height. Zero in 2D mode.
    pub z: f64,
    /// Heading, always in `(-π, π]`.
    pub theta: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Longitudinal (body x) velocity.
    pub velocity: f64,
    /// Body y velocity produced by tire slip.
    pub lateral_velocity: f64,
    /// Yaw rate.
    pub angular_velocity: f64,
    pub vertical_velocity: f64,
    pub pitch_rate: f64,
    pub roll_rate: f64,
    /// Body-frame accelerations over the last step, by finite difference.
    pub longitudinal_acceleration: f64,
    pub lateral_acceleration: f64,
}

impl VehicleState {
    /// A state at rest with the given pose.
    pub fn at_pose(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Planar speed magnitude including the slip component.
    pub fn speed(&self) -> f64 {
        self.velocity.hypot(self.lateral_velocity)
    }

    /// Angle between the heading and the direction of travel.
    pub fn slip_angle(&self) -> f64 {
        if self.speed() < 1e-6 {
            return 0.0;
        }
        self.lateral_velocity.atan2(self.velocity.abs())
    }

    /// World-frame planar velocity.
    pub fn world_velocity(&self) -> Vector2<f64> {
        let (sin, cos) = self.theta.sin_cos();
        Vector2::new(
            self.velocity * cos - self.lateral_velocity * sin,
            self.velocity * sin + self.lateral_velocity * cos,
        )
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.z,
            self.theta,
            self.pitch,
            self.roll,
            self.velocity,
            self.lateral_velocity,
            self.angular_velocity,
            self.vertical_velocity,
            self.pitch_rate,
            self.roll_rate,
            self.longitudinal_acceleration,
            self.lateral_acceleration,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// A (velocity, yaw rate) command pair in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ControlCommand {
    pub velocity: f64,
    pub angular_velocity: f64,
}

impl ControlCommand {
    pub fn new(velocity: f64, angular_velocity: f64) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    /// Clamps both channels to `±max`. Non-finite channels become zero.
    pub fn clamped(&self, max_velocity: f64, max_angular_velocity: f64) -> Self {
        let clamp = |value: f64, limit: f64| {
            if value.is_finite() {
                value.clamp(-limit, limit)
            } else {
                0.0
            }
        };
        Self {
            velocity: clamp(self.velocity, max_velocity),
            angular_velocity: clamp(self.angular_velocity, max_angular_velocity),
        }
    }

    pub fn as_control(&self) -> Control {
        Control::from_vec(vec![self.velocity, self.angular_velocity])
    }
}
