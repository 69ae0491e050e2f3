// drift_core/src/models/dynamics/vehicle.rs

use crate::error::{DriftError, Result};
use crate::models::dynamics::f110::*;
use crate::models::dynamics::Dynamics;
use crate::types::{ControlCommand, State, VehicleState};
use crate::utils::angles::wrap_angle;
use tracing::{debug, error};

/// The simulated car: owns the integrated state vector and steps it one `dt` at a time.
///
/// A step either commits a fully finite new state or fails with `InvalidState` and
/// leaves the previous state in place.
#[derive(Debug, Clone)]
pub struct F110Vehicle {
    model: F110SlipModel,
    x: State,
    state: VehicleState,
    time: f64,
}

impl F110Vehicle {
    pub fn new(params: VehicleParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            model: F110SlipModel::new(params),
            x: State::zeros(F110_STATE_DIM),
            state: VehicleState::default(),
            time: 0.0,
        })
    }

    /// Places the car at rest at the given pose and restarts the clock.
    pub fn reset(&mut self, x: f64, y: f64, theta: f64) -> Result<()> {
        if !(x.is_finite() && y.is_finite() && theta.is_finite()) {
            error!(x, y, theta, "rejecting non-finite reset pose");
            return Err(DriftError::InvalidState(format!(
                "reset pose must be finite, got ({x}, {y}, {theta})"
            )));
        }

        let mut vector = State::zeros(F110_STATE_DIM);
        vector[IDX_X] = x;
        vector[IDX_Y] = y;
        vector[IDX_THETA] = wrap_angle(theta);

        self.state = VehicleState::at_pose(x, y, vector[IDX_THETA]);
        self.x = vector;
        self.time = 0.0;
        Ok(())
    }

    /// Advances the car by exactly one `dt`.
    ///
    /// Commands outside the configured limits are clamped.
    pub fn step(&mut self, velocity_cmd: f64, angular_velocity_cmd: f64) -> Result<VehicleState> {
        let params = &self.model.params;
        let dt = params.dt;
        let cmd = ControlCommand::new(velocity_cmd, angular_velocity_cmd)
            .clamped(params.max_velocity, params.max_angular_velocity);

        let mut next = self.model.propagate(
            &self.x,
            &cmd.as_control(),
            dt,
            params.integration.integrator(),
        );

        next[IDX_THETA] = wrap_angle(next[IDX_THETA]);
        if params.enable_3d {
            clamp_attitude(&mut next, IDX_PITCH, IDX_PITCH_RATE, params.max_pitch);
            clamp_attitude(&mut next, IDX_ROLL, IDX_ROLL_RATE, params.max_roll);
        }

        if next.iter().any(|v| !v.is_finite()) {
            error!(
                time = self.time,
                velocity_cmd = cmd.velocity,
                angular_velocity_cmd = cmd.angular_velocity,
                "integration produced a non-finite state"
            );
            return Err(DriftError::InvalidState(format!(
                "non-finite state after integration at t = {:.3}",
                self.time
            )));
        }

        // Body-frame acceleration at the committed state, as an accelerometer reads it.
        let x_dot = self.model.get_derivatives(&next, &cmd.as_control());
        let longitudinal_acceleration = x_dot[IDX_V];
        let lateral_acceleration = x_dot[IDX_V_LAT] + next[IDX_V] * next[IDX_OMEGA];

        let state = VehicleState {
            x: next[IDX_X],
            y: next[IDX_Y],
            z: next[IDX_Z],
            theta: next[IDX_THETA],
            pitch: next[IDX_PITCH],
            roll: next[IDX_ROLL],
            velocity: next[IDX_V],
            lateral_velocity: next[IDX_V_LAT],
            angular_velocity: next[IDX_OMEGA],
            vertical_velocity: next[IDX_V_Z],
            pitch_rate: next[IDX_PITCH_RATE],
            roll_rate: next[IDX_ROLL_RATE],
            longitudinal_acceleration,
            lateral_acceleration,
        };
        if !state.is_finite() {
            return Err(DriftError::InvalidState(
                "non-finite acceleration after integration".to_string(),
            ));
        }

        self.x = next;
        self.state = state;
        self.time += dt;
        debug!(
            time = self.time,
            x = state.x,
            y = state.y,
            theta = state.theta,
            v = state.velocity,
            v_lat = state.lateral_velocity,
            "vehicle stepped"
        );
        Ok(state)
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn params(&self) -> &VehicleParams {
        &self.model.params
    }

    /// Simulated time since the last reset, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }
}

/// Clamps an attitude angle and stops its rate if the rate points further out.
fn clamp_attitude(x: &mut State, angle_idx: usize, rate_idx: usize, limit: f64) {
    if x[angle_idx] > limit {
        x[angle_idx] = limit;
        if x[rate_idx] > 0.0 {
            x[rate_idx] = 0.0;
        }
    } else if x[angle_idx] < -limit {
        x[angle_idx] = -limit;
        if x[rate_idx] < 0.0 {
            x[rate_idx] = 0.0;
        }
    }
}
