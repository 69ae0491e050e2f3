// drift_core/src/models/dynamics/f110.rs

use crate::error::{DriftError, Result};
use crate::models::dynamics::Dynamics;
use crate::types::{Control, State};
use crate::utils::integrators::IntegrationScheme;
use nalgebra::DVector;
use serde::Deserialize;

pub const GRAVITY: f64 = 9.81;

// Indices into the 12-element state vector.
pub const IDX_X: usize = 0;
pub const IDX_Y: usize = 1;
pub const IDX_THETA: usize = 2;
pub const IDX_V: usize = 3;
pub const IDX_V_LAT: usize = 4;
pub const IDX_OMEGA: usize = 5;
pub const IDX_Z: usize = 6;
pub const IDX_V_Z: usize = 7;
pub const IDX_PITCH: usize = 8;
pub const IDX_PITCH_RATE: usize = 9;
pub const IDX_ROLL: usize = 10;
pub const IDX_ROLL_RATE: usize = 11;
pub const F110_STATE_DIM: usize = 12;

/// Physical and numerical parameters of the 1/10-scale car.
///
/// The slip model is parameterized explicitly (grip limit, slip gain, oversteer gain,
/// slip lag) so it can be fitted against recorded trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleParams {
    /// Fixed integration step, seconds.
    pub dt: f64,
    pub wheelbase: f64,
    /// Radians.
    pub max_steering_angle: f64,
    pub max_velocity: f64,
    pub max_angular_velocity: f64,
    /// First-order lag of the speed controller, seconds.
    pub velocity_time_constant: f64,
    /// First-order lag of the yaw-rate response, seconds.
    pub yaw_rate_time_constant: f64,

    // --- Slip ---
    pub enable_slip: bool,
    /// Tire/surface friction coefficient; the grip limit is `mu * g`.
    pub friction_coefficient: f64,
    /// Lateral velocity per unit speed at full slip.
    pub slip_gain: f64,
    /// Extra yaw rate, as a fraction of the command, at full slip.
    pub oversteer_gain: f64,
    pub slip_time_constant: f64,

    // --- 3D ---
    pub enable_3d: bool,
    pub cg_height: f64,
    /// rad/s, critically damped.
    pub roll_natural_frequency: f64,
    pub pitch_natural_frequency: f64,
    pub heave_natural_frequency: f64,
    /// Steady-state roll per unit lateral acceleration, rad / (m/s^2).
    pub roll_gain: f64,
    /// Steady-state pitch per unit longitudinal acceleration, rad / (m/s^2).
    pub pitch_gain: f64,
    pub max_roll: f64,
    pub max_pitch: f64,

    pub integration: IntegrationScheme,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            dt: 0.05,
            wheelbase: 0.33,
            max_steering_angle: 24.0_f64.to_radians(),
            max_velocity: 3.0,
            max_angular_velocity: 3.0,
            velocity_time_constant: 0.2,
            yaw_rate_time_constant: 0.1,
            enable_slip: true,
            friction_coefficient: 0.5,
            slip_gain: 0.35,
            oversteer_gain: 0.6,
            slip_time_constant: 0.15,
            enable_3d: false,
            cg_height: 0.08,
            roll_natural_frequency: 8.0,
            pitch_natural_frequency: 10.0,
            heave_natural_frequency: 12.0,
            roll_gain: 0.02,
            pitch_gain: 0.015,
            max_roll: 0.3,
            max_pitch: 0.25,
            integration: IntegrationScheme::Heun,
        }
    }
}

impl VehicleParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0 && self.dt <= 0.1) {
            return Err(DriftError::InvalidConfig(format!(
                "dt must be in (0, 0.1], got {}",
                self.dt
            )));
        }
        let positive = [
            ("wheelbase", self.wheelbase),
            ("max_steering_angle", self.max_steering_angle),
            ("max_velocity", self.max_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
            ("velocity_time_constant", self.velocity_time_constant),
            ("yaw_rate_time_constant", self.yaw_rate_time_constant),
            ("friction_coefficient", self.friction_coefficient),
            ("slip_time_constant", self.slip_time_constant),
            ("roll_natural_frequency", self.roll_natural_frequency),
            ("pitch_natural_frequency", self.pitch_natural_frequency),
            ("heave_natural_frequency", self.heave_natural_frequency),
            ("max_roll", self.max_roll),
            ("max_pitch", self.max_pitch),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DriftError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        let non_negative = [
            ("slip_gain", self.slip_gain),
            ("oversteer_gain", self.oversteer_gain),
            ("cg_height", self.cg_height),
            ("roll_gain", self.roll_gain),
            ("pitch_gain", self.pitch_gain),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DriftError::InvalidConfig(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }
        if self.max_steering_angle >= std::f64::consts::FRAC_PI_2 {
            return Err(DriftError::InvalidConfig(
                "max_steering_angle must be below 90 degrees".to_string(),
            ));
        }
        Ok(())
    }

    /// Largest yaw rate the steering geometry allows at the given speed.
    pub fn max_kinematic_yaw_rate(&self, velocity: f64) -> f64 {
        velocity.abs() * self.max_steering_angle.tan() / self.wheelbase
    }
}

/// Bicycle model with a first-order slip correction and an optional attitude model.
///
/// State: `[x, y, theta, v, v_lat, omega, z, v_z, pitch, pitch_rate, roll, roll_rate]`.
/// Control: `[velocity_cmd, angular_velocity_cmd]`.
///
/// Slip only builds up when the commanded lateral acceleration `|v * omega_cmd|` exceeds
/// the grip limit. Above it the slip ratio `tanh(excess / grip)` drives the rear out
/// (lateral velocity opposite the turn) and adds oversteer to the yaw response, which
/// is what makes high-speed sharp turns drift away from the kinematic prediction.
#[derive(Debug, Clone)]
pub struct F110SlipModel {
    pub params: VehicleParams,
}

impl F110SlipModel {
    pub fn new(params: VehicleParams) -> Self {
        Self { params }
    }

    /// Grip limit in m/s^2, reduced by the chassis attitude in 3D mode.
    pub fn grip_limit(&self, pitch: f64, roll: f64) -> f64 {
        let p = &self.params;
        let base = p.friction_coefficient * GRAVITY;
        if p.enable_3d {
            base * roll.cos() * pitch.cos()
        } else {
            base
        }
    }

    /// Slip ratio in `[0, 1)` for a speed and yaw-rate command.
    pub fn slip_ratio(&self, velocity: f64, angular_velocity_cmd: f64, grip: f64) -> f64 {
        if !self.params.enable_slip || grip <= 0.0 {
            return 0.0;
        }
        let demand = (velocity * angular_velocity_cmd).abs();
        let excess = (demand - grip).max(0.0);
        (excess / grip).tanh()
    }
}

impl Dynamics for F110SlipModel {
    fn get_state_dim(&self) -> usize {
        F110_STATE_DIM
    }

    fn get_control_dim(&self) -> usize {
        2
    }

    fn get_derivatives(&self, x: &State, u: &Control) -> State {
        let p = &self.params;
        let mut x_dot = DVector::zeros(F110_STATE_DIM);

        let theta = x[IDX_THETA];
        let v = x[IDX_V];
        let v_lat = x[IDX_V_LAT];
        let omega = x[IDX_OMEGA];
        let pitch = x[IDX_PITCH];
        let roll = x[IDX_ROLL];

        let v_cmd = u[0];
        let omega_cmd = u[1];

        // --- Planar kinematics ---
        let (sin_t, cos_t) = theta.sin_cos();
        x_dot[IDX_X] = v * cos_t - v_lat * sin_t;
        x_dot[IDX_Y] = v * sin_t + v_lat * cos_t;
        x_dot[IDX_THETA] = omega;

        // --- Actuation and slip ---
        let v_dot = (v_cmd - v) / p.velocity_time_constant;
        x_dot[IDX_V] = v_dot;

        let grip = self.grip_limit(pitch, roll);
        let slip = self.slip_ratio(v, omega_cmd, grip);

        let omega_limit = p.max_kinematic_yaw_rate(v);
        let omega_target = (omega_cmd * (1.0 + p.oversteer_gain * slip))
            .clamp(-omega_limit, omega_limit);
        x_dot[IDX_OMEGA] = (omega_target - omega) / p.yaw_rate_time_constant;

        let v_lat_target = -omega_cmd.signum() * p.slip_gain * v.abs() * slip;
        let v_lat_target = if slip > 0.0 { v_lat_target } else { 0.0 };
        let v_lat_dot = (v_lat_target - v_lat) / p.slip_time_constant;
        x_dot[IDX_V_LAT] = v_lat_dot;

        // --- Attitude (critically damped, driven by body accelerations) ---
        if p.enable_3d {
            let a_long = v_dot;
            let a_lat = v * omega + v_lat_dot;

            let wn_roll = p.roll_natural_frequency;
            let roll_target = -p.roll_gain * a_lat;
            x_dot[IDX_ROLL] = x[IDX_ROLL_RATE];
            x_dot[IDX_ROLL_RATE] =
                wn_roll * wn_roll * (roll_target - roll) - 2.0 * wn_roll * x[IDX_ROLL_RATE];

            // Squat under acceleration, dive under braking.
            let wn_pitch = p.pitch_natural_frequency;
            let pitch_target = -p.pitch_gain * a_long;
            x_dot[IDX_PITCH] = x[IDX_PITCH_RATE];
            x_dot[IDX_PITCH_RATE] =
                wn_pitch * wn_pitch * (pitch_target - pitch) - 2.0 * wn_pitch * x[IDX_PITCH_RATE];

            let wn_heave = p.heave_natural_frequency;
            let z_target = -p.cg_height * (1.0 - roll.cos() * pitch.cos());
            x_dot[IDX_Z] = x[IDX_V_Z];
            x_dot[IDX_V_Z] =
                wn_heave * wn_heave * (z_target - x[IDX_Z]) - 2.0 * wn_heave * x[IDX_V_Z];
        }

        x_dot
    }
}
