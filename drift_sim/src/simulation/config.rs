// drift_sim/src/simulation/config.rs

use drift_core::error::{DriftError, Result};
use drift_core::models::dynamics::f110::VehicleParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # EnvConfig
/// Everything needed to build a `DriftCarEnv`. The five `use_*` flags fix the
/// observation layout for the lifetime of the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)] // Fail on fields not in our struct
pub struct EnvConfig {
    pub scenario: ScenarioKind,
    pub use_noisy_sensors: bool,
    pub use_perception_pipeline: bool,
    pub use_latency: bool,
    pub use_3d_dynamics: bool,
    pub use_moving_agents: bool,
    /// Episode step budget; reaching it truncates the episode.
    pub max_steps: u64,
    /// Seed for the first reset. Later resets without a seed continue the stream.
    pub seed: Option<u64>,
    /// Number of past actions included in the observation.
    pub action_history_len: usize,
    /// Collision radius of the car, in meters.
    pub vehicle_radius: f64,

    /// Vehicle parameters. `enable_3d` is driven by `use_3d_dynamics`; setting it here
    /// without the flag is rejected by `validate`.
    pub vehicle: VehicleParams,
    pub sensors: SensorsConfig,
    pub estimator: EstimatorConfig,
    pub perception: PerceptionConfig,
    pub moving_agents: MovingAgentsConfig,
    pub reward: RewardConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::Loose,
            use_noisy_sensors: false,
            use_perception_pipeline: false,
            use_latency: false,
            use_3d_dynamics: false,
            use_moving_agents: false,
            max_steps: 400,
            seed: None,
            action_history_len: 3,
            vehicle_radius: 0.2,
            vehicle: VehicleParams::default(),
            sensors: SensorsConfig::default(),
            estimator: EstimatorConfig::default(),
            perception: PerceptionConfig::default(),
            moving_agents: MovingAgentsConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl EnvConfig {
    /// Every feature flag turned on.
    pub fn research(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            use_noisy_sensors: true,
            use_perception_pipeline: true,
            use_latency: true,
            use_3d_dynamics: true,
            use_moving_agents: true,
            ..Default::default()
        }
    }

    pub fn sensor_mode(&self) -> &'static str {
        if self.use_noisy_sensors {
            "noisy"
        } else {
            "perfect"
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.vehicle.validate()?;
        if self.vehicle.enable_3d && !self.use_3d_dynamics {
            return Err(invalid(
                "vehicle.enable_3d conflicts with use_3d_dynamics = false; set use_3d_dynamics instead",
            ));
        }
        if self.max_steps == 0 {
            return Err(invalid("max_steps must be at least 1"));
        }
        if !(self.vehicle_radius.is_finite() && self.vehicle_radius > 0.0) {
            return Err(invalid("vehicle_radius must be positive"));
        }
        self.sensors.validate()?;
        self.estimator.validate()?;
        self.perception.validate()?;
        self.moving_agents.validate()?;
        self.reward.validate()
    }
}

fn invalid(msg: impl Into<String>) -> DriftError {
    DriftError::InvalidConfig(msg.into())
}

fn check_stddevs(name: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|s| s.is_finite() && *s >= 0.0) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{name} noise standard deviations must be finite and non-negative"
        )))
    }
}

// =========================================================================
// == Scenario Selection ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Wide course on low-friction gravel.
    #[default]
    Loose,
    /// Narrow corridor with staggered obstacles on high-grip tarmac.
    Tight,
    /// Cones on the center line.
    Slalom,
}

impl ScenarioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::Loose => "loose",
            ScenarioKind::Tight => "tight",
            ScenarioKind::Slalom => "slalom",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "loose" => Ok(ScenarioKind::Loose),
            "tight" => Ok(ScenarioKind::Tight),
            "slalom" => Ok(ScenarioKind::Slalom),
            other => Err(invalid(format!(
                "unknown scenario '{other}', expected loose, tight or slalom"
            ))),
        }
    }
}

// =========================================================================
// == Sensors ==
// =========================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorsConfig {
    pub imu: ImuConfig,
    pub velocity: VelocitySensorConfig,
    pub odometry: OdometryConfig,
}

impl SensorsConfig {
    fn validate(&self) -> Result<()> {
        check_stddevs(
            "imu",
            &[self.imu.accel_noise_stddev, self.imu.gyro_noise_stddev],
        )?;
        check_stddevs("velocity", &[self.velocity.noise_stddev])?;
        check_stddevs("odometry", &self.odometry.noise_stddev)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImuConfig {
    /// m/s^2, applied to both planar axes.
    pub accel_noise_stddev: f64,
    /// rad/s.
    pub gyro_noise_stddev: f64,
    /// Delay in steps, used only when latency is enabled.
    pub latency_steps: usize,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            accel_noise_stddev: 0.3,
            gyro_noise_stddev: 0.05,
            latency_steps: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VelocitySensorConfig {
    /// m/s.
    pub noise_stddev: f64,
    pub latency_steps: usize,
}

impl Default for VelocitySensorConfig {
    fn default() -> Self {
        Self {
            noise_stddev: 0.1,
            latency_steps: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OdometryConfig {
    /// `[dx, dy, dtheta]` per reading, in m and rad.
    pub noise_stddev: [f64; 3],
    pub latency_steps: usize,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            noise_stddev: [0.02, 0.02, 0.01],
            latency_steps: 3,
        }
    }
}

// =========================================================================
// == Estimation ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Variance of both filter states at reset. The car starts at rest, so this is small.
    pub initial_variance: f64,
    /// Diagonal of the continuous process noise `Q` for `[v, ω]`.
    pub process_noise: [f64; 2],
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_variance: 0.01,
            process_noise: [0.5, 0.5],
        }
    }
}

impl EstimatorConfig {
    fn validate(&self) -> Result<()> {
        let values = [
            self.initial_variance,
            self.process_noise[0],
            self.process_noise[1],
        ];
        if values.iter().all(|v| v.is_finite() && *v >= 0.0) {
            Ok(())
        } else {
            Err(invalid("estimator variances must be finite and non-negative"))
        }
    }
}

// =========================================================================
// == Perception ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerceptionConfig {
    /// Obstacles farther than this (center distance) are never reported.
    pub sensing_range: f64,
    /// Fixed length of the detection list.
    pub max_detections: usize,
    /// Detection probability at zero range.
    pub detection_prob_near: f64,
    /// Detection probability at the edge of the sensing range.
    pub detection_prob_far: f64,
    /// Position noise: `σ(d) = base + per_meter * d`.
    pub position_noise_base: f64,
    pub position_noise_per_meter: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            sensing_range: 5.0,
            max_detections: 4,
            detection_prob_near: 0.98,
            detection_prob_far: 0.6,
            position_noise_base: 0.02,
            position_noise_per_meter: 0.03,
        }
    }
}

impl PerceptionConfig {
    fn validate(&self) -> Result<()> {
        if !(self.sensing_range.is_finite() && self.sensing_range > 0.0) {
            return Err(invalid("perception sensing_range must be positive"));
        }
        if self.max_detections == 0 {
            return Err(invalid("perception max_detections must be at least 1"));
        }
        for p in [self.detection_prob_near, self.detection_prob_far] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid("detection probabilities must lie in [0, 1]"));
            }
        }
        check_stddevs(
            "perception",
            &[self.position_noise_base, self.position_noise_per_meter],
        )
    }
}

// =========================================================================
// == Moving Agents ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovingAgentsConfig {
    pub count: usize,
    pub min_speed: f64,
    pub max_speed: f64,
    pub radius: f64,
    /// Agents are never spawned closer than this to the start pose or the goal.
    pub spawn_clearance: f64,
}

impl Default for MovingAgentsConfig {
    fn default() -> Self {
        Self {
            count: 2,
            min_speed: 0.2,
            max_speed: 0.8,
            radius: 0.25,
            spawn_clearance: 1.5,
        }
    }
}

impl MovingAgentsConfig {
    fn validate(&self) -> Result<()> {
        if !(self.min_speed.is_finite() && self.max_speed.is_finite())
            || self.min_speed < 0.0
            || self.min_speed > self.max_speed
        {
            return Err(invalid(
                "moving agent speeds must satisfy 0 <= min_speed <= max_speed",
            ));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(invalid("moving agent radius must be positive"));
        }
        if !(self.spawn_clearance.is_finite() && self.spawn_clearance >= 0.0) {
            return Err(invalid("moving agent spawn_clearance must be non-negative"));
        }
        Ok(())
    }
}

// =========================================================================
// == Reward ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardConfig {
    /// Reward per meter of progress toward the goal.
    pub progress_weight: f64,
    pub step_penalty: f64,
    pub slip_weight: f64,
    /// Slip angle (rad) tolerated before the slip penalty applies.
    pub slip_tolerance: f64,
    pub instability_weight: f64,
    /// Combined `|roll| + |pitch|` (rad) tolerated in 3D mode.
    pub instability_tolerance: f64,
    pub goal_reward: f64,
    pub collision_penalty: f64,
    pub out_of_bounds_penalty: f64,
    pub invalid_state_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            progress_weight: 10.0,
            step_penalty: 0.01,
            slip_weight: 1.0,
            slip_tolerance: 0.35,
            instability_weight: 1.0,
            instability_tolerance: 0.3,
            goal_reward: 100.0,
            collision_penalty: 50.0,
            out_of_bounds_penalty: 25.0,
            invalid_state_penalty: 50.0,
        }
    }
}

impl RewardConfig {
    fn validate(&self) -> Result<()> {
        let values = [
            self.progress_weight,
            self.step_penalty,
            self.slip_weight,
            self.slip_tolerance,
            self.instability_weight,
            self.instability_tolerance,
            self.goal_reward,
            self.collision_penalty,
            self.out_of_bounds_penalty,
            self.invalid_state_penalty,
        ];
        if values.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(invalid("reward weights must be finite"))
        }
    }
}
