// drift_sim/src/env.rs

use std::collections::VecDeque;
use std::ops::Range;

use crate::simulation::config::{EnvConfig, RewardConfig};
use crate::simulation::core::app_state::EpisodePhase;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::estimation::StateEstimation;
use crate::simulation::perception::{Detection, PerceptionMode, PerceptionPipeline};
use crate::simulation::scenario::Scenario;
use crate::simulation::sensors::SensorSuite;
use crate::simulation::world::obstacles::{spawn_moving_agents, Obstacle};
use drift_core::error::{DriftError, Result};
use drift_core::estimation::EstimateState;
use drift_core::models::dynamics::f110::VehicleParams;
use drift_core::models::dynamics::vehicle::F110Vehicle;
use drift_core::types::{ControlCommand, VehicleState};
use nalgebra::{DVector, Rotation2};
use serde::Serialize;
use tracing::{debug, error, info};

/// The learning-facing observation vector. Its layout is fixed at construction.
pub type Observation = DVector<f64>;

/// Why an episode terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Collision,
    OutOfBounds,
    GoalReached,
    /// The integrator produced a non-finite state; the vehicle kept its last valid state.
    InvalidState,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Collision => "collision",
            TerminationReason::OutOfBounds => "out_of_bounds",
            TerminationReason::GoalReached => "goal_reached",
            TerminationReason::InvalidState => "invalid_state",
        }
    }
}

// =========================================================================
// == Observation Layout ==
// =========================================================================

/// Index ranges of every block in the observation vector.
///
/// Blocks, in order: goal (5), state (2), uncertainty (2, noisy sensors only),
/// attitude (4, 3D only), perception (`max_detections × detection_width`) and the
/// action history (`2 × action_history_len`, most recent first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationLayout {
    pub goal: Range<usize>,
    pub state: Range<usize>,
    pub uncertainty: Option<Range<usize>>,
    pub attitude: Option<Range<usize>>,
    pub perception: Range<usize>,
    /// Features per detection slot: `rel_x, rel_y, distance, present`, then
    /// `confidence` with the perception pipeline, then `rel_vx, rel_vy` with moving agents.
    pub detection_width: usize,
    pub action_history: Range<usize>,
    pub include_confidence: bool,
    pub include_relative_velocity: bool,
}

impl ObservationLayout {
    pub const GOAL_FEATURES: usize = 5;
    pub const STATE_FEATURES: usize = 2;
    pub const UNCERTAINTY_FEATURES: usize = 2;
    pub const ATTITUDE_FEATURES: usize = 4;
    pub const BASE_DETECTION_FEATURES: usize = 4;

    pub fn new(config: &EnvConfig) -> Self {
        fn take(cursor: &mut usize, len: usize) -> Range<usize> {
            let range = *cursor..*cursor + len;
            *cursor += len;
            range
        }

        let include_confidence = config.use_perception_pipeline;
        let include_relative_velocity = config.use_moving_agents;
        let detection_width = Self::BASE_DETECTION_FEATURES
            + usize::from(include_confidence)
            + 2 * usize::from(include_relative_velocity);

        let mut cursor = 0;
        let goal = take(&mut cursor, Self::GOAL_FEATURES);
        let state = take(&mut cursor, Self::STATE_FEATURES);
        let uncertainty = config
            .use_noisy_sensors
            .then(|| take(&mut cursor, Self::UNCERTAINTY_FEATURES));
        let attitude = config
            .use_3d_dynamics
            .then(|| take(&mut cursor, Self::ATTITUDE_FEATURES));
        let perception = take(
            &mut cursor,
            config.perception.max_detections * detection_width,
        );
        let action_history = take(&mut cursor, 2 * config.action_history_len);

        Self {
            goal,
            state,
            uncertainty,
            attitude,
            perception,
            detection_width,
            action_history,
            include_confidence,
            include_relative_velocity,
        }
    }

    pub fn size(&self) -> usize {
        self.action_history.end
    }
}

// =========================================================================
// == Step Results ==
// =========================================================================

/// Diagnostics for one step. Informational only, never part of the observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    pub step: u64,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub velocity: f64,
    pub angular_velocity: f64,
    pub lateral_velocity: f64,
    pub slip_angle: f64,
    pub goal_distance: f64,
    pub scenario: &'static str,
    /// `"noisy"` or `"perfect"`.
    pub sensor_mode: &'static str,
    pub termination_reason: Option<TerminationReason>,
    /// The estimator discarded at least one correction this step.
    pub estimator_fallback: bool,
    /// The action was outside `[-1, 1]` or not finite and was clamped.
    pub action_clamped: bool,
    pub estimated_velocity: f64,
    pub estimated_angular_velocity: f64,
    pub velocity_std: f64,
    pub angular_velocity_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

// =========================================================================
// == Environment ==
// =========================================================================

/// Everything that lives for exactly one episode. Rebuilt from scratch on reset.
struct Episode {
    vehicle: F110Vehicle,
    obstacles: Vec<Obstacle>,
    sensors: SensorSuite,
    estimation: StateEstimation,
    perception: PerceptionPipeline,
    /// Normalized actions, most recent first.
    action_history: VecDeque<[f64; 2]>,
    step_count: u64,
    goal_distance: f64,
    estimate: EstimateState,
    detections: Vec<Detection>,
}

/// The drift car control loop: `reset` / `step` / `close`.
///
/// Actions are `[velocity, angular_velocity]` in `[-1, 1]`, scaled by the vehicle
/// limits. Each environment owns its RNG, so one instance per worker is all a
/// vectorized harness needs.
pub struct DriftCarEnv {
    config: EnvConfig,
    scenario: Scenario,
    vehicle_params: VehicleParams,
    layout: ObservationLayout,
    rng: SimulationRng,
    phase: EpisodePhase,
    episode: Option<Episode>,
}

impl DriftCarEnv {
    pub fn new(config: EnvConfig) -> Result<Self> {
        config.validate()?;

        let scenario = Scenario::from_kind(config.scenario);
        let vehicle_params = VehicleParams {
            enable_3d: config.use_3d_dynamics,
            friction_coefficient: config.vehicle.friction_coefficient * scenario.surface_grip,
            ..config.vehicle
        };
        vehicle_params.validate()?;

        let layout = ObservationLayout::new(&config);
        let rng = SimulationRng::from_seed(config.seed.unwrap_or(0));

        info!(
            scenario = scenario.name(),
            sensor_mode = config.sensor_mode(),
            perception = config.use_perception_pipeline,
            latency = config.use_latency,
            dynamics_3d = config.use_3d_dynamics,
            moving_agents = config.use_moving_agents,
            observation_size = layout.size(),
            "drift environment created"
        );

        Ok(Self {
            config,
            scenario,
            vehicle_params,
            layout,
            rng,
            phase: EpisodePhase::Init,
            episode: None,
        })
    }

    /// Starts a new episode. A seed restarts the random stream; without one the stream
    /// continues from the previous episode.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<(Observation, StepInfo)> {
        if let Some(seed) = seed {
            self.rng = SimulationRng::from_seed(seed);
        }

        let episode = self.build_episode()?;
        let observation = observe(
            &self.layout,
            &self.scenario,
            &self.vehicle_params,
            &episode,
        );
        let info = describe(&self.config, &self.scenario, &episode, None, false);

        info!(
            scenario = self.scenario.name(),
            ?seed,
            obstacles = episode.obstacles.len(),
            "episode reset"
        );
        self.episode = Some(episode);
        self.phase = EpisodePhase::Running;
        Ok((observation, info))
    }

    /// Advances the episode by one control period.
    ///
    /// Fails only on caller errors: stepping outside `Running`, or an action that is not
    /// two components long. Out-of-range values are clamped.
    pub fn step(&mut self, action: &[f64]) -> Result<StepOutcome> {
        let episode = match (self.phase, self.episode.as_mut()) {
            (EpisodePhase::Running, Some(episode)) => episode,
            (phase, _) => {
                return Err(DriftError::InvalidTransition {
                    phase: phase.as_str(),
                })
            }
        };
        if action.len() != 2 {
            return Err(DriftError::InvalidAction(format!(
                "expected 2 components [velocity, angular_velocity], got {}",
                action.len()
            )));
        }

        let (normalized, action_clamped) = normalize_action(action);
        if action_clamped {
            debug!(?action, ?normalized, "action clamped into bounds");
        }
        let params = &self.vehicle_params;
        let command = ControlCommand::new(
            normalized[0] * params.max_velocity,
            normalized[1] * params.max_angular_velocity,
        );

        // --- 1. Moving agents ---
        for obstacle in episode.obstacles.iter_mut() {
            obstacle.advance(params.dt, &self.scenario.bounds);
        }

        // --- 2. Dynamics ---
        let dynamics = episode.vehicle.step(command.velocity, command.angular_velocity);
        episode.step_count += 1;
        episode.action_history.pop_back();
        episode.action_history.push_front(normalized);

        let (reward, reason) = match dynamics {
            Ok(truth) => {
                let timestamp = episode.vehicle.time();

                // --- 3. Sensors ---
                let measurements = episode.sensors.sense_all(
                    &truth,
                    timestamp,
                    episode.step_count,
                    self.rng.as_dyn(),
                );

                // --- 4. Estimation ---
                episode.estimate = episode.estimation.step(
                    params.dt,
                    &command,
                    &truth,
                    timestamp,
                    &measurements,
                );

                // --- 5. Perception ---
                episode.detections =
                    episode
                        .perception
                        .perceive(&episode.obstacles, &truth, self.rng.as_dyn());

                // --- 6. Reward and termination ---
                let goal_distance = (self.scenario.goal - truth.position()).norm();
                let reason = check_termination(
                    &self.scenario,
                    &episode.obstacles,
                    self.config.vehicle_radius,
                    &truth,
                    goal_distance,
                );
                let reward = compute_reward(
                    &self.config.reward,
                    episode.goal_distance - goal_distance,
                    &truth,
                    params.enable_3d,
                    reason,
                );
                episode.goal_distance = goal_distance;
                (reward, reason)
            }
            Err(err) => {
                error!(error = %err, step = episode.step_count, "vehicle state invalid, ending episode");
                let reason = Some(TerminationReason::InvalidState);
                (terminal_reward(&self.config.reward, reason), reason)
            }
        };

        let terminated = reason.is_some();
        let truncated = !terminated && episode.step_count >= self.config.max_steps;
        self.phase = if terminated {
            EpisodePhase::Terminated
        } else if truncated {
            EpisodePhase::Truncated
        } else {
            EpisodePhase::Running
        };

        let observation = observe(&self.layout, &self.scenario, params, episode);
        let info = describe(
            &self.config,
            &self.scenario,
            episode,
            reason,
            action_clamped,
        );

        if let Some(reason) = reason {
            info!(
                reason = reason.as_str(),
                step = episode.step_count,
                x = info.x,
                y = info.y,
                "episode terminated"
            );
        } else if truncated {
            info!(step = episode.step_count, "episode truncated at step budget");
        }
        debug!(step = episode.step_count, reward, "step complete");

        Ok(StepOutcome {
            observation,
            reward,
            terminated,
            truncated,
            info,
        })
    }

    /// Drops the episode and returns to `Init`.
    pub fn close(&mut self) {
        if self.episode.take().is_some() {
            info!(scenario = self.scenario.name(), "environment closed");
        }
        self.phase = EpisodePhase::Init;
    }

    // --- Accessors ---

    pub fn observation_size(&self) -> usize {
        self.layout.size()
    }

    pub fn observation_layout(&self) -> &ObservationLayout {
        &self.layout
    }

    /// Lower and upper bounds of each action component.
    pub fn action_bounds(&self) -> ([f64; 2], [f64; 2]) {
        ([-1.0, -1.0], [1.0, 1.0])
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Vehicle parameters after applying the scenario surface and the 3D flag.
    pub fn vehicle_params(&self) -> &VehicleParams {
        &self.vehicle_params
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn vehicle_state(&self) -> Option<&VehicleState> {
        self.episode.as_ref().map(|e| e.vehicle.state())
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        self.episode.as_ref().map_or(&[], |e| e.obstacles.as_slice())
    }

    pub fn detections(&self) -> &[Detection] {
        self.episode.as_ref().map_or(&[], |e| e.detections.as_slice())
    }

    pub fn estimate(&self) -> Option<EstimateState> {
        self.episode.as_ref().map(|e| e.estimate)
    }

    pub fn step_count(&self) -> u64 {
        self.episode.as_ref().map_or(0, |e| e.step_count)
    }

    // --- Internals ---

    fn build_episode(&mut self) -> Result<Episode> {
        let config = &self.config;

        let mut vehicle = F110Vehicle::new(self.vehicle_params)?;
        let (x, y, theta) = self.scenario.start;
        vehicle.reset(x, y, theta)?;

        let mut obstacles = self.scenario.obstacles.clone();
        if config.use_moving_agents {
            let agents = spawn_moving_agents(
                &config.moving_agents,
                &self.scenario,
                obstacles.len(),
                &obstacles,
                self.rng.as_dyn(),
            );
            obstacles.extend(agents);
        }

        let sensors = SensorSuite::new(&config.sensors, config.use_noisy_sensors, config.use_latency)?;
        let estimation = if config.use_noisy_sensors {
            StateEstimation::filtered(&config.estimator, &config.sensors, &self.vehicle_params)?
        } else {
            StateEstimation::perfect()
        };
        let mode = if config.use_perception_pipeline {
            PerceptionMode::Noisy
        } else {
            PerceptionMode::Perfect
        };
        let perception = PerceptionPipeline::new(&config.perception, mode);

        let truth = *vehicle.state();
        let estimate = estimation.initial(&truth);
        let detections = perception.perceive(&obstacles, &truth, self.rng.as_dyn());
        let goal_distance = (self.scenario.goal - truth.position()).norm();

        Ok(Episode {
            vehicle,
            obstacles,
            sensors,
            estimation,
            perception,
            action_history: VecDeque::from(vec![[0.0; 2]; config.action_history_len]),
            step_count: 0,
            goal_distance,
            estimate,
            detections,
        })
    }
}

fn describe(
    config: &EnvConfig,
    scenario: &Scenario,
    episode: &Episode,
    termination_reason: Option<TerminationReason>,
    action_clamped: bool,
) -> StepInfo {
    let truth = episode.vehicle.state();
    let estimate = &episode.estimate;
    StepInfo {
        step: episode.step_count,
        x: truth.x,
        y: truth.y,
        theta: truth.theta,
        velocity: truth.velocity,
        angular_velocity: truth.angular_velocity,
        lateral_velocity: truth.lateral_velocity,
        slip_angle: truth.slip_angle(),
        goal_distance: episode.goal_distance,
        scenario: scenario.name(),
        sensor_mode: config.sensor_mode(),
        termination_reason,
        estimator_fallback: estimate.fallback_used,
        action_clamped,
        estimated_velocity: estimate.velocity,
        estimated_angular_velocity: estimate.angular_velocity,
        velocity_std: estimate.velocity_std,
        angular_velocity_std: estimate.angular_velocity_std,
    }
}

/// Clamps each component into `[-1, 1]`; non-finite components become 0.
fn normalize_action(action: &[f64]) -> ([f64; 2], bool) {
    let mut normalized = [0.0; 2];
    let mut clamped = false;
    for (out, value) in normalized.iter_mut().zip(action) {
        *out = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        clamped |= *out != *value;
    }
    (normalized, clamped)
}

fn check_termination(
    scenario: &Scenario,
    obstacles: &[Obstacle],
    vehicle_radius: f64,
    truth: &VehicleState,
    goal_distance: f64,
) -> Option<TerminationReason> {
    let position = truth.position();
    if obstacles
        .iter()
        .any(|o| (o.position - position).norm() < o.radius + vehicle_radius)
    {
        Some(TerminationReason::Collision)
    } else if !scenario.bounds.contains(&position) {
        Some(TerminationReason::OutOfBounds)
    } else if goal_distance < scenario.goal_radius {
        Some(TerminationReason::GoalReached)
    } else {
        None
    }
}

fn compute_reward(
    config: &RewardConfig,
    progress: f64,
    truth: &VehicleState,
    attitude: bool,
    reason: Option<TerminationReason>,
) -> f64 {
    let mut reward = config.progress_weight * progress - config.step_penalty;
    reward -= config.slip_weight * (truth.slip_angle().abs() - config.slip_tolerance).max(0.0);
    if attitude {
        let tilt = truth.roll.abs() + truth.pitch.abs();
        reward -= config.instability_weight * (tilt - config.instability_tolerance).max(0.0);
    }
    reward + terminal_reward(config, reason)
}

fn terminal_reward(config: &RewardConfig, reason: Option<TerminationReason>) -> f64 {
    match reason {
        None => 0.0,
        Some(TerminationReason::GoalReached) => config.goal_reward,
        Some(TerminationReason::Collision) => -config.collision_penalty,
        Some(TerminationReason::OutOfBounds) => -config.out_of_bounds_penalty,
        Some(TerminationReason::InvalidState) => -config.invalid_state_penalty,
    }
}

fn observe(
    layout: &ObservationLayout,
    scenario: &Scenario,
    params: &VehicleParams,
    episode: &Episode,
) -> Observation {
    fn write(obs: &mut Observation, start: usize, values: &[f64]) {
        for (i, v) in values.iter().enumerate() {
            obs[start + i] = *v;
        }
    }

    let mut obs = Observation::zeros(layout.size());
    let truth = episode.vehicle.state();
    let estimate = &episode.estimate;

    // --- Goal, from the true pose ---
    let scale = scenario.distance_scale();
    let offset = scenario.goal - truth.position();
    let ego = Rotation2::new(-truth.theta) * offset;
    let bearing = ego.y.atan2(ego.x);
    write(
        &mut obs,
        layout.goal.start,
        &[
            ego.x / scale,
            ego.y / scale,
            bearing.sin(),
            bearing.cos(),
            offset.norm() / scale,
        ],
    );

    // --- Control-loop state ---
    write(
        &mut obs,
        layout.state.start,
        &[
            estimate.velocity / params.max_velocity,
            estimate.angular_velocity / params.max_angular_velocity,
        ],
    );
    if let Some(range) = &layout.uncertainty {
        write(
            &mut obs,
            range.start,
            &[
                estimate.velocity_std / params.max_velocity,
                estimate.angular_velocity_std / params.max_angular_velocity,
            ],
        );
    }
    if let Some(range) = &layout.attitude {
        write(
            &mut obs,
            range.start,
            &[truth.pitch, truth.roll, truth.pitch_rate, truth.roll_rate],
        );
    }

    // --- Perception ---
    let range_scale = episode.perception.sensing_range();
    for (slot, det) in episode.detections.iter().enumerate() {
        let start = layout.perception.start + slot * layout.detection_width;
        let mut features = vec![
            det.rel_x / range_scale,
            det.rel_y / range_scale,
            if det.present {
                det.range / range_scale
            } else {
                1.0
            },
            if det.present { 1.0 } else { 0.0 },
        ];
        if layout.include_confidence {
            features.push(det.confidence);
        }
        if layout.include_relative_velocity {
            features.push(det.rel_vx / params.max_velocity);
            features.push(det.rel_vy / params.max_velocity);
        }
        write(&mut obs, start, &features);
    }

    // --- Action history ---
    for (i, action) in episode.action_history.iter().enumerate() {
        write(&mut obs, layout.action_history.start + 2 * i, action);
    }

    obs
}
