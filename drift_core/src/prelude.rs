// drift_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::estimation::StateEstimator;
pub use crate::models::dynamics::Dynamics;
pub use crate::models::estimation::dynamics::EstimationDynamics;
pub use crate::models::estimation::measurement::MeasurementModel;
pub use crate::utils::integrators::{IntegrationScheme, Integrator};

// --- Core Data Structures ---
pub use crate::error::{DriftError, Result};
pub use crate::estimation::state::{FilterState, StateVariable};
pub use crate::estimation::{EstimateState, FilterContext};
pub use crate::messages::{MeasurementData, MeasurementMessage, SensorKind};
pub use crate::types::{Control, ControlCommand, State, VehicleState};

// --- Concrete Implementations ---
pub use crate::estimation::filters::ekf::ExtendedKalmanFilter;
pub use crate::models::dynamics::f110::{F110SlipModel, VehicleParams};
pub use crate::models::dynamics::vehicle::F110Vehicle;
pub use crate::models::estimation::dynamics::actuator::FirstOrderActuatorModel;
pub use crate::models::estimation::measurement::imu::ImuModel;
pub use crate::models::estimation::measurement::odometry::OdometryModel;
pub use crate::models::estimation::measurement::velocity::VelocityModel;
pub use crate::utils::angles::{angle_diff, wrap_angle};
