// drift_core/src/messages.rs

use nalgebra::DVector;
use serde::Serialize;
use std::fmt;

/// The sensors carried by the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Imu,
    Velocity,
    Odometry,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Imu => "imu",
            SensorKind::Velocity => "velocity",
            SensorKind::Odometry => "odometry",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// A self-describing container for one reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MeasurementData {
    /// Body-frame specific force in the plane plus the gyro yaw rate.
    Imu {
        longitudinal_accel: f64,
        lateral_accel: f64,
        yaw_rate: f64,
    },
    /// Signed planar speed (negative when reversing).
    Velocity { speed: f64 },
    /// Pose change over `dt`, expressed in the body frame of the previous pose.
    Odometry {
        dx: f64,
        dy: f64,
        dtheta: f64,
        dt: f64,
    },
}

impl MeasurementData {
    pub fn kind(&self) -> SensorKind {
        match self {
            MeasurementData::Imu { .. } => SensorKind::Imu,
            MeasurementData::Velocity { .. } => SensorKind::Velocity,
            MeasurementData::Odometry { .. } => SensorKind::Odometry,
        }
    }

    /// Raw channels in their natural order.
    pub fn channels(&self) -> DVector<f64> {
        match *self {
            MeasurementData::Imu {
                longitudinal_accel,
                lateral_accel,
                yaw_rate,
            } => DVector::from_vec(vec![longitudinal_accel, lateral_accel, yaw_rate]),
            MeasurementData::Velocity { speed } => DVector::from_vec(vec![speed]),
            MeasurementData::Odometry { dx, dy, dtheta, .. } => {
                DVector::from_vec(vec![dx, dy, dtheta])
            }
        }
    }
}

/// The message every sensor publishes.
///
/// It carries the per-channel standard deviations used to generate it, so a run can
/// be audited and replayed under the same seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementMessage {
    pub sensor: SensorKind,
    /// Simulation time at which the reading was generated, in seconds.
    pub timestamp: f64,
    /// Simulation step at which the reading was generated.
    pub step: u64,
    pub data: MeasurementData,
    /// Zero for every channel in perfect-sensor mode.
    pub noise_stddev: Vec<f64>,
}

impl MeasurementMessage {
    pub fn is_perfect(&self) -> bool {
        self.noise_stddev.iter().all(|s| *s == 0.0)
    }
}
