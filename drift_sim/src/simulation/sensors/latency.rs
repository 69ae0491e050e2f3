// drift_sim/src/simulation/sensors/latency.rs

use drift_core::messages::MeasurementMessage;
use std::collections::VecDeque;

/// Fixed-capacity delay line owned by one sensor.
///
/// A message pushed at step `t` comes back out at step `t + delay`. With `delay == 0`
/// it is a pass-through.
///
/// During warm-up, before any message is `delay` steps old, the buffer returns the
/// oldest buffered message, not the most recent one. The most recent one would be an
/// undelayed reading, and the next due message would then carry an older timestamp.
/// Returning the oldest keeps timestamps monotone, and the estimator skips the repeats.
#[derive(Debug, Clone)]
pub struct LatencyBuffer {
    delay: usize,
    buffer: VecDeque<MeasurementMessage>,
}

impl LatencyBuffer {
    pub fn new(delay: usize) -> Self {
        Self {
            delay,
            buffer: VecDeque::with_capacity(delay + 1),
        }
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Stores the fresh message and returns the one due now.
    pub fn push(&mut self, message: MeasurementMessage) -> MeasurementMessage {
        if self.delay == 0 {
            return message;
        }
        self.buffer.push_back(message);
        if self.buffer.len() > self.delay {
            if let Some(due) = self.buffer.pop_front() {
                return due;
            }
        }
        // Not yet `delay` messages old: repeat the oldest one.
        self.buffer[0].clone()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::messages::{MeasurementData, SensorKind};

    fn message(step: u64) -> MeasurementMessage {
        MeasurementMessage {
            sensor: SensorKind::Velocity,
            timestamp: step as f64 * 0.05,
            step,
            data: MeasurementData::Velocity { speed: step as f64 },
            noise_stddev: vec![0.0],
        }
    }

    #[test]
    fn zero_delay_passes_through() {
        let mut buffer = LatencyBuffer::new(0);
        for step in 0..5 {
            assert_eq!(buffer.push(message(step)).step, step);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn messages_come_out_delay_steps_later() {
        let mut buffer = LatencyBuffer::new(3);
        let out: Vec<u64> = (0..8).map(|step| buffer.push(message(step)).step).collect();
        assert_eq!(out, vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(buffer.len() <= 3);
    }

    #[test]
    fn warm_up_repeats_the_oldest_not_the_newest() {
        let mut buffer = LatencyBuffer::new(2);
        assert_eq!(buffer.push(message(5)).step, 5);
        // Newest is 6, but nothing is two steps old yet.
        assert_eq!(buffer.push(message(6)).step, 5);
        assert_eq!(buffer.push(message(7)).step, 5);
        assert_eq!(buffer.push(message(8)).step, 6);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut buffer = LatencyBuffer::new(2);
        let mut last = f64::NEG_INFINITY;
        for step in 0..20 {
            let out = buffer.push(message(step));
            assert!(out.timestamp >= last);
            last = out.timestamp;
        }
    }
}
