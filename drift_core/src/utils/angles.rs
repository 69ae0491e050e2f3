// drift_core/src/utils/angles.rs

use num_traits::{Float, FloatConst};

/// Wraps an angle into the canonical heading range `(-π, π]`.
pub fn wrap_angle<T: Float + FloatConst>(angle: T) -> T {
    let two_pi = T::TAU();
    let mut wrapped = angle % two_pi;
    if wrapped > T::PI() {
        wrapped = wrapped - two_pi;
    } else if wrapped <= -T::PI() {
        wrapped = wrapped + two_pi;
    }
    wrapped
}

/// Signed smallest difference `a - b`, wrapped.
pub fn angle_diff<T: Float + FloatConst>(a: T, b: T) -> T {
    wrap_angle(a - b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrap_keeps_canonical_values() {
        assert_abs_diff_eq!(wrap_angle(0.5_f64), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-0.5_f64), -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn wrap_maps_boundaries_into_half_open_range() {
        assert_abs_diff_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(3.0 * PI + 0.5), -PI + 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(wrap_angle(2.0 * PI + 0.25), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-2.0 * PI - 0.25), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn wrap_handles_many_turns() {
        for k in -20..20 {
            let a = wrap_angle(0.3_f64 + k as f64 * 2.0 * PI);
            assert!(a > -PI && a <= PI);
            assert_abs_diff_eq!(a, 0.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn diff_takes_short_way_around() {
        assert_abs_diff_eq!(angle_diff(PI - 0.1, -PI + 0.1), -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(angle_diff(0.2_f64, -0.2), 0.4, epsilon = 1e-12);
    }
}
