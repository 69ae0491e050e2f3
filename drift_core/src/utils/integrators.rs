// drift_core/src/utils/integrators.rs

use nalgebra::DVector;
use serde::Deserialize;

/// A fixed-step explicit integrator for autonomous systems `x_dot = f(x)`.
///
/// The control input is held constant over the step, so callers capture it in `func`.
pub trait Integrator {
    fn step(
        &self,
        func: &dyn Fn(&DVector<f64>) -> DVector<f64>,
        x0: &DVector<f64>,
        dt: f64,
    ) -> DVector<f64>;

    /// Global error order of the method.
    fn order(&self) -> u32;
}

// Runge-Kutta methods
#[derive(Debug, Default, Clone, Copy)]
pub struct RK1;

impl Integrator for RK1 {
    fn step(
        &self,
        func: &dyn Fn(&DVector<f64>) -> DVector<f64>,
        x0: &DVector<f64>,
        dt: f64,
    ) -> DVector<f64> {
        x0 + func(x0) * dt // Euler's method
    }

    fn order(&self) -> u32 {
        1
    }
}

/// Heun's method (explicit trapezoid).
#[derive(Debug, Default, Clone, Copy)]
pub struct RK2;

impl Integrator for RK2 {
    fn step(
        &self,
        func: &dyn Fn(&DVector<f64>) -> DVector<f64>,
        x0: &DVector<f64>,
        dt: f64,
    ) -> DVector<f64> {
        let k1 = func(x0);
        let k2 = func(&(x0 + &k1 * dt));

        x0 + (k1 + k2) * (0.5 * dt)
    }

    fn order(&self) -> u32 {
        2
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl Integrator for RK4 {
    fn step(
        &self,
        func: &dyn Fn(&DVector<f64>) -> DVector<f64>,
        x0: &DVector<f64>,
        dt: f64,
    ) -> DVector<f64> {
        let half_dt = 0.5 * dt;

        let k1 = func(x0);
        let k2 = func(&(x0 + &k1 * half_dt));
        let k3 = func(&(x0 + &k2 * half_dt));
        let k4 = func(&(x0 + &k3 * dt));

        x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
    }

    fn order(&self) -> u32 {
        4
    }
}

/// Selects the integrator used by the vehicle dynamics.
///
/// | scheme | local error | global error |
/// |---|---|---|
/// | `Euler` | O(dt²) | O(dt) |
/// | `Heun` | O(dt³) | O(dt²) |
/// | `Rk4` | O(dt⁵) | O(dt⁴) |
///
/// All three are explicit and stay stable for the 0.01–0.1 s steps used here because
/// the stiffest mode of the vehicle model (the yaw-rate lag) has a time constant of
/// 0.1 s or more, and the 3D attitude modes are critically damped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScheme {
    Euler,
    #[default]
    Heun,
    Rk4,
}

impl IntegrationScheme {
    pub fn integrator(&self) -> &'static dyn Integrator {
        match self {
            IntegrationScheme::Euler => &RK1,
            IntegrationScheme::Heun => &RK2,
            IntegrationScheme::Rk4 => &RK4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // x_dot = -x, exact solution x0 * exp(-t)
    fn decay(x: &DVector<f64>) -> DVector<f64> {
        -x
    }

    fn integrate(integrator: &dyn Integrator, dt: f64, t_end: f64) -> f64 {
        let steps = (t_end / dt).round() as usize;
        let mut x = DVector::from_vec(vec![1.0]);
        for _ in 0..steps {
            x = integrator.step(&decay, &x, dt);
        }
        x[0]
    }

    #[test]
    fn higher_order_methods_are_more_accurate() {
        let exact = (-1.0_f64).exp();
        let e1 = (integrate(&RK1, 0.05, 1.0) - exact).abs();
        let e2 = (integrate(&RK2, 0.05, 1.0) - exact).abs();
        let e4 = (integrate(&RK4, 0.05, 1.0) - exact).abs();
        assert!(e2 < e1);
        assert!(e4 < e2);
        assert_abs_diff_eq!(integrate(&RK4, 0.05, 1.0), exact, epsilon = 1e-7);
    }

    #[test]
    fn heun_error_shrinks_quadratically() {
        let exact = (-1.0_f64).exp();
        let coarse = (integrate(&RK2, 0.1, 1.0) - exact).abs();
        let fine = (integrate(&RK2, 0.05, 1.0) - exact).abs();
        let ratio = coarse / fine;
        assert!(ratio > 3.5 && ratio < 4.5, "ratio was {ratio}");
    }

    #[test]
    fn scheme_reports_its_order() {
        assert_eq!(IntegrationScheme::Euler.integrator().order(), 1);
        assert_eq!(IntegrationScheme::default().integrator().order(), 2);
        assert_eq!(IntegrationScheme::Rk4.integrator().order(), 4);
    }
}
