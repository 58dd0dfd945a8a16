//! Equations of motion for the planar double pendulum and a fixed-step RK4
//! integrator over them.
//!
//! Nothing here guards against the singular denominator or non-finite
//! values. Degenerate trajectories are allowed to produce NaN/Inf, which the
//! chaos map treats as maximal divergence.

use crate::types::{PendulumState, PhysicsParams};

/// Time derivative of `state`: `(omega1, omega2, alpha1, alpha2)` packed into
/// the same four slots as the state itself.
pub fn derivatives(state: &PendulumState, params: &PhysicsParams) -> PendulumState {
    let PhysicsParams { l1, l2, m1, m2, g } = *params;
    let PendulumState {
        theta1,
        theta2,
        omega1,
        omega2,
    } = *state;

    let delta = theta1 - theta2;
    let sin_delta = delta.sin();
    let cos_delta = delta.cos();
    let den = 2.0 * m1 + m2 - m2 * (2.0 * theta1 - 2.0 * theta2).cos();

    let alpha1 = (-g * (2.0 * m1 + m2) * theta1.sin()
        - m2 * g * (theta1 - 2.0 * theta2).sin()
        - 2.0 * sin_delta * m2 * (omega2 * omega2 * l2 + omega1 * omega1 * l1 * cos_delta))
        / (l1 * den);

    let alpha2 = (2.0
        * sin_delta
        * (omega1 * omega1 * l1 * (m1 + m2)
            + g * (m1 + m2) * theta1.cos()
            + omega2 * omega2 * l2 * m2 * cos_delta))
        / (l2 * den);

    PendulumState {
        theta1: omega1,
        theta2: omega2,
        omega1: alpha1,
        omega2: alpha2,
    }
}

fn offset(state: &PendulumState, k: &PendulumState, h: f64) -> PendulumState {
    PendulumState {
        theta1: state.theta1 + h * k.theta1,
        theta2: state.theta2 + h * k.theta2,
        omega1: state.omega1 + h * k.omega1,
        omega2: state.omega2 + h * k.omega2,
    }
}

/// Advance `state` by one classical Runge-Kutta step of size `dt`.
pub fn step(state: &PendulumState, params: &PhysicsParams, dt: f64) -> PendulumState {
    let half = dt / 2.0;
    let sixth = dt / 6.0;

    let k1 = derivatives(state, params);
    let k2 = derivatives(&offset(state, &k1, half), params);
    let k3 = derivatives(&offset(state, &k2, half), params);
    let k4 = derivatives(&offset(state, &k3, dt), params);

    let combine = |s: f64, a: f64, b: f64, c: f64, d: f64| s + sixth * (a + 2.0 * b + 2.0 * c + d);

    PendulumState {
        theta1: combine(state.theta1, k1.theta1, k2.theta1, k3.theta1, k4.theta1),
        theta2: combine(state.theta2, k1.theta2, k2.theta2, k3.theta2, k4.theta2),
        omega1: combine(state.omega1, k1.omega1, k2.omega1, k3.omega1, k4.omega1),
        omega2: combine(state.omega2, k1.omega2, k2.omega2, k3.omega2, k4.omega2),
    }
}

pub fn kinetic_energy(state: &PendulumState, params: &PhysicsParams) -> f64 {
    let PhysicsParams { l1, l2, m1, m2, .. } = *params;
    let w1 = state.omega1;
    let w2 = state.omega2;
    0.5 * (m1 + m2) * l1 * l1 * w1 * w1
        + 0.5 * m2 * l2 * l2 * w2 * w2
        + m2 * l1 * l2 * w1 * w2 * (state.theta1 - state.theta2).cos()
}

/// Gravitational potential with the pivot as reference height.
pub fn potential_energy(state: &PendulumState, params: &PhysicsParams) -> f64 {
    let PhysicsParams { l1, l2, m1, m2, g } = *params;
    -(m1 + m2) * g * l1 * state.theta1.cos() - m2 * g * l2 * state.theta2.cos()
}

pub fn total_energy(state: &PendulumState, params: &PhysicsParams) -> f64 {
    kinetic_energy(state, params) + potential_energy(state, params)
}
