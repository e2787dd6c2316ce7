//! Generic explicit Runge-Kutta stage engine

use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::math::{STATE_STRIDE, Scalar};

/// Coefficients of an explicit Runge-Kutta method, optionally with an
/// embedded companion solution.
#[derive(Debug, Clone, Copy)]
pub struct ButcherTableau {
    pub c: &'static [Scalar],
    /// Strictly lower triangular; row `i` has `i` entries
    pub a: &'static [&'static [Scalar]],
    /// Weights of the propagated solution
    pub b: &'static [Scalar],
    /// Weights of the companion solution used for the error estimate
    pub b_hat: Option<&'static [Scalar]>,
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.c.len()
    }
}

/// Scratch buffers reused across steps.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub(super) stages: Vec<Vec<Scalar>>,
    pub(super) stage_state: Vec<Scalar>,
    /// Candidate state of the last step
    pub trial: Vec<Scalar>,
    /// Componentwise local error of the last step
    pub error: Vec<Scalar>,
    /// Derivative evaluations performed so far
    pub evaluations: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn prepare(&mut self, stages: usize, len: usize) {
        if self.stages.len() < stages {
            self.stages.resize_with(stages, Vec::new);
        }
        for stage in &mut self.stages {
            stage.resize(len, 0.0);
        }
        self.stage_state.resize(len, 0.0);
        self.trial.resize(len, 0.0);
        self.error.resize(len, 0.0);
    }
}

/// One explicit step of `tableau` from the committed state of `bodies`.
///
/// The first stage reuses `bodies.accel`. Returns the normalized error
/// when the tableau is embedded.
pub fn explicit_step(
    tableau: &ButcherTableau,
    bodies: &BodyData,
    field: &dyn AccelerationField,
    dt: Scalar,
    workspace: &mut Workspace,
) -> Option<Scalar> {
    let n = bodies.y.len();
    let stage_count = tableau.stages();
    workspace.prepare(stage_count, n);

    let Workspace {
        stages,
        stage_state,
        trial,
        error,
        evaluations,
    } = workspace;

    stages[0].copy_from_slice(&bodies.accel);

    for s in 1..stage_count {
        let (computed, remaining) = stages.split_at_mut(s);
        stage_state.copy_from_slice(&bodies.y);
        for (k, &a) in computed.iter().zip(tableau.a[s]) {
            if a != 0.0 {
                let weight = dt * a;
                for (value, derivative) in stage_state.iter_mut().zip(k) {
                    *value += weight * derivative;
                }
            }
        }
        field.derivative(
            bodies.time + tableau.c[s] * dt,
            stage_state,
            bodies,
            &mut remaining[0],
            None,
        );
        *evaluations += 1;
    }

    trial.copy_from_slice(&bodies.y);
    for (k, &b) in stages.iter().zip(tableau.b) {
        if b != 0.0 {
            let weight = dt * b;
            for (value, derivative) in trial.iter_mut().zip(k) {
                *value += weight * derivative;
            }
        }
    }

    match tableau.b_hat {
        Some(b_hat) => {
            error.fill(0.0);
            for ((k, &b), &b_hat) in stages.iter().zip(tableau.b).zip(b_hat) {
                let weight = dt * (b - b_hat);
                if weight != 0.0 {
                    for (value, derivative) in error.iter_mut().zip(k) {
                        *value += weight * derivative;
                    }
                }
            }
            Some(error_norm(bodies, trial, error))
        }
        None => {
            error.fill(0.0);
            None
        }
    }
}

/// Largest local error over the active bodies, with position errors
/// relative to the largest position magnitude and velocity errors relative
/// to the largest speed of the system.
pub fn error_norm(bodies: &BodyData, trial: &[Scalar], error: &[Scalar]) -> Scalar {
    let mut length_scale: Scalar = 0.0;
    let mut speed_scale: Scalar = 0.0;
    let mut position_error: Scalar = 0.0;
    let mut velocity_error: Scalar = 0.0;

    for i in bodies.active_indices() {
        let offset = i * STATE_STRIDE;
        for component in 0..3 {
            let p = offset + component;
            let v = offset + 3 + component;
            length_scale = length_scale.max(bodies.y[p].abs()).max(trial[p].abs());
            speed_scale = speed_scale.max(bodies.y[v].abs()).max(trial[v].abs());
            position_error = position_error.max(error[p].abs());
            velocity_error = velocity_error.max(error[v].abs());
        }
    }

    let relative = |err: Scalar, scale: Scalar| {
        if scale > 0.0 { err / scale } else { err }
    };

    relative(position_error, length_scale).max(relative(velocity_error, speed_scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All tableaus must be consistent: row sums of `a` equal `c` and every
    /// weight vector sums to one.
    pub(crate) fn assert_consistent(tableau: &ButcherTableau) {
        assert_eq!(tableau.a.len(), tableau.stages());
        assert_eq!(tableau.b.len(), tableau.stages());

        for (i, row) in tableau.a.iter().enumerate() {
            assert_eq!(row.len(), i, "row {i} has the wrong length");
            let sum: Scalar = row.iter().sum();
            assert!(
                (sum - tableau.c[i]).abs() < 1e-13,
                "row {i} sums to {sum}, expected {}",
                tableau.c[i]
            );
        }

        let b_sum: Scalar = tableau.b.iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-13);

        if let Some(b_hat) = tableau.b_hat {
            assert_eq!(b_hat.len(), tableau.stages());
            let sum: Scalar = b_hat.iter().sum();
            assert!((sum - 1.0).abs() < 1e-13);
        }
    }

    #[test]
    fn test_shipped_tableaus_are_consistent() {
        assert_consistent(&crate::physics::integrators::runge_kutta::RK4_TABLEAU);
        assert_consistent(&crate::physics::integrators::runge_kutta_fehlberg::RKF78_TABLEAU);
    }
}
