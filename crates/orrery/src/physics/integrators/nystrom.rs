//! Explicit Runge-Kutta-Nyström stage engine
//!
//! Gravitational accelerations are second-order in position, so a Nyström
//! scheme integrates positions with `h^2`-weighted accelerations and reaches
//! a higher order per stage than a first-order tableau applied to the full
//! state. Stage velocities are still formed because gas drag depends on
//! them.

use super::tableau::{Workspace, error_norm};
use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::math::{STATE_STRIDE, Scalar};

/// Coefficients of an explicit embedded Runge-Kutta-Nyström pair.
///
/// Stage `i` evaluates the field at
/// `Y_i = y + c_i h v + h^2 sum_j a_ij f_j` and
/// `V_i = v + h sum_j a_velocity_ij f_j`. The step is
/// `y1 = y + h v + h^2 sum_i b_i (1 - c_i) f_i`, `v1 = v + h sum_i b_i f_i`.
#[derive(Debug, Clone, Copy)]
pub struct NystromTableau {
    pub c: &'static [Scalar],
    /// Position coupling; row `i` has `i` entries summing to `c_i^2 / 2`
    pub a: &'static [&'static [Scalar]],
    /// Velocity coupling; row `i` has `i` entries summing to `c_i`
    pub a_velocity: &'static [&'static [Scalar]],
    pub b: &'static [Scalar],
    pub b_hat: &'static [Scalar],
}

impl NystromTableau {
    pub fn stages(&self) -> usize {
        self.c.len()
    }
}

/// One embedded Nyström step from the committed state of `bodies`.
///
/// The velocity term of the position update is read from the position
/// slots of `bodies.accel`, which are zero for removed bodies, so those
/// stay frozen.
pub fn nystrom_step(
    tableau: &NystromTableau,
    bodies: &BodyData,
    field: &dyn AccelerationField,
    dt: Scalar,
    workspace: &mut Workspace,
) -> Scalar {
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
    let dt2 = dt * dt;

    for s in 1..stage_count {
        let (computed, remaining) = stages.split_at_mut(s);
        let c = tableau.c[s];
        for offset in (0..n).step_by(STATE_STRIDE) {
            for component in 0..3 {
                let p = offset + component;
                let v = offset + 3 + component;

                let mut position_sum = 0.0;
                let mut velocity_sum = 0.0;
                for (j, k) in computed.iter().enumerate() {
                    position_sum += tableau.a[s][j] * k[v];
                    velocity_sum += tableau.a_velocity[s][j] * k[v];
                }

                stage_state[p] = bodies.y[p] + c * dt * bodies.accel[p] + dt2 * position_sum;
                stage_state[v] = bodies.y[v] + dt * velocity_sum;
            }
        }
        field.derivative(
            bodies.time + c * dt,
            stage_state,
            bodies,
            &mut remaining[0],
            None,
        );
        *evaluations += 1;
    }

    for offset in (0..n).step_by(STATE_STRIDE) {
        for component in 0..3 {
            let p = offset + component;
            let v = offset + 3 + component;

            let mut position_sum = 0.0;
            let mut velocity_sum = 0.0;
            let mut position_error = 0.0;
            let mut velocity_error = 0.0;
            for (i, k) in stages.iter().take(stage_count).enumerate() {
                let b = tableau.b[i];
                let delta = b - tableau.b_hat[i];
                let lever = 1.0 - tableau.c[i];
                position_sum += b * lever * k[v];
                velocity_sum += b * k[v];
                position_error += delta * lever * k[v];
                velocity_error += delta * k[v];
            }

            trial[p] = bodies.y[p] + dt * bodies.accel[p] + dt2 * position_sum;
            trial[v] = bodies.y[v] + dt * velocity_sum;
            error[p] = dt2 * position_error;
            error[v] = dt * velocity_error;
        }
    }

    error_norm(bodies, trial, error)
}
