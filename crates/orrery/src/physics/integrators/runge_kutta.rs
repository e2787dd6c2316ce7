//! Classic fourth-order Runge-Kutta method

use super::tableau::{ButcherTableau, Workspace, explicit_step};
use super::Integrator;
use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::math::Scalar;

pub const RK4_TABLEAU: ButcherTableau = ButcherTableau {
    c: &[0.0, 0.5, 0.5, 1.0],
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    b_hat: None,
};

/// Fourth-order Runge-Kutta integrator (RK4)
///
/// A fixed-step method: every step is accepted and the step size never
/// changes, so accuracy is controlled by the configured initial step alone.
///
/// The RK4 algorithm:
/// 1. k1 = f(t, y)
/// 2. k2 = f(t + dt/2, y + k1*dt/2)
/// 3. k3 = f(t + dt/2, y + k2*dt/2)
/// 4. k4 = f(t + dt, y + k3*dt)
/// 5. y(t+dt) = y(t) + dt/6 * (k1 + 2*k2 + 2*k3 + k4)
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKuttaFourthOrder;

impl Integrator for RungeKuttaFourthOrder {
    fn clone_box(&self) -> Box<dyn Integrator> {
        Box::new(*self)
    }

    fn step(
        &self,
        bodies: &BodyData,
        field: &dyn AccelerationField,
        dt: Scalar,
        workspace: &mut Workspace,
    ) -> Option<Scalar> {
        explicit_step(&RK4_TABLEAU, bodies, field, dt, workspace)
    }

    fn order(&self) -> usize {
        4
    }

    fn stages(&self) -> usize {
        RK4_TABLEAU.stages()
    }

    fn name(&self) -> &str {
        "runge_kutta_fourth_order"
    }
}
