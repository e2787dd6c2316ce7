//! Explicit Runge-Kutta integrators for the N-body state
//!
//! Every integrator is described by a Butcher tableau, or by a Nyström
//! tableau for the second-order pair. Fixed-order methods always accept
//! their step; embedded pairs also return a normalized error estimate that
//! the driver compares against the requested tolerance.

use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::math::Scalar;

pub mod dormand_prince;
pub mod nystrom;
pub mod registry;
pub mod runge_kutta;
pub mod runge_kutta_fehlberg;
pub mod tableau;

pub use dormand_prince::DormandPrince76;
pub use runge_kutta::RungeKuttaFourthOrder;
pub use runge_kutta_fehlberg::RungeKuttaFehlberg78;
pub use nystrom::NystromTableau;
pub use tableau::{ButcherTableau, Workspace};

/// Single-step primitive shared by all integrators.
pub trait Integrator: Send + Sync {
    /// Clone the integrator into a box
    fn clone_box(&self) -> Box<dyn Integrator>;

    /// Advances the committed state of `bodies` by `dt` into
    /// `workspace.trial`, leaving `bodies` untouched.
    ///
    /// `bodies.accel` must hold the derivative at the committed state.
    /// Returns the normalized error estimate of the step, or `None` when the
    /// method has no embedded companion.
    fn step(
        &self,
        bodies: &BodyData,
        field: &dyn AccelerationField,
        dt: Scalar,
        workspace: &mut Workspace,
    ) -> Option<Scalar>;

    /// Order of the propagated solution
    fn order(&self) -> usize;

    /// Order of the lower member of an embedded pair, which sets the step
    /// adaptation exponent
    fn error_order(&self) -> Option<usize> {
        None
    }

    fn stages(&self) -> usize;

    fn name(&self) -> &str;
}

impl Clone for Box<dyn Integrator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn Integrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrator")
            .field("name", &self.name())
            .field("order", &self.order())
            .finish()
    }
}

pub const MIN_ACCURACY: Scalar = -16.0;
pub const MAX_ACCURACY: Scalar = 0.0;

/// Tolerance and step-size adaptation constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    /// log10 of the relative tolerance
    pub accuracy: Scalar,
    pub epsilon: Scalar,
    /// Consecutive rejections allowed before the driver gives up
    pub max_iterations: usize,
    pub safety: Scalar,
    pub min_factor: Scalar,
    pub max_factor: Scalar,
}

impl StepControl {
    pub fn new(accuracy: Scalar, max_iterations: usize) -> Result<Self, String> {
        if !(MIN_ACCURACY..=MAX_ACCURACY).contains(&accuracy) {
            return Err(format!(
                "accuracy {accuracy} is outside of [{MIN_ACCURACY}, {MAX_ACCURACY}]"
            ));
        }
        if max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }

        Ok(Self {
            accuracy,
            epsilon: libm::pow(10.0, accuracy),
            max_iterations,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
        })
    }

    /// Step size multiplier `safety * (eps / err)^(1 / (q + 1))`, clamped.
    pub fn factor(&self, error_max: Scalar, error_order: usize) -> Scalar {
        if error_max <= 0.0 {
            return self.max_factor;
        }
        let exponent = 1.0 / (error_order as Scalar + 1.0);
        let factor = self.safety * libm::pow(self.epsilon / error_max, exponent);
        factor.clamp(self.min_factor, self.max_factor)
    }
}

/// Work counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}
