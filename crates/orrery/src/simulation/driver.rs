//! Adaptive stepping towards a target time

use crate::error::SimulationError;
use crate::events::EventKind;
use crate::physics::acceleration::AccelerationField;
use crate::physics::body_data::BodyData;
use crate::physics::integrators::{Integrator, RunStatistics, StepControl, Workspace};
use crate::physics::math::Scalar;
use crate::simulation::lifecycle::{LifecycleManager, LifecycleOutcome};
use bevy::log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// `bodies.time` equals the target
    Reached,
    /// A stop event fired after an accepted step
    Halted(EventKind),
    /// A collision removed bodies; the committed state is the one right
    /// after the merge, before the target
    Collided,
}

/// Owns the integrator, its scratch space and the step controller.
#[derive(Debug, Clone)]
pub struct Driver {
    integrator: Box<dyn Integrator>,
    control: StepControl,
    workspace: Workspace,
    statistics: RunStatistics,
}

impl Driver {
    pub fn new(integrator: Box<dyn Integrator>, control: StepControl) -> Self {
        Self {
            integrator,
            control,
            workspace: Workspace::new(),
            statistics: RunStatistics::default(),
        }
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn control(&self) -> &StepControl {
        &self.control
    }

    pub fn statistics(&self) -> RunStatistics {
        RunStatistics {
            evaluations: self.statistics.evaluations + self.workspace.evaluations,
            ..self.statistics
        }
    }

    /// Evaluates the derivative at the committed state. Must run once before
    /// the first [`Driver::drive`] and after any external edit of `bodies`.
    pub fn prime(&mut self, bodies: &mut BodyData, field: &dyn AccelerationField) {
        bodies.refresh_derivatives(field);
        self.statistics.evaluations += 1;
    }

    /// Steps `bodies` until `bodies.time` reaches `target`, in either
    /// direction. Steps are clipped to land on the target exactly.
    ///
    /// Every accepted step is followed by a derivative refresh and an event
    /// check. A rejected step leaves `bodies` untouched; more than
    /// `max_iterations` rejections in a row fail the run. Returns early after
    /// a step that recorded a collision so the caller can publish the state
    /// at the event time.
    pub fn drive(
        &mut self,
        bodies: &mut BodyData,
        field: &dyn AccelerationField,
        lifecycle: &mut LifecycleManager,
        target: Scalar,
    ) -> Result<DriveOutcome, SimulationError> {
        let direction = if target >= bodies.time { 1.0 } else { -1.0 };
        let error_order = self.integrator.error_order();

        while (target - bodies.time) * direction > 0.0 {
            let remaining = (target - bodies.time).abs();
            let proposed = bodies.h.abs();
            let mut h = proposed.min(remaining);
            let mut rejections = 0;

            let (taken, next) = loop {
                if bodies.time + direction * h == bodies.time {
                    return Err(SimulationError::Convergence {
                        time: bodies.time,
                        step: h,
                        error_max: Scalar::NAN,
                        attempts: rejections,
                    });
                }

                let error = self
                    .integrator
                    .step(bodies, field, direction * h, &mut self.workspace);

                let (Some(error_max), Some(order)) = (error, error_order) else {
                    break (h, proposed);
                };

                let factor = self.control.factor(error_max, order);
                if error_max <= self.control.epsilon {
                    let mut next = h * factor;
                    if h < proposed && rejections == 0 {
                        // Clipped to the target; do not let that shrink the step
                        next = next.max(proposed);
                    }
                    break (h, next);
                }

                rejections += 1;
                self.statistics.rejected_steps += 1;
                debug!(
                    "step of {h:e} d rejected at t = {} d, error {error_max:e}",
                    bodies.time
                );
                if rejections > self.control.max_iterations {
                    return Err(SimulationError::Convergence {
                        time: bodies.time,
                        step: h,
                        error_max,
                        attempts: rejections,
                    });
                }
                h *= factor;
            };

            std::mem::swap(&mut bodies.y, &mut self.workspace.trial);
            bodies.error.copy_from_slice(&self.workspace.error);
            bodies.time = landing_time(bodies.time, target, direction, taken, remaining);
            bodies.h = next;
            self.statistics.accepted_steps += 1;

            bodies.refresh_derivatives(field);
            self.statistics.evaluations += 1;

            match lifecycle.evaluate(bodies)? {
                LifecycleOutcome::Continue {
                    removed,
                    collisions,
                } => {
                    if removed > 0 {
                        bodies.refresh_derivatives(field);
                        self.statistics.evaluations += 1;
                    }
                    if collisions > 0 {
                        return Ok(DriveOutcome::Collided);
                    }
                }
                LifecycleOutcome::Halt(kind) => return Ok(DriveOutcome::Halted(kind)),
            }
        }

        Ok(DriveOutcome::Reached)
    }
}

/// Time after a step of length `taken` towards `target`. A step that
/// reaches or rounds past the target lands on it exactly.
fn landing_time(
    time: Scalar,
    target: Scalar,
    direction: Scalar,
    taken: Scalar,
    remaining: Scalar,
) -> Scalar {
    let advanced = time + direction * taken;
    if taken >= remaining || (target - advanced) * direction <= 0.0 {
        target
    } else {
        advanced
    }
}
