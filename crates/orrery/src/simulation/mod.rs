//! Run orchestration: the driver steps between output boundaries, the
//! lifecycle manager applies events, and the timeline publishes snapshots.
//! Body groups with a later start time wait dormant until the integration
//! reaches it.

pub mod driver;
pub mod lifecycle;
pub mod timeline;

pub use driver::{DriveOutcome, Driver};
pub use lifecycle::{LifecycleManager, LifecycleOutcome};
pub use timeline::TimeLine;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::events::EventKind;
use crate::output::{
    Checkpoint, ConstantProperties, ElapsedRecord, IntegralsRecord, OutputSink, PhasesRecord,
    VariableProperties,
};
use crate::physics::acceleration::{AccelerationField, GravityField};
use crate::physics::body_data::BodyData;
use crate::physics::integrators::registry::IntegratorRegistry;
use crate::physics::integrators::{RunStatistics, StepControl};
use crate::physics::math::Scalar;
use bevy::log::{debug, info};
use rand::Rng;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// The end of the timeline was reached
    Completed { time: Scalar },
    /// A stop event ended the run early
    Halted { time: Scalar, event: EventKind },
}

impl RunOutcome {
    pub fn time(&self) -> Scalar {
        match self {
            RunOutcome::Completed { time } | RunOutcome::Halted { time, .. } => *time,
        }
    }
}

/// Slots that join the integration at `time`.
#[derive(Debug, Clone, PartialEq)]
struct Activation {
    time: Scalar,
    indices: Vec<usize>,
}

pub struct Simulation {
    bodies: BodyData,
    field: Box<dyn AccelerationField>,
    driver: Driver,
    lifecycle: LifecycleManager,
    timeline: TimeLine,
    constant_properties: Vec<ConstantProperties>,
    /// Ordered in the run direction
    activations: Vec<Activation>,
    /// Picks up an earlier run; the initial records are already written
    resumed: bool,
    started: Instant,
    last_publish: Instant,
}

impl Simulation {
    /// Assembles a run. The state is moved to the start of `timeline`.
    pub fn new(
        mut bodies: BodyData,
        field: Box<dyn AccelerationField>,
        driver: Driver,
        lifecycle: LifecycleManager,
        timeline: TimeLine,
        constant_properties: Vec<ConstantProperties>,
    ) -> Self {
        bodies.time = timeline.start;
        let now = Instant::now();
        Self {
            bodies,
            field,
            driver,
            lifecycle,
            timeline,
            constant_properties,
            activations: Vec::new(),
            resumed: false,
            started: now,
            last_publish: now,
        }
    }

    /// Validates `config` and resolves it into a ready-to-run simulation.
    pub fn from_config<R: Rng>(
        config: &SimulationConfig,
        registry: &IntegratorRegistry,
        rng: &mut R,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let integrator = registry
            .create(&config.integrator.name)
            .map_err(SimulationError::Configuration)?;
        let control = StepControl::new(config.integrator.accuracy, config.integrator.max_iterations)
            .map_err(SimulationError::Configuration)?;
        let timeline = config.timeline.resolve()?;
        let groups = config.body_group_list(rng)?;
        let bodies = BodyData::from_groups(
            &groups,
            config.events.frame_center,
            timeline.start,
            config.integrator.initial_step,
        )?;

        let field = match &config.nebula {
            Some(nebula) => GravityField::with_nebula(nebula.clone()),
            None => GravityField::new(),
        };

        let mut simulation = Self::new(
            bodies,
            Box::new(field),
            Driver::new(integrator, control),
            LifecycleManager::new(config.events.conditions()),
            timeline,
            ConstantProperties::from_groups(&groups),
        );

        if config.timeline.distinct_start_times {
            let mut first = 0;
            for group in &groups.groups {
                let indices: Vec<usize> = (first..first + group.bodies.len()).collect();
                first += group.bodies.len();
                let start = group.start_time(timeline.start)?;
                simulation.schedule_activation(start, indices)?;
            }
        }

        Ok(simulation)
    }

    /// Validates `config` and continues the run that wrote `checkpoint`.
    ///
    /// Slot order and ids come from the scenario and must match the
    /// snapshot. Active bodies take their phase from it, bodies removed
    /// before it stay removed, and integration goes on from its time on the
    /// boundary grid of the configured timeline. New affairs are numbered
    /// after `checkpoint.last_affair_id`.
    pub fn resume<R: Rng>(
        config: &SimulationConfig,
        registry: &IntegratorRegistry,
        rng: &mut R,
        checkpoint: &Checkpoint,
    ) -> Result<Self, SimulationError> {
        let mut simulation = Self::from_config(config, registry, rng)?;
        simulation.restore(checkpoint)?;
        Ok(simulation)
    }

    fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), SimulationError> {
        let snapshot = &checkpoint.phases;
        let direction = self.timeline.direction();
        let end = self.timeline.end();

        if snapshot.bodies.len() != self.bodies.len() {
            return Err(SimulationError::Configuration(format!(
                "snapshot holds {} bodies but the scenario defines {}",
                snapshot.bodies.len(),
                self.bodies.len()
            )));
        }
        if (end - snapshot.time) * direction <= 0.0 {
            return Err(SimulationError::Configuration(format!(
                "the run already reached the end of the timeline at t = {} d",
                snapshot.time
            )));
        }
        if (snapshot.time - self.timeline.start) * direction < 0.0 {
            return Err(SimulationError::Configuration(format!(
                "snapshot time {} d precedes the timeline start {} d",
                snapshot.time, self.timeline.start
            )));
        }

        self.activations
            .retain(|activation| (activation.time - snapshot.time) * direction > 0.0);

        for (index, (id, phase)) in snapshot.bodies.iter().enumerate() {
            if id.abs() != self.bodies.id[index] {
                return Err(SimulationError::Configuration(format!(
                    "snapshot slot {index} holds body {} but the scenario has body {}",
                    id.abs(),
                    self.bodies.id[index]
                )));
            }

            self.bodies.set_phase(index, phase);
            let pending = self
                .activations
                .iter()
                .any(|activation| activation.indices.contains(&index));
            if *id > 0 {
                self.bodies.activate(index);
            } else if !pending {
                if index == 0 {
                    return Err(SimulationError::Configuration(
                        "snapshot marks the central body as removed".to_string(),
                    ));
                }
                self.bodies.activate(index);
                self.bodies.remove(index);
            }
        }

        self.bodies.time = snapshot.time;
        self.lifecycle.continue_after(checkpoint.last_affair_id);
        self.resumed = true;
        info!(
            "Continuing from t = {} d with {} active bodies",
            snapshot.time,
            self.bodies.active_count()
        );
        Ok(())
    }

    /// Keeps the bodies in `indices` out of the integration until it reaches
    /// `time`. Times at or before the current one leave them active.
    pub fn schedule_activation(&mut self, time: Scalar, indices: Vec<usize>) -> Result<(), SimulationError> {
        let direction = self.timeline.direction();
        if indices.is_empty() || (time - self.bodies.time) * direction <= 0.0 {
            return Ok(());
        }
        if indices.contains(&0) {
            return Err(SimulationError::Configuration(format!(
                "the central body cannot start later than the timeline, its group starts at t = {time} d"
            )));
        }

        for &index in &indices {
            self.bodies.suspend(index);
        }
        debug!("{} bodies wait until t = {time} d", indices.len());

        match self
            .activations
            .iter()
            .position(|activation| (activation.time - time) * direction >= 0.0)
        {
            Some(at) if self.activations[at].time == time => {
                self.activations[at].indices.extend(indices)
            }
            Some(at) => self.activations.insert(at, Activation { time, indices }),
            None => self.activations.push(Activation { time, indices }),
        }
        Ok(())
    }

    pub fn bodies(&self) -> &BodyData {
        &self.bodies
    }

    pub fn timeline(&self) -> &TimeLine {
        &self.timeline
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn statistics(&self) -> RunStatistics {
        self.driver.statistics()
    }

    /// Integrates over the whole timeline, publishing the initial snapshot,
    /// one snapshot per output boundary and one at every collision to
    /// `sink`. A resumed run publishes neither the constant properties nor
    /// the initial snapshot again.
    pub fn run(&mut self, sink: &mut dyn OutputSink) -> Result<RunOutcome, SimulationError> {
        info!(
            "Integrating {} bodies from t = {} d to t = {} d with {}",
            self.bodies.active_count(),
            self.bodies.time,
            self.timeline.end(),
            self.driver.integrator().name()
        );

        self.started = Instant::now();
        self.last_publish = self.started;
        self.driver.prime(&mut self.bodies, self.field.as_ref());
        if !self.resumed {
            sink.write_constant_properties(&self.constant_properties)?;
            self.publish(sink)?;
        }

        let end = self.timeline.end();
        let mut boundary = self.timeline.boundary_reached_by(self.bodies.time);

        while boundary != end {
            boundary = self.timeline.next_boundary(boundary);
            let outcome = loop {
                let target = self.next_target(boundary);
                let outcome = self.driver.drive(
                    &mut self.bodies,
                    self.field.as_ref(),
                    &mut self.lifecycle,
                    target,
                )?;
                if outcome == DriveOutcome::Reached {
                    self.activate_due();
                    if self.bodies.time != boundary {
                        continue;
                    }
                }
                self.publish(sink)?;
                match outcome {
                    DriveOutcome::Collided if self.bodies.time != boundary => continue,
                    DriveOutcome::Collided => break DriveOutcome::Reached,
                    other => break other,
                }
            };

            if let DriveOutcome::Halted(event) = outcome {
                sink.flush()?;
                info!("Stopped by {event} at t = {} d", self.bodies.time);
                return Ok(RunOutcome::Halted {
                    time: self.bodies.time,
                    event,
                });
            }
            debug!(
                "Reached t = {} d, {} bodies active",
                self.bodies.time,
                self.bodies.active_count()
            );
        }

        sink.flush()?;
        let statistics = self.statistics();
        info!(
            "Finished at t = {} d: {} accepted and {} rejected steps, {} evaluations",
            self.bodies.time,
            statistics.accepted_steps,
            statistics.rejected_steps,
            statistics.evaluations
        );
        Ok(RunOutcome::Completed {
            time: self.bodies.time,
        })
    }

    /// The next activation if it comes before `boundary`, else `boundary`.
    fn next_target(&self, boundary: Scalar) -> Scalar {
        match self.activations.first() {
            Some(activation) if (activation.time - boundary) * self.timeline.direction() < 0.0 => {
                activation.time
            }
            _ => boundary,
        }
    }

    fn activate_due(&mut self) {
        let mut activated = false;
        while self
            .activations
            .first()
            .is_some_and(|activation| activation.time == self.bodies.time)
        {
            let activation = self.activations.remove(0);
            for &index in &activation.indices {
                self.bodies.activate(index);
            }
            info!(
                "{} bodies joined the integration at t = {} d",
                activation.indices.len(),
                activation.time
            );
            activated = true;
        }
        if activated {
            self.driver.prime(&mut self.bodies, self.field.as_ref());
        }
    }

    fn publish(&mut self, sink: &mut dyn OutputSink) -> Result<(), SimulationError> {
        let now = Instant::now();
        sink.write_elapsed(&ElapsedRecord {
            time: self.bodies.time,
            accepted_steps: self.driver.statistics().accepted_steps,
            interval: now - self.last_publish,
            total: now - self.started,
        })?;
        self.last_publish = now;

        self.bodies.compute_integrals();
        for affair in self.lifecycle.drain_affairs() {
            sink.write_affair(&affair)?;
        }
        sink.write_phases(&PhasesRecord::snapshot(&self.bodies))?;
        sink.write_integrals(&IntegralsRecord::snapshot(&self.bodies))?;
        sink.write_variable_properties(self.bodies.time, &VariableProperties::snapshot(&self.bodies))?;
        Ok(())
    }
}
