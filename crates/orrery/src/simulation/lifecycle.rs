//! Event detection and body removal after accepted steps

use crate::error::SimulationError;
use crate::events::{AffairRecord, EventCondition, EventConditions, EventKind};
use crate::physics::body_data::BodyData;
use crate::physics::math::{GAUSS_K2, Scalar, hill_radius, mutual_hill_radius};
use bevy::log::{debug, info};

/// Result of checking the committed state for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Integration goes on, possibly with fewer active bodies. `collisions`
    /// counts the collision affairs recorded by this check.
    Continue { removed: usize, collisions: usize },
    /// An event with `stop` set fired; nothing was removed
    Halt(EventKind),
}

enum Scan {
    Removed(usize),
    Halt,
}

/// Runs the event checks in [`EventKind::ORDER`], removes triggering
/// bodies and queues affair records until the timeline publishes them.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    conditions: EventConditions,
    next_affair_id: u64,
    pending: Vec<AffairRecord>,
}

impl LifecycleManager {
    pub fn new(conditions: EventConditions) -> Self {
        Self {
            conditions,
            next_affair_id: 1,
            pending: Vec::new(),
        }
    }

    /// Numbers new affairs after those of an earlier run that ended with
    /// `last_id`.
    pub fn continue_after(&mut self, last_id: u64) {
        self.next_affair_id = last_id + 1;
    }

    pub fn conditions(&self) -> &EventConditions {
        &self.conditions
    }

    /// Affairs recorded since the last drain, oldest first.
    pub fn pending_affairs(&self) -> &[AffairRecord] {
        &self.pending
    }

    pub fn drain_affairs(&mut self) -> Vec<AffairRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Checks every enabled condition against the committed state of
    /// `bodies`. A body removed by an earlier check is not examined again.
    pub fn evaluate(&mut self, bodies: &mut BodyData) -> Result<LifecycleOutcome, SimulationError> {
        let mut removed = 0;
        let mut collisions = 0;

        for kind in EventKind::ORDER {
            let condition = *self.conditions.get(kind);
            if !condition.is_enabled() {
                continue;
            }

            let recorded = self.pending.len();
            let scan = match kind {
                EventKind::Ejection | EventKind::HitCentrum => {
                    self.scan_central_distance(bodies, kind, condition)
                }
                EventKind::Collision => self.scan_collisions(bodies, condition),
                EventKind::CloseEncounter => self.scan_close_encounters(bodies, condition),
                EventKind::WeakCapture => self.scan_weak_captures(bodies, condition),
            };

            match scan {
                Scan::Removed(count) => removed += count,
                Scan::Halt => return Ok(LifecycleOutcome::Halt(kind)),
            }
            if kind == EventKind::Collision {
                collisions += self.pending.len() - recorded;
            }
        }

        if removed > 0 && bodies.active_count() <= 1 {
            return Err(SimulationError::DegenerateState(format!(
                "only the central body is left at t = {}",
                bodies.time
            )));
        }

        Ok(LifecycleOutcome::Continue {
            removed,
            collisions,
        })
    }

    fn scan_central_distance(
        &mut self,
        bodies: &mut BodyData,
        kind: EventKind,
        condition: EventCondition,
    ) -> Scan {
        let mut removed = 0;
        let candidates: Vec<usize> = bodies.active_indices().filter(|&i| i != 0).collect();

        for i in candidates {
            if !bodies.is_active(i) {
                continue;
            }
            let distance = bodies.central_distance(i);
            let triggered = match kind {
                EventKind::Ejection => distance > condition.factor,
                _ => distance < condition.factor,
            };
            if triggered {
                match self.fire(bodies, kind, condition.stop, i, 0, &[i]) {
                    Scan::Removed(count) => removed += count,
                    Scan::Halt => return Scan::Halt,
                }
            }
        }

        Scan::Removed(removed)
    }

    fn scan_collisions(&mut self, bodies: &mut BodyData, condition: EventCondition) -> Scan {
        let mut removed = 0;
        let candidates: Vec<usize> = bodies.active_indices().filter(|&i| i != 0).collect();
        let largest_radius = candidates
            .iter()
            .map(|&i| bodies.radius[i])
            .fold(0.0, Scalar::max);

        for (n, &i) in candidates.iter().enumerate() {
            if !bodies.is_active(i) {
                continue;
            }
            // The nearest neighbour bounds every pair distance from below
            let nearest = bodies.distance_of_nearest_neighbor[i];
            if nearest.is_finite() && nearest >= condition.factor * (bodies.radius[i] + largest_radius) {
                continue;
            }

            for &j in &candidates[n + 1..] {
                if !bodies.is_active(i) {
                    break;
                }
                if !bodies.is_active(j) {
                    continue;
                }
                let reach = condition.factor * (bodies.radius[i] + bodies.radius[j]);
                let distance = (bodies.position(j) - bodies.position(i)).length();
                if distance < reach {
                    match self.fire(bodies, EventKind::Collision, condition.stop, i, j, &[i, j]) {
                        Scan::Removed(count) => removed += count,
                        Scan::Halt => return Scan::Halt,
                    }
                }
            }
        }

        Scan::Removed(removed)
    }

    fn scan_close_encounters(&mut self, bodies: &mut BodyData, condition: EventCondition) -> Scan {
        let mut removed = 0;
        let central_mass = bodies.mass[0];
        let candidates: Vec<usize> = bodies.active_indices().filter(|&i| i != 0).collect();

        for (n, &i) in candidates.iter().enumerate() {
            for &j in &candidates[n + 1..] {
                if !bodies.is_active(i) {
                    break;
                }
                if !bodies.is_active(j) {
                    continue;
                }
                let hill = mutual_hill_radius(
                    bodies.mass[i],
                    bodies.mass[j],
                    bodies.central_distance(i),
                    bodies.central_distance(j),
                    central_mass,
                );
                let distance = (bodies.position(j) - bodies.position(i)).length();
                if distance < condition.factor * hill {
                    let lighter = if bodies.mass[i] < bodies.mass[j] { i } else { j };
                    match self.fire(
                        bodies,
                        EventKind::CloseEncounter,
                        condition.stop,
                        i,
                        j,
                        &[lighter],
                    ) {
                        Scan::Removed(count) => removed += count,
                        Scan::Halt => return Scan::Halt,
                    }
                }
            }
        }

        Scan::Removed(removed)
    }

    fn scan_weak_captures(&mut self, bodies: &mut BodyData, condition: EventCondition) -> Scan {
        let mut removed = 0;
        let central_mass = bodies.mass[0];
        let candidates: Vec<usize> = bodies.active_indices().filter(|&i| i != 0).collect();

        for &captor in &candidates {
            if !bodies.is_active(captor) || bodies.mass[captor] <= 0.0 {
                continue;
            }
            let reach = condition.factor
                * hill_radius(
                    bodies.mass[captor],
                    bodies.central_distance(captor),
                    central_mass,
                );

            for &j in &candidates {
                if j == captor || !bodies.is_active(j) || bodies.mass[j] >= bodies.mass[captor] {
                    continue;
                }
                let separation = bodies.position(j) - bodies.position(captor);
                let distance = separation.length();
                if distance == 0.0 || distance >= reach {
                    continue;
                }
                let relative_speed2 = (bodies.velocity(j) - bodies.velocity(captor)).length_squared();
                let energy = 0.5 * relative_speed2
                    - GAUSS_K2 * (bodies.mass[captor] + bodies.mass[j]) / distance;
                if energy < 0.0 {
                    match self.fire(bodies, EventKind::WeakCapture, condition.stop, j, captor, &[j]) {
                        Scan::Removed(count) => removed += count,
                        Scan::Halt => return Scan::Halt,
                    }
                }
            }
        }

        Scan::Removed(removed)
    }

    fn fire(
        &mut self,
        bodies: &mut BodyData,
        kind: EventKind,
        stop: bool,
        body1: usize,
        body2: usize,
        remove: &[usize],
    ) -> Scan {
        let record = AffairRecord {
            id: self.next_affair_id,
            kind,
            body1_id: bodies.id[body1],
            body2_id: bodies.id[body2],
            body1_phase: bodies.phase(body1),
            body2_phase: bodies.phase(body2),
            time: bodies.time,
        };
        self.next_affair_id += 1;

        info!(
            "{kind} of bodies {} and {} at t = {} d",
            record.body1_id, record.body2_id, record.time
        );
        self.pending.push(record);

        if stop {
            return Scan::Halt;
        }

        let count = remove.iter().filter(|&&index| bodies.remove(index)).count();
        debug!("removed {count} bodies, {} remain active", bodies.active_count());
        Scan::Removed(count)
    }
}
