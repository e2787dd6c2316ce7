//! Flat integration state shared by the integrators, the acceleration
//! evaluator and the lifecycle manager.
//!
//! Body `i` occupies `y[6i..6i + 6]` (position then velocity) and the same
//! slots of `accel` and `error`. Slot 0 always holds the central body. A
//! removed body keeps its slot and id but no longer takes part in force
//! evaluation, stepping or the conserved quantities. A dormant body is
//! excluded the same way until its group's start time, then activated.

use crate::physics::acceleration::AccelerationField;
use crate::physics::body::{
    BodyError, BodyGroupList, BodyId, BodyType, InitialCondition, Migration,
};
use crate::physics::math::{
    GAUSS_K2, STATE_STRIDE, Scalar, Vector, position_of, velocity_of, write_position,
    write_velocity,
};
use crate::physics::orbital_elements;
use serde::{Deserialize, Serialize};

/// Slots of the conserved-quantity vector.
pub mod integral {
    pub const MASS: usize = 0;
    pub const BARYCENTER_POSITION: usize = 1;
    pub const BARYCENTER_VELOCITY: usize = 4;
    pub const BARYCENTER_POSITION_NORM: usize = 7;
    pub const BARYCENTER_VELOCITY_NORM: usize = 8;
    pub const ANGULAR_MOMENTUM: usize = 9;
    pub const ANGULAR_MOMENTUM_NORM: usize = 12;
    pub const KINETIC_ENERGY: usize = 13;
    pub const POTENTIAL_ENERGY: usize = 14;
    pub const TOTAL_ENERGY: usize = 15;
    pub const COUNT: usize = 16;
}

/// Origin of the initial coordinates.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FrameCenter {
    /// Coordinates as given, centered on the central body
    #[default]
    #[serde(alias = "astrocentric")]
    Astro,
    /// Shifted so the barycenter starts at rest in the origin
    #[serde(alias = "barycentric")]
    Bary,
}

#[derive(Debug, Clone)]
pub struct BodyData {
    pub id: Vec<BodyId>,
    pub body_type: Vec<BodyType>,
    pub y: Vec<Scalar>,
    pub mass: Vec<Scalar>,
    pub radius: Vec<Scalar>,
    pub density: Vec<Scalar>,
    pub gamma_stokes: Vec<Scalar>,
    pub gamma_epstein: Vec<Scalar>,
    pub migration: Vec<Option<Migration>>,
    pub accel: Vec<Scalar>,
    pub error: Vec<Scalar>,
    pub distance_of_nearest_neighbor: Vec<Scalar>,
    pub integrals: [Scalar; integral::COUNT],
    pub time: Scalar,
    pub h: Scalar,
    active: Vec<bool>,
    dormant: Vec<bool>,
}

impl BodyData {
    /// Allocates state for `n` bodies, all active and at rest in the origin.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            id: Vec::with_capacity(n),
            body_type: Vec::with_capacity(n),
            y: Vec::with_capacity(n * STATE_STRIDE),
            mass: Vec::with_capacity(n),
            radius: Vec::with_capacity(n),
            density: Vec::with_capacity(n),
            gamma_stokes: Vec::with_capacity(n),
            gamma_epstein: Vec::with_capacity(n),
            migration: Vec::with_capacity(n),
            accel: Vec::with_capacity(n * STATE_STRIDE),
            error: Vec::with_capacity(n * STATE_STRIDE),
            distance_of_nearest_neighbor: Vec::with_capacity(n),
            integrals: [0.0; integral::COUNT],
            time: 0.0,
            h: 0.0,
            active: Vec::with_capacity(n),
            dormant: Vec::with_capacity(n),
        }
    }

    /// Appends a point mass. Used by the builders below and by tests that set
    /// up states directly.
    pub fn push(
        &mut self,
        id: BodyId,
        body_type: BodyType,
        mass: Scalar,
        radius: Scalar,
        position: Vector,
        velocity: Vector,
    ) -> usize {
        let index = self.id.len();
        self.id.push(id);
        self.body_type.push(body_type);
        self.y.extend_from_slice(&position.to_array());
        self.y.extend_from_slice(&velocity.to_array());
        self.mass.push(mass);
        self.radius.push(radius);
        self.density.push(0.0);
        self.gamma_stokes.push(0.0);
        self.gamma_epstein.push(0.0);
        self.migration.push(None);
        self.accel.extend_from_slice(&[0.0; STATE_STRIDE]);
        self.error.extend_from_slice(&[0.0; STATE_STRIDE]);
        self.distance_of_nearest_neighbor.push(Scalar::INFINITY);
        self.active.push(true);
        self.dormant.push(false);
        index
    }

    /// Resolves validated body groups into the initial state.
    ///
    /// Orbital elements are taken relative to the central body with
    /// `mu = k^2 (M + m)`.
    pub fn from_groups(
        groups: &BodyGroupList,
        frame: FrameCenter,
        start_time: Scalar,
        initial_step: Scalar,
    ) -> Result<Self, BodyError> {
        groups.validate()?;

        let count = groups.bodies().count();
        let mut data = Self::with_capacity(count);
        data.time = start_time;
        data.h = initial_step;

        let mut central: Option<(Scalar, Vector, Vector)> = None;

        for body in groups.bodies() {
            let mass = body.mass();
            let (position, velocity) = match (&body.initial, central) {
                (InitialCondition::Phase(phase), _) => (phase.position, phase.velocity),
                (InitialCondition::OrbitalElement(elements), Some((central_mass, r0, v0))) => {
                    let relative =
                        orbital_elements::to_phase(elements, GAUSS_K2 * (central_mass + mass));
                    (r0 + relative.position, v0 + relative.velocity)
                }
                (InitialCondition::OrbitalElement(_), None) => {
                    return Err(BodyError::Invalid(format!(
                        "'{}' uses orbital elements but no central body precedes it",
                        body.name
                    )));
                }
            };

            let characteristics = body.characteristics.clone().unwrap_or_default();
            let index = data.push(
                body.id,
                body.body_type,
                mass,
                characteristics.radius,
                position,
                velocity,
            );
            data.density[index] = characteristics.density;
            data.gamma_stokes[index] = characteristics.gamma_stokes();
            data.gamma_epstein[index] = characteristics.gamma_epstein();
            data.migration[index] = body.migration;

            if body.body_type == BodyType::CentralBody {
                central = Some((mass, position, velocity));
            }
        }

        if frame == FrameCenter::Bary {
            data.shift_to_barycenter();
        }

        data.compute_integrals();
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(index, &active)| active.then_some(index))
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&active| active).count()
    }

    /// Marks a body as removed. The central body cannot be removed and
    /// removal is permanent; returns whether the body was active before.
    pub fn remove(&mut self, index: usize) -> bool {
        if index == 0 || !self.is_active(index) {
            return false;
        }
        self.active[index] = false;
        let slots = index * STATE_STRIDE..(index + 1) * STATE_STRIDE;
        self.accel[slots.clone()].fill(0.0);
        self.error[slots].fill(0.0);
        self.distance_of_nearest_neighbor[index] = Scalar::INFINITY;
        true
    }

    pub fn is_dormant(&self, index: usize) -> bool {
        self.dormant.get(index).copied().unwrap_or(false)
    }

    /// Takes an active body out of the integration until
    /// [`BodyData::activate`]. Its state is frozen meanwhile.
    pub fn suspend(&mut self, index: usize) -> bool {
        if !self.remove(index) {
            return false;
        }
        self.dormant[index] = true;
        true
    }

    pub fn activate(&mut self, index: usize) -> bool {
        if !self.is_dormant(index) {
            return false;
        }
        self.dormant[index] = false;
        self.active[index] = true;
        true
    }

    pub fn set_phase(&mut self, index: usize, phase: &[Scalar; STATE_STRIDE]) {
        self.y[index * STATE_STRIDE..(index + 1) * STATE_STRIDE].copy_from_slice(phase);
    }

    pub fn index_of(&self, id: BodyId) -> Option<usize> {
        self.id.iter().position(|&candidate| candidate == id)
    }

    pub fn position(&self, index: usize) -> Vector {
        position_of(&self.y, index)
    }

    pub fn velocity(&self, index: usize) -> Vector {
        velocity_of(&self.y, index)
    }

    /// The six state scalars of a body.
    pub fn phase(&self, index: usize) -> [Scalar; STATE_STRIDE] {
        let mut phase = [0.0; STATE_STRIDE];
        phase.copy_from_slice(&self.y[index * STATE_STRIDE..(index + 1) * STATE_STRIDE]);
        phase
    }

    /// Distance of a body from the central body.
    pub fn central_distance(&self, index: usize) -> Scalar {
        (self.position(index) - self.position(0)).length()
    }

    fn barycenter(&self) -> (Scalar, Vector, Vector) {
        let (mass, weighted_position, weighted_velocity) = self.active_indices().fold(
            (0.0, Vector::ZERO, Vector::ZERO),
            |(m, r, v), i| {
                (
                    m + self.mass[i],
                    r + self.position(i) * self.mass[i],
                    v + self.velocity(i) * self.mass[i],
                )
            },
        );

        if mass > 0.0 {
            (mass, weighted_position / mass, weighted_velocity / mass)
        } else {
            (0.0, Vector::ZERO, Vector::ZERO)
        }
    }

    fn shift_to_barycenter(&mut self) {
        let (_, r, v) = self.barycenter();
        for i in 0..self.len() {
            let position = self.position(i) - r;
            let velocity = self.velocity(i) - v;
            write_position(&mut self.y, i, position);
            write_velocity(&mut self.y, i, velocity);
        }
    }

    /// Evaluates `accel` and `distance_of_nearest_neighbor` at the committed
    /// state.
    pub fn refresh_derivatives(&mut self, field: &dyn AccelerationField) {
        let mut accel = std::mem::take(&mut self.accel);
        let mut nearest = std::mem::take(&mut self.distance_of_nearest_neighbor);
        accel.resize(self.y.len(), 0.0);
        nearest.resize(self.len(), Scalar::INFINITY);

        field.derivative(self.time, &self.y, self, &mut accel, Some(&mut nearest));

        self.accel = accel;
        self.distance_of_nearest_neighbor = nearest;
    }

    /// Recomputes the conserved quantities over the active bodies.
    pub fn compute_integrals(&mut self) {
        let (total_mass, r_bary, v_bary) = self.barycenter();

        let mut angular_momentum = Vector::ZERO;
        let mut kinetic = 0.0;
        let mut potential = 0.0;

        let active: Vec<usize> = self.active_indices().collect();
        for (n, &i) in active.iter().enumerate() {
            let r_i = self.position(i);
            let v_i = self.velocity(i);
            angular_momentum += r_i.cross(v_i) * self.mass[i];
            kinetic += 0.5 * self.mass[i] * v_i.length_squared();

            for &j in &active[n + 1..] {
                let distance = (self.position(j) - r_i).length();
                if distance > 0.0 {
                    potential -= GAUSS_K2 * self.mass[i] * self.mass[j] / distance;
                }
            }
        }

        let integrals = &mut self.integrals;
        integrals[integral::MASS] = total_mass;
        integrals[integral::BARYCENTER_POSITION..integral::BARYCENTER_POSITION + 3]
            .copy_from_slice(&r_bary.to_array());
        integrals[integral::BARYCENTER_VELOCITY..integral::BARYCENTER_VELOCITY + 3]
            .copy_from_slice(&v_bary.to_array());
        integrals[integral::BARYCENTER_POSITION_NORM] = r_bary.length();
        integrals[integral::BARYCENTER_VELOCITY_NORM] = v_bary.length();
        integrals[integral::ANGULAR_MOMENTUM..integral::ANGULAR_MOMENTUM + 3]
            .copy_from_slice(&angular_momentum.to_array());
        integrals[integral::ANGULAR_MOMENTUM_NORM] = angular_momentum.length();
        integrals[integral::KINETIC_ENERGY] = kinetic;
        integrals[integral::POTENTIAL_ENERGY] = potential;
        integrals[integral::TOTAL_ENERGY] = kinetic + potential;
    }

    pub fn total_energy(&self) -> Scalar {
        self.integrals[integral::TOTAL_ENERGY]
    }

    pub fn angular_momentum_norm(&self) -> Scalar {
        self.integrals[integral::ANGULAR_MOMENTUM_NORM]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::{Body, BodyGroup, OrbitalElement, Phase};
    use crate::physics::math::GAUSS_K;

    fn sun_and_earth() -> BodyGroupList {
        let sun = Body::new(
            1,
            "sun",
            BodyType::CentralBody,
            InitialCondition::Phase(Phase {
                position: Vector::ZERO,
                velocity: Vector::ZERO,
            }),
            crate::physics::body::Characteristics::resolve(BodyType::CentralBody, 1.0, Some(0.00465), None)
                .ok(),
            None,
        )
        .unwrap();
        let earth = Body::new(
            2,
            "earth",
            BodyType::RockyPlanet,
            InitialCondition::OrbitalElement(OrbitalElement {
                semi_major_axis: 1.0,
                eccentricity: 0.0,
                inclination: 0.0,
                argument_of_periapsis: 0.0,
                longitude_of_node: 0.0,
                mean_anomaly: 0.0,
            }),
            crate::physics::body::Characteristics::resolve(BodyType::RockyPlanet, 3e-6, Some(4.26e-5), None)
                .ok(),
            None,
        )
        .unwrap();

        BodyGroupList::new(vec![BodyGroup {
            description: "inner system".to_string(),
            bodies: vec![sun, earth],
            ..Default::default()
        }])
    }

    #[test]
    fn test_orbital_elements_resolved_relative_to_central_body() {
        let data = BodyData::from_groups(&sun_and_earth(), FrameCenter::Astro, 0.0, 1.0).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.body_type[0], BodyType::CentralBody);
        assert!((data.position(1) - Vector::new(1.0, 0.0, 0.0)).length() < 1e-14);
        let expected_speed = GAUSS_K * libm::sqrt(1.0 + 3e-6);
        assert!((data.velocity(1).y - expected_speed).abs() < 1e-15);
    }

    #[test]
    fn test_barycentric_frame_is_at_rest() {
        let data = BodyData::from_groups(&sun_and_earth(), FrameCenter::Bary, 0.0, 1.0).unwrap();

        assert!(data.integrals[integral::BARYCENTER_POSITION_NORM] < 1e-15);
        assert!(data.integrals[integral::BARYCENTER_VELOCITY_NORM] < 1e-18);
        assert!(data.position(0).x < 0.0);
    }

    #[test]
    fn test_dormant_body_is_frozen_until_activated() {
        let mut data = BodyData::from_groups(&sun_and_earth(), FrameCenter::Astro, 0.0, 1.0).unwrap();
        data.accel[6..12].fill(1.0);

        assert!(!data.suspend(0), "the central body cannot be suspended");
        assert!(data.suspend(1));
        assert!(data.is_dormant(1));
        assert!(!data.is_active(1));
        assert_eq!(data.active_count(), 1);
        assert!(data.accel[6..12].iter().all(|&a| a == 0.0));

        assert!(data.activate(1));
        assert!(data.is_active(1) && !data.is_dormant(1));
        assert!(!data.activate(1));

        // Removal is permanent; a removed body never wakes up
        assert!(data.remove(1));
        assert!(!data.activate(1));
    }

    #[test]
    fn test_integrals_of_circular_orbit() {
        let mut data = BodyData::with_capacity(2);
        data.push(1, BodyType::CentralBody, 1.0, 0.0, Vector::ZERO, Vector::ZERO);
        data.push(
            2,
            BodyType::TestParticle,
            1.0e-3,
            0.0,
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(0.0, GAUSS_K, 0.0),
        );
        data.compute_integrals();

        assert!((data.integrals[integral::MASS] - 1.001).abs() < 1e-15);
        let kinetic = 0.5e-3 * GAUSS_K2;
        assert!((data.integrals[integral::KINETIC_ENERGY] - kinetic).abs() < 1e-20);
        assert!((data.integrals[integral::POTENTIAL_ENERGY] + 1.0e-3 * GAUSS_K2).abs() < 1e-20);
        assert!((data.integrals[integral::ANGULAR_MOMENTUM + 2] - 1.0e-3 * GAUSS_K).abs() < 1e-20);
    }

    #[test]
    fn test_removal_keeps_slots_and_ids() {
        let mut data = BodyData::with_capacity(3);
        data.push(10, BodyType::CentralBody, 1.0, 0.0, Vector::ZERO, Vector::ZERO);
        data.push(11, BodyType::Planetesimal, 1e-9, 0.0, Vector::X, Vector::Y);
        data.push(12, BodyType::Planetesimal, 1e-9, 0.0, Vector::NEG_X, Vector::NEG_Y);

        assert!(data.remove(1));
        assert!(!data.remove(1), "removal happens once");
        assert!(!data.remove(0), "the central body stays");

        assert_eq!(data.len(), 3);
        assert_eq!(data.active_count(), 2);
        assert_eq!(data.active_indices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(data.id, vec![10, 11, 12]);
        assert_eq!(data.index_of(12), Some(2));
        assert_eq!(data.position(1), Vector::X);

        data.compute_integrals();
        assert!((data.integrals[integral::MASS] - (1.0 + 1e-9)).abs() < 1e-15);
    }
}
