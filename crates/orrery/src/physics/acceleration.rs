//! Right-hand side of the equations of motion

use crate::physics::body::MigrationType;
use crate::physics::body_data::BodyData;
use crate::physics::math::{
    GAUSS_K2, STATE_STRIDE, Scalar, Vector, position_of, velocity_of, write_position,
    write_velocity,
};
use crate::physics::nebula::Nebula;

/// Time derivative of the interleaved state vector.
///
/// Implementations write velocities into the position slots and
/// accelerations into the velocity slots of `dydt` for every active body of
/// `bodies`, evaluated at the state `y` (which may be a trial state and not
/// `bodies.y`). Slots of removed bodies are left at zero. When `nearest` is
/// given it receives the distance of every active body to its nearest active
/// neighbour.
pub trait AccelerationField: Send + Sync {
    fn derivative(
        &self,
        t: Scalar,
        y: &[Scalar],
        bodies: &BodyData,
        dydt: &mut [Scalar],
        nearest: Option<&mut [Scalar]>,
    );
}

/// Direct-summation Newtonian gravity with optional gas drag and migration.
#[derive(Debug, Clone, Default)]
pub struct GravityField {
    pub nebula: Option<Nebula>,
}

impl GravityField {
    pub fn new() -> Self {
        Self { nebula: None }
    }

    pub fn with_nebula(nebula: Nebula) -> Self {
        Self {
            nebula: Some(nebula),
        }
    }

    fn apply_nebula(
        &self,
        nebula: &Nebula,
        t: Scalar,
        y: &[Scalar],
        bodies: &BodyData,
        dydt: &mut [Scalar],
    ) {
        let central_position = position_of(y, 0);
        let central_velocity = velocity_of(y, 0);
        let central_mass = bodies.mass[0];

        for i in bodies.active_indices().filter(|&i| i != 0) {
            let position = position_of(y, i) - central_position;
            let velocity = velocity_of(y, i) - central_velocity;
            let mu = GAUSS_K2 * (central_mass + bodies.mass[i]);
            let mut extra = Vector::ZERO;

            if bodies.gamma_stokes[i] > 0.0 || bodies.gamma_epstein[i] > 0.0 {
                extra += nebula.drag_acceleration(
                    bodies.gamma_stokes[i],
                    bodies.gamma_epstein[i],
                    bodies.radius[i],
                    mu,
                    position,
                    velocity,
                    t,
                );
            }

            if let Some(migration) = bodies.migration[i].filter(|m| m.kind != MigrationType::None) {
                extra += nebula.migration_acceleration(&migration, mu, position, velocity, t);
            }

            if extra != Vector::ZERO {
                let acceleration = velocity_of(dydt, i) + extra;
                write_velocity(dydt, i, acceleration);
            }
        }
    }
}

impl AccelerationField for GravityField {
    fn derivative(
        &self,
        t: Scalar,
        y: &[Scalar],
        bodies: &BodyData,
        dydt: &mut [Scalar],
        mut nearest: Option<&mut [Scalar]>,
    ) {
        let n = bodies.len();
        debug_assert_eq!(y.len(), n * STATE_STRIDE);
        dydt.fill(0.0);
        if let Some(nearest) = nearest.as_deref_mut() {
            nearest.fill(Scalar::INFINITY);
        }

        for i in bodies.active_indices() {
            write_position(dydt, i, velocity_of(y, i));
        }

        for i in 0..n {
            if !bodies.is_active(i) {
                continue;
            }
            let r_i = position_of(y, i);
            let mut a_i = velocity_of(dydt, i);

            for j in (i + 1)..n {
                if !bodies.is_active(j) {
                    continue;
                }
                let d = position_of(y, j) - r_i;
                let r2 = d.length_squared();
                if r2 == 0.0 {
                    continue;
                }
                let r = libm::sqrt(r2);
                let scale = GAUSS_K2 / (r2 * r);

                a_i += d * (bodies.mass[j] * scale);
                let a_j = velocity_of(dydt, j) - d * (bodies.mass[i] * scale);
                write_velocity(dydt, j, a_j);

                if let Some(nearest) = nearest.as_deref_mut() {
                    nearest[i] = nearest[i].min(r);
                    nearest[j] = nearest[j].min(r);
                }
            }

            write_velocity(dydt, i, a_i);
        }

        if let Some(nebula) = &self.nebula {
            self.apply_nebula(nebula, t, y, bodies, dydt);
        }
    }
}
