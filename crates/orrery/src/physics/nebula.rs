//! Gas disk model for drag and planetary migration.
//!
//! Every profile is a power law of the cylindrical distance from the central
//! body, scaled in time by the depletion factor of the disk.

use crate::physics::body::{Migration, MigrationType};
use crate::physics::math::{Scalar, Vector};
use orrery_macros::ConfigDefaults;
use serde::{Deserialize, Serialize};

/// `c * r^index`
#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct PowerLaw {
    #[default(0.0)]
    pub c: Scalar,

    #[default(0.0)]
    pub index: Scalar,
}

impl PowerLaw {
    pub fn new(c: Scalar, index: Scalar) -> Self {
        Self { c, index }
    }

    pub fn at(&self, r: Scalar) -> Scalar {
        self.c * libm::pow(r, self.index)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasDecreaseType {
    #[default]
    Constant,
    Linear,
    Exponential,
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Nebula {
    /// Shakura-Sunyaev viscosity parameter
    #[default(2.0e-3)]
    #[range(0.0..)]
    pub alpha: Scalar,

    #[default(GasDecreaseType::Constant)]
    pub decrease_type: GasDecreaseType,

    /// Depletion starts at `t0` (days)
    #[default(0.0)]
    pub t0: Scalar,

    /// Linear depletion completes at `t1` (days)
    #[default(0.0)]
    pub t1: Scalar,

    /// e-folding time of exponential depletion (days)
    #[default(3.65e5)]
    #[range(0.0..)]
    pub timescale: Scalar,

    /// Pressure support parameter
    #[default(PowerLaw::new(2.0e-3, 0.5))]
    pub eta: PowerLaw,

    /// Type I migration timescale (days)
    #[default(PowerLaw::new(3.65e7, 0.0))]
    pub tau: PowerLaw,

    /// Gas scale height (AU)
    #[default(PowerLaw::new(3.3e-2, 1.25))]
    pub scale_height: PowerLaw,

    /// Mid-plane gas density (M_sun / AU^3)
    #[default(PowerLaw::new(2.36e-3, -2.75))]
    pub density: PowerLaw,

    /// Bodies smaller than this radius (AU) feel Epstein drag, larger ones
    /// Stokes drag
    #[default(1.0e-11)]
    #[range(0.0..)]
    pub epstein_stokes_radius: Scalar,
}

impl Nebula {
    /// Fraction of the initial gas still present at time `t`.
    pub fn depletion_factor(&self, t: Scalar) -> Scalar {
        match self.decrease_type {
            GasDecreaseType::Constant => 1.0,
            GasDecreaseType::Linear => {
                if t <= self.t0 {
                    1.0
                } else if t >= self.t1 || self.t1 <= self.t0 {
                    0.0
                } else {
                    1.0 - (t - self.t0) / (self.t1 - self.t0)
                }
            }
            GasDecreaseType::Exponential => {
                if t <= self.t0 || self.timescale <= 0.0 {
                    1.0
                } else {
                    libm::exp(-(t - self.t0) / self.timescale)
                }
            }
        }
    }

    /// Gas density at `position` relative to the central body.
    pub fn gas_density(&self, position: Vector, t: Scalar) -> Scalar {
        let r = cylindrical_radius(position);
        if r <= 0.0 {
            return 0.0;
        }
        let h = self.scale_height.at(r);
        let vertical = if h > 0.0 {
            libm::exp(-position.z * position.z / (2.0 * h * h))
        } else {
            0.0
        };
        self.density.at(r) * vertical * self.depletion_factor(t)
    }

    /// Sub-Keplerian circular gas velocity at `position`.
    pub fn gas_velocity(&self, mu: Scalar, position: Vector) -> Vector {
        let r = cylindrical_radius(position);
        if r <= 0.0 || mu <= 0.0 {
            return Vector::ZERO;
        }
        let keplerian = libm::sqrt(mu / r);
        let support = (1.0 - 2.0 * self.eta.at(r)).max(0.0);
        let azimuthal = Vector::new(-position.y / r, position.x / r, 0.0);
        azimuthal * (libm::sqrt(support) * keplerian)
    }

    fn keplerian_frequency(mu: Scalar, r: Scalar) -> Scalar {
        libm::sqrt(mu / (r * r * r))
    }

    pub fn sound_speed(&self, mu: Scalar, r: Scalar) -> Scalar {
        if r <= 0.0 {
            return 0.0;
        }
        self.scale_height.at(r) * Self::keplerian_frequency(mu, r)
    }

    /// Drag on a body with the given drag parameters, position and velocity
    /// relative to the central body.
    pub fn drag_acceleration(
        &self,
        gamma_stokes: Scalar,
        gamma_epstein: Scalar,
        radius: Scalar,
        mu: Scalar,
        position: Vector,
        velocity: Vector,
        t: Scalar,
    ) -> Vector {
        let rho = self.gas_density(position, t);
        if rho <= 0.0 {
            return Vector::ZERO;
        }

        let u = velocity - self.gas_velocity(mu, position);
        if radius < self.epstein_stokes_radius {
            let c_s = self.sound_speed(mu, cylindrical_radius(position));
            -u * (gamma_epstein * rho * c_s)
        } else {
            -u * (gamma_stokes * rho * u.length())
        }
    }

    /// Migration timescale in days, `None` when the body does not migrate.
    pub fn migration_timescale(&self, kind: MigrationType, mu: Scalar, r: Scalar, t: Scalar) -> Option<Scalar> {
        let depletion = self.depletion_factor(t);
        if depletion <= 0.0 || r <= 0.0 {
            return None;
        }

        let tau = match kind {
            MigrationType::None => return None,
            MigrationType::TypeI => self.tau.at(r),
            MigrationType::TypeII => {
                let h = self.scale_height.at(r);
                let viscosity = self.alpha * h * h * Self::keplerian_frequency(mu, r);
                if viscosity <= 0.0 {
                    return None;
                }
                r * r / viscosity
            }
        };

        (tau > 0.0).then_some(tau / depletion)
    }

    /// Damping pseudo-force of type I/II migration, switched off inside the
    /// body's stop distance.
    pub fn migration_acceleration(
        &self,
        migration: &Migration,
        mu: Scalar,
        position: Vector,
        velocity: Vector,
        t: Scalar,
    ) -> Vector {
        let r = position.length();
        if r <= migration.stop_at {
            return Vector::ZERO;
        }
        match self.migration_timescale(migration.kind, mu, r, t) {
            Some(tau) => -velocity / (2.0 * tau),
            None => Vector::ZERO,
        }
    }
}

fn cylindrical_radius(position: Vector) -> Scalar {
    libm::sqrt(position.x * position.x + position.y * position.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::math::{GAUSS_K, GAUSS_K2};

    #[test]
    fn test_power_law() {
        let law = PowerLaw::new(2.0, -1.5);
        assert_eq!(law.at(1.0), 2.0);
        assert!((law.at(4.0) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_depletion_factor() {
        let mut nebula = Nebula {
            decrease_type: GasDecreaseType::Linear,
            t0: 100.0,
            t1: 300.0,
            ..Default::default()
        };
        assert_eq!(nebula.depletion_factor(50.0), 1.0);
        assert!((nebula.depletion_factor(200.0) - 0.5).abs() < 1e-15);
        assert_eq!(nebula.depletion_factor(400.0), 0.0);

        nebula.decrease_type = GasDecreaseType::Exponential;
        nebula.timescale = 100.0;
        assert!((nebula.depletion_factor(200.0) - (-1.0f64).exp()).abs() < 1e-15);

        nebula.decrease_type = GasDecreaseType::Constant;
        assert_eq!(nebula.depletion_factor(1.0e9), 1.0);
    }

    #[test]
    fn test_gas_is_sub_keplerian_and_prograde() {
        let nebula = Nebula::default();
        let v = nebula.gas_velocity(GAUSS_K2, Vector::new(1.0, 0.0, 0.0));
        assert!(v.y > 0.0);
        assert!(v.y < GAUSS_K);
        assert!(v.x.abs() < 1e-18);
    }

    #[test]
    fn test_density_drops_off_the_midplane() {
        let nebula = Nebula::default();
        let midplane = nebula.gas_density(Vector::new(1.0, 0.0, 0.0), 0.0);
        let above = nebula.gas_density(Vector::new(1.0, 0.0, 0.05), 0.0);
        assert!(midplane > above);
        assert!((midplane - 2.36e-3).abs() < 1e-15);
    }

    #[test]
    fn test_drag_opposes_relative_motion() {
        let nebula = Nebula::default();
        let position = Vector::new(1.0, 0.0, 0.0);
        let gas = nebula.gas_velocity(GAUSS_K2, position);
        let velocity = gas + Vector::new(0.0, 1.0e-4, 0.0);

        let stokes = nebula.drag_acceleration(10.0, 0.0, 1.0e-9, GAUSS_K2, position, velocity, 0.0);
        assert!(stokes.y < 0.0);

        let epstein = nebula.drag_acceleration(0.0, 10.0, 1.0e-12, GAUSS_K2, position, velocity, 0.0);
        assert!(epstein.y < 0.0);

        let comoving = nebula.drag_acceleration(10.0, 10.0, 1.0e-9, GAUSS_K2, position, gas, 0.0);
        assert!(comoving.length() < 1e-20);
    }

    #[test]
    fn test_migration_stops_inside_stop_distance() {
        let nebula = Nebula::default();
        let migration = Migration {
            kind: MigrationType::TypeI,
            stop_at: 0.5,
        };
        let velocity = Vector::new(0.0, GAUSS_K, 0.0);

        let outside = nebula.migration_acceleration(&migration, GAUSS_K2, Vector::X, velocity, 0.0);
        assert!(outside.y < 0.0);

        let inside =
            nebula.migration_acceleration(&migration, GAUSS_K2, Vector::X * 0.4, velocity, 0.0);
        assert_eq!(inside, Vector::ZERO);
    }

    #[test]
    fn test_type_two_timescale_from_viscosity() {
        let nebula = Nebula::default();
        let tau = nebula
            .migration_timescale(MigrationType::TypeII, GAUSS_K2, 1.0, 0.0)
            .unwrap();
        let h = nebula.scale_height.at(1.0);
        let expected = 1.0 / (nebula.alpha * h * h * GAUSS_K);
        assert!((tau - expected).abs() / expected < 1e-12);
        assert!(nebula.migration_timescale(MigrationType::None, GAUSS_K2, 1.0, 0.0).is_none());
    }
}
