//! Accuracy tests for the Runge-Kutta family
//!
//! Checks each integrator against analytical solutions and verifies the
//! expected order of convergence and conservation behaviour.

use orrery::events::EventConditions;
use orrery::physics::acceleration::{AccelerationField, GravityField};
use orrery::physics::body::BodyType;
use orrery::physics::body_data::{BodyData, integral};
use orrery::physics::integrators::registry::IntegratorRegistry;
use orrery::physics::integrators::{
    DormandPrince76, Integrator, RungeKuttaFehlberg78, RungeKuttaFourthOrder, StepControl,
    Workspace,
};
use orrery::physics::math::{GAUSS_K2, STATE_STRIDE, Scalar, Vector};
use orrery::physics::orbital_elements;
use orrery::simulation::{Driver, LifecycleManager};

/// Harmonic oscillator x'' = -ω²x acting independently on every body
///
/// With x(0) = A, v(0) = 0 the solution is x(t) = A cos(ωt).
struct HarmonicOscillator {
    omega: Scalar,
}

impl AccelerationField for HarmonicOscillator {
    fn derivative(
        &self,
        _t: Scalar,
        y: &[Scalar],
        bodies: &BodyData,
        dydt: &mut [Scalar],
        _nearest: Option<&mut [Scalar]>,
    ) {
        dydt.fill(0.0);
        for i in bodies.active_indices() {
            let offset = i * STATE_STRIDE;
            for k in 0..3 {
                dydt[offset + k] = y[offset + 3 + k];
                dydt[offset + 3 + k] = -self.omega * self.omega * y[offset + k];
            }
        }
    }
}

fn oscillator(amplitude: Scalar, step: Scalar) -> BodyData {
    let mut bodies = BodyData::with_capacity(1);
    bodies.push(
        1,
        BodyType::CentralBody,
        1.0,
        0.0,
        Vector::new(amplitude, 0.0, 0.0),
        Vector::ZERO,
    );
    bodies.h = step;
    bodies
}

/// Integrates `bodies` to `target` and returns the driver for inspection.
fn integrate(
    integrator: Box<dyn Integrator>,
    accuracy: Scalar,
    bodies: &mut BodyData,
    field: &dyn AccelerationField,
    target: Scalar,
) -> Driver {
    let mut driver = Driver::new(integrator, StepControl::new(accuracy, 20).unwrap());
    let mut lifecycle = LifecycleManager::new(EventConditions::default());
    driver.prime(bodies, field);
    driver.drive(bodies, field, &mut lifecycle, target).unwrap();
    driver
}

fn oscillator_error(integrator: Box<dyn Integrator>, accuracy: Scalar, step: Scalar) -> Scalar {
    let field = HarmonicOscillator { omega: 1.0 };
    let mut bodies = oscillator(1.0, step);
    let t = 10.0;
    integrate(integrator, accuracy, &mut bodies, &field, t);
    (bodies.position(0).x - libm::cos(t)).abs()
}

#[test]
fn test_rk4_fourth_order_convergence() {
    let coarse = oscillator_error(Box::new(RungeKuttaFourthOrder), -10.0, 0.1);
    let fine = oscillator_error(Box::new(RungeKuttaFourthOrder), -10.0, 0.05);

    let ratio = coarse / fine;
    assert!(
        (12.0..20.0).contains(&ratio),
        "halving the step should cut the error ~16x, got {ratio} ({coarse:e} -> {fine:e})"
    );
}

#[test]
fn test_embedded_pairs_meet_tolerance() {
    for integrator in [
        Box::new(RungeKuttaFehlberg78) as Box<dyn Integrator>,
        Box::new(DormandPrince76),
    ] {
        let name = integrator.name().to_string();
        let error = oscillator_error(integrator, -12.0, 0.5);
        assert!(error < 1e-8, "{name}: error {error:e}");
    }
}

#[test]
fn test_tighter_tolerance_takes_more_steps() {
    let field = HarmonicOscillator { omega: 1.0 };

    let mut loose = oscillator(1.0, 0.5);
    let loose_driver = integrate(Box::new(DormandPrince76), -6.0, &mut loose, &field, 20.0);

    let mut tight = oscillator(1.0, 0.5);
    let tight_driver = integrate(Box::new(DormandPrince76), -12.0, &mut tight, &field, 20.0);

    assert!(tight_driver.statistics().accepted_steps > loose_driver.statistics().accepted_steps);
    assert!(
        (tight.position(0).x - libm::cos(20.0)).abs() < (loose.position(0).x - libm::cos(20.0)).abs()
    );
}

/// Distance from perihelion after one period of an e = 0.3 orbit taken in
/// `steps` equal steps, bypassing step-size control.
fn kepler_closure_error(integrator: &dyn Integrator, steps: usize) -> Scalar {
    let eccentricity = 0.3;
    let perihelion = 1.0 - eccentricity;
    let speed = libm::sqrt(GAUSS_K2 * (1.0 + eccentricity) / perihelion);

    let mut bodies = BodyData::with_capacity(2);
    bodies.push(1, BodyType::CentralBody, 1.0, 0.0, Vector::ZERO, Vector::ZERO);
    bodies.push(
        2,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(perihelion, 0.0, 0.0),
        Vector::new(0.0, speed, 0.0),
    );
    let field = GravityField::new();
    let dt = orbital_elements::period(1.0, GAUSS_K2) / steps as Scalar;
    let mut workspace = Workspace::new();

    for _ in 0..steps {
        bodies.refresh_derivatives(&field);
        integrator.step(&bodies, &field, dt, &mut workspace);
        bodies.y.copy_from_slice(&workspace.trial);
        bodies.time += dt;
    }

    (bodies.position(1) - bodies.position(0) - Vector::new(perihelion, 0.0, 0.0)).length()
}

#[test]
fn test_nystrom_pair_seventh_order_convergence() {
    let coarse = kepler_closure_error(&DormandPrince76, 100);
    let fine = kepler_closure_error(&DormandPrince76, 200);

    let ratio = coarse / fine;
    assert!(
        (100.0..180.0).contains(&ratio),
        "halving the step should cut the error ~128x, got {ratio} ({coarse:e} -> {fine:e})"
    );
}

#[test]
fn test_kepler_orbit_closes_after_one_period() {
    let eccentricity = 0.3;
    let perihelion = 1.0 - eccentricity;
    let speed = libm::sqrt(GAUSS_K2 * (1.0 + eccentricity) / perihelion);

    let mut bodies = BodyData::with_capacity(2);
    bodies.push(1, BodyType::CentralBody, 1.0, 0.0, Vector::ZERO, Vector::ZERO);
    bodies.push(
        2,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(perihelion, 0.0, 0.0),
        Vector::new(0.0, speed, 0.0),
    );
    bodies.h = 1.0;

    let period = orbital_elements::period(1.0, GAUSS_K2);
    let registry = IntegratorRegistry::new();
    integrate(
        registry.create("rkf78").unwrap(),
        -12.0,
        &mut bodies,
        &GravityField::new(),
        period,
    );

    let drift = (bodies.position(1) - Vector::new(perihelion, 0.0, 0.0)).length();
    assert!(drift < 1e-7, "orbit did not close: {drift:e} AU");
    assert!((bodies.velocity(1).y - speed).abs() < 1e-8);
}

#[test]
fn test_energy_and_angular_momentum_drift_bounded() {
    let circular = |a: Scalar| libm::sqrt(GAUSS_K2 / a);

    let mut bodies = BodyData::with_capacity(3);
    bodies.push(1, BodyType::CentralBody, 1.0, 0.0, Vector::ZERO, Vector::ZERO);
    bodies.push(
        2,
        BodyType::GiantPlanet,
        9.54e-4,
        0.0,
        Vector::new(5.2, 0.0, 0.0),
        Vector::new(0.0, circular(5.2), 0.0),
    );
    bodies.push(
        3,
        BodyType::GiantPlanet,
        2.86e-4,
        0.0,
        Vector::new(0.0, -9.5, 0.0),
        Vector::new(circular(9.5), 0.0, 0.0),
    );
    bodies.h = 10.0;
    bodies.compute_integrals();
    let energy = bodies.total_energy();
    let momentum = bodies.angular_momentum_norm();

    integrate(
        Box::new(RungeKuttaFehlberg78),
        -12.0,
        &mut bodies,
        &GravityField::new(),
        3650.0,
    );
    bodies.compute_integrals();

    let energy_drift = ((bodies.total_energy() - energy) / energy).abs();
    let momentum_drift = ((bodies.angular_momentum_norm() - momentum) / momentum).abs();
    assert!(energy_drift < 1e-8, "energy drift {energy_drift:e}");
    assert!(momentum_drift < 1e-8, "angular momentum drift {momentum_drift:e}");
    assert!(bodies.integrals[integral::MASS] > 1.0);
}
