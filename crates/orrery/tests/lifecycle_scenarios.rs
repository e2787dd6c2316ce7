//! End-to-end event scenarios
//!
//! Each scenario sets up a small system whose evolution triggers exactly one
//! event, runs it through a [`Simulation`] and inspects the published
//! records.

use orrery::error::SimulationError;
use orrery::events::{EventCondition, EventConditions, EventKind};
use orrery::output::MemorySink;
use orrery::physics::acceleration::{AccelerationField, GravityField};
use orrery::physics::body::BodyType;
use orrery::physics::body_data::BodyData;
use orrery::physics::integrators::registry::IntegratorRegistry;
use orrery::physics::integrators::StepControl;
use orrery::physics::math::{GAUSS_K2, Scalar, Vector};
use orrery::simulation::{Driver, LifecycleManager, RunOutcome, Simulation, TimeLine};

const SOLAR_RADIUS: Scalar = 0.00465;

fn circular_speed(distance: Scalar) -> Scalar {
    libm::sqrt(GAUSS_K2 / distance)
}

fn with_sun() -> BodyData {
    let mut bodies = BodyData::with_capacity(4);
    bodies.push(1, BodyType::CentralBody, 1.0, SOLAR_RADIUS, Vector::ZERO, Vector::ZERO);
    bodies
}

fn simulation(
    bodies: BodyData,
    integrator: &str,
    accuracy: Scalar,
    conditions: EventConditions,
    timeline: TimeLine,
) -> Simulation {
    let registry = IntegratorRegistry::new();
    let driver = Driver::new(
        registry.create(integrator).unwrap(),
        StepControl::new(accuracy, 20).unwrap(),
    );
    Simulation::new(
        bodies,
        Box::new(GravityField::new()),
        driver,
        LifecycleManager::new(conditions),
        timeline,
        Vec::new(),
    )
}

/// Two proto-planets at 1 AU approaching each other head on; they touch
/// shortly after t = 0.9 d.
fn converging_pair(step: Scalar) -> BodyData {
    let mut bodies = with_sun();
    bodies.push(
        2,
        BodyType::ProtoPlanet,
        1e-9,
        1e-4,
        Vector::new(1.0, 0.001, 0.0),
        Vector::new(0.0, -0.001, 0.0),
    );
    bodies.push(
        3,
        BodyType::ProtoPlanet,
        1e-9,
        1e-4,
        Vector::new(1.0, -0.001, 0.0),
        Vector::new(0.0, 0.001, 0.0),
    );
    bodies.push(
        4,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(-3.0, 0.0, 0.0),
        Vector::new(0.0, -circular_speed(3.0), 0.0),
    );
    bodies.h = step;
    bodies
}

#[test]
fn test_ejected_body_is_removed_once() {
    let mut bodies = with_sun();
    bodies.push(
        2,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(1.0, 0.0, 0.0),
        Vector::new(0.05, 0.0, 0.0),
    );
    bodies.push(
        3,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(0.0, -2.0, 0.0),
        Vector::new(circular_speed(2.0), 0.0, 0.0),
    );
    bodies.h = 1.0;

    let conditions = EventConditions {
        ejection: EventCondition::new(5.0, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        bodies,
        "rkf78",
        -10.0,
        conditions,
        TimeLine::new(0.0, 200.0, 20.0).unwrap(),
    );
    let mut sink = MemorySink::new();
    let outcome = simulation.run(&mut sink).unwrap();

    assert_eq!(outcome, RunOutcome::Completed { time: 200.0 });
    assert_eq!(sink.affairs.len(), 1);

    let affair = &sink.affairs[0];
    assert_eq!(affair.kind, EventKind::Ejection);
    assert_eq!((affair.body1_id, affair.body2_id), (2, 1));
    assert_eq!(affair.id, 1);
    let position = Vector::new(affair.body1_phase[0], affair.body1_phase[1], affair.body1_phase[2]);
    assert!(position.length() > 5.0);
    assert!(affair.time > 0.0 && affair.time < 200.0);

    let last = sink.last_phases().unwrap();
    assert_eq!(last.active_count, 2);
    let ids: Vec<_> = last.bodies.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, -2, 3]);
}

#[test]
fn test_infalling_body_hits_centrum() {
    let mut bodies = with_sun();
    bodies.push(
        2,
        BodyType::Planetesimal,
        0.0,
        0.0,
        Vector::new(0.5, 0.0, 0.0),
        Vector::ZERO,
    );
    bodies.push(
        3,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(3.0, 0.0, 0.0),
        Vector::new(0.0, circular_speed(3.0), 0.0),
    );
    bodies.h = 0.5;

    let conditions = EventConditions {
        hit_centrum: EventCondition::new(0.05, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        bodies,
        "rkf78",
        -10.0,
        conditions,
        TimeLine::new(0.0, 40.0, 5.0).unwrap(),
    );
    let mut sink = MemorySink::new();
    simulation.run(&mut sink).unwrap();

    assert_eq!(sink.affairs.len(), 1);
    assert_eq!(sink.affairs[0].kind, EventKind::HitCentrum);
    assert_eq!((sink.affairs[0].body1_id, sink.affairs[0].body2_id), (2, 1));
    assert!(!simulation.bodies().is_active(1));
    assert!(simulation.bodies().is_active(2));
}

#[test]
fn test_collision_removes_both_bodies() {
    let conditions = EventConditions {
        collision: EventCondition::new(1.0, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        converging_pair(0.01),
        "rk4",
        -10.0,
        conditions,
        TimeLine::new(0.0, 2.0, 0.25).unwrap(),
    );
    let mut sink = MemorySink::new();
    let outcome = simulation.run(&mut sink).unwrap();

    assert_eq!(outcome, RunOutcome::Completed { time: 2.0 });
    assert_eq!(sink.affairs.len(), 1);

    let affair = &sink.affairs[0];
    assert_eq!(affair.kind, EventKind::Collision);
    assert_eq!((affair.body1_id, affair.body2_id), (2, 3));
    assert!(affair.time > 0.85 && affair.time < 1.0, "collided at {}", affair.time);

    let ids: Vec<_> = sink
        .last_phases()
        .unwrap()
        .bodies
        .iter()
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(ids, vec![1, -2, -3, 4]);

    // Removed bodies drop out of the mass-carrying records as well
    let properties = sink.variable_properties.last().unwrap();
    assert_eq!(properties.1.len(), 2);
}

#[test]
fn test_collision_publishes_snapshot_at_event_time() {
    let conditions = EventConditions {
        collision: EventCondition::new(1.0, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        converging_pair(0.01),
        "rk4",
        -10.0,
        conditions,
        TimeLine::new(0.0, 2.0, 0.25).unwrap(),
    );
    let mut sink = MemorySink::new();
    simulation.run(&mut sink).unwrap();

    let collided_at = sink.affairs[0].time;
    assert!(collided_at % 0.25 != 0.0, "collision landed on a boundary");

    // Initial state, eight boundaries and the collision
    assert_eq!(sink.phases.len(), 10);
    assert_eq!(sink.integrals.len(), 10);
    assert_eq!(sink.variable_properties.len(), 10);

    let snapshot = sink
        .phases
        .iter()
        .find(|record| record.time == collided_at)
        .expect("no snapshot at the collision");
    assert_eq!(snapshot.active_count, 2);
    assert_eq!(snapshot.bodies[1].0, -2);
    assert_eq!(snapshot.bodies[2].0, -3);

    assert!(sink.integrals.iter().any(|record| record.time == collided_at));
    let properties = sink
        .variable_properties
        .iter()
        .find(|(time, _)| *time == collided_at)
        .unwrap();
    assert_eq!(properties.1.len(), 2);

    // Snapshots stay in time order
    assert!(sink.phases.windows(2).all(|pair| pair[0].time < pair[1].time));
}

#[test]
fn test_collision_with_stop_halts_the_run() {
    let conditions = EventConditions {
        collision: EventCondition::new(1.0, true),
        ..Default::default()
    };
    let mut simulation = simulation(
        converging_pair(0.01),
        "rk4",
        -10.0,
        conditions,
        TimeLine::new(0.0, 2.0, 0.25).unwrap(),
    );
    let mut sink = MemorySink::new();
    let outcome = simulation.run(&mut sink).unwrap();

    let RunOutcome::Halted { time, event } = outcome else {
        panic!("expected the collision to stop the run, got {outcome:?}");
    };
    assert_eq!(event, EventKind::Collision);
    assert!(time > 0.85 && time < 1.0);

    assert_eq!(sink.affairs.len(), 1);
    let last = sink.last_phases().unwrap();
    assert_eq!(last.time, time);
    assert_eq!(last.active_count, 4);
}

#[test]
fn test_losing_every_body_is_degenerate() {
    let mut bodies = with_sun();
    bodies.push(
        2,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(1.0, 0.0, 0.0),
        Vector::new(0.05, 0.0, 0.0),
    );
    bodies.h = 1.0;

    let conditions = EventConditions {
        ejection: EventCondition::new(2.0, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        bodies,
        "rkn76",
        -10.0,
        conditions,
        TimeLine::new(0.0, 100.0, 10.0).unwrap(),
    );

    let result = simulation.run(&mut MemorySink::new());
    assert!(matches!(result, Err(SimulationError::DegenerateState(_))));
}

#[test]
fn test_removed_body_exerts_no_force() {
    let field = GravityField::new();

    let mut full = with_sun();
    full.push(
        2,
        BodyType::GiantPlanet,
        1e-3,
        0.0,
        Vector::new(5.0, 0.0, 0.0),
        Vector::new(0.0, circular_speed(5.0), 0.0),
    );
    full.push(
        3,
        BodyType::GiantPlanet,
        3e-4,
        0.0,
        Vector::new(0.0, 9.0, 0.5),
        Vector::new(-circular_speed(9.0), 0.0, 0.0),
    );

    let mut reduced = with_sun();
    reduced.push(
        2,
        BodyType::GiantPlanet,
        1e-3,
        0.0,
        Vector::new(5.0, 0.0, 0.0),
        Vector::new(0.0, circular_speed(5.0), 0.0),
    );

    assert!(!full.remove(0), "the central body cannot be removed");
    assert!(full.remove(2));
    assert!(!full.remove(2), "removal is permanent and happens once");

    full.refresh_derivatives(&field);
    reduced.refresh_derivatives(&field);

    assert_eq!(&full.accel[..12], &reduced.accel[..]);
    assert!(full.accel[12..].iter().all(|&a| a == 0.0));
    assert_eq!(full.id, vec![1, 2, 3]);
    assert_eq!(full.index_of(2), Some(1));
    assert_eq!(full.active_indices().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_nonconvergence_leaves_state_untouched() {
    let mut bodies = with_sun();
    bodies.push(
        2,
        BodyType::TestParticle,
        0.0,
        0.0,
        Vector::new(1.0, 0.0, 0.0),
        Vector::new(0.0, circular_speed(1.0), 0.0),
    );
    bodies.h = 1000.0;
    let initial = bodies.y.clone();

    let registry = IntegratorRegistry::new();
    let driver = Driver::new(
        registry.create("rkf78").unwrap(),
        StepControl::new(-16.0, 2).unwrap(),
    );
    let mut simulation = Simulation::new(
        bodies,
        Box::new(GravityField::new()),
        driver,
        LifecycleManager::new(EventConditions::default()),
        TimeLine::new(0.0, 5000.0, 5000.0).unwrap(),
        Vec::new(),
    );
    let mut sink = MemorySink::new();

    let Err(SimulationError::Convergence { time, attempts, .. }) = simulation.run(&mut sink) else {
        panic!("expected the step controller to give up");
    };
    assert_eq!(time, 0.0);
    assert_eq!(attempts, 3);
    assert_eq!(simulation.bodies().y, initial);
    assert_eq!(simulation.bodies().time, 0.0);
    assert_eq!(sink.phases.len(), 1, "only the initial snapshot is published");
    assert_eq!(simulation.statistics().accepted_steps, 0);
}

#[test]
fn test_derivative_of_removed_slot_stays_zero_during_run() {
    let conditions = EventConditions {
        collision: EventCondition::new(1.0, false),
        ..Default::default()
    };
    let mut simulation = simulation(
        converging_pair(0.01),
        "rk4",
        -10.0,
        conditions,
        TimeLine::new(0.0, 1.5, 1.5).unwrap(),
    );
    simulation.run(&mut MemorySink::new()).unwrap();

    let bodies = simulation.bodies();
    let mut dydt = vec![1.0; bodies.y.len()];
    GravityField::new().derivative(bodies.time, &bodies.y, bodies, &mut dydt, None);
    assert!(dydt[6..18].iter().all(|&d| d == 0.0));
    assert!(dydt[18..].iter().any(|&d| d != 0.0));
}
