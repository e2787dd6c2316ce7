//! Logical body descriptions, resolved and validated before integration

use crate::physics::math::{Scalar, Vector, density_from_radius, radius_from_density};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a body. Removed bodies are reported with the negated id.
pub type BodyId = i64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    CentralBody,
    GiantPlanet,
    RockyPlanet,
    ProtoPlanet,
    SuperPlanetesimal,
    Planetesimal,
    TestParticle,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::CentralBody => "central_body",
            BodyType::GiantPlanet => "giant_planet",
            BodyType::RockyPlanet => "rocky_planet",
            BodyType::ProtoPlanet => "proto_planet",
            BodyType::SuperPlanetesimal => "super_planetesimal",
            BodyType::Planetesimal => "planetesimal",
            BodyType::TestParticle => "test_particle",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MigrationType {
    #[default]
    None,
    #[serde(alias = "i")]
    TypeI,
    #[serde(alias = "ii")]
    TypeII,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Migration {
    pub kind: MigrationType,
    /// Migration stops inside this distance from the central body (AU)
    pub stop_at: Scalar,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LagrangePoint {
    L1,
    L2,
    L3,
    L4,
    L5,
}

/// Cartesian state in AU and AU/day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phase {
    pub position: Vector,
    pub velocity: Vector,
}

/// Keplerian elements in AU and radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitalElement {
    pub semi_major_axis: Scalar,
    pub eccentricity: Scalar,
    pub inclination: Scalar,
    pub argument_of_periapsis: Scalar,
    pub longitude_of_node: Scalar,
    pub mean_anomaly: Scalar,
}

/// How the initial state of a body is given. Exactly one form is present.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitialCondition {
    Phase(Phase),
    OrbitalElement(OrbitalElement),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Component {
    pub name: String,
    /// Percentage of the body's mass
    pub ratio: Scalar,
}

/// Physical properties in solar masses, AU and M_sun/AU^3.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Characteristics {
    pub mass: Scalar,
    pub radius: Scalar,
    pub density: Scalar,
    pub absolute_magnitude: Option<Scalar>,
    pub drag_coefficient: Scalar,
    pub components: Vec<Component>,
}

impl Characteristics {
    /// Builds the property block, deriving whichever of radius or density is
    /// missing from the mass.
    pub fn resolve(
        body_type: BodyType,
        mass: Scalar,
        radius: Option<Scalar>,
        density: Option<Scalar>,
    ) -> Result<Self, BodyError> {
        if mass < 0.0 {
            return Err(BodyError::Invalid(format!("mass must be non-negative, got {mass}")));
        }

        let (radius, density) = match (radius, density) {
            (Some(_), Some(_)) if body_type != BodyType::SuperPlanetesimal => {
                return Err(BodyError::Invalid(
                    "radius and density cannot both be given".to_string(),
                ));
            }
            (Some(radius), Some(density)) => (radius, density),
            (Some(radius), None) => (radius, density_from_radius(mass, radius)),
            (None, Some(density)) => (radius_from_density(mass, density), density),
            (None, None) => (0.0, 0.0),
        };

        if radius < 0.0 || density < 0.0 {
            return Err(BodyError::Invalid(
                "radius and density must be non-negative".to_string(),
            ));
        }

        Ok(Self {
            mass,
            radius,
            density,
            ..Default::default()
        })
    }

    pub fn with_drag_coefficient(mut self, drag_coefficient: Scalar) -> Self {
        self.drag_coefficient = drag_coefficient;
        self
    }

    pub fn with_absolute_magnitude(mut self, absolute_magnitude: Scalar) -> Self {
        self.absolute_magnitude = Some(absolute_magnitude);
        self
    }

    pub fn with_components(mut self, components: Vec<Component>) -> Result<Self, BodyError> {
        validate_components(&components)?;
        self.components = components;
        Ok(self)
    }

    /// Stokes drag parameter `3/8 Cd / (rho R)`.
    pub fn gamma_stokes(&self) -> Scalar {
        let denominator = self.density * self.radius;
        if denominator > 0.0 {
            3.0 / 8.0 * self.drag_coefficient / denominator
        } else {
            0.0
        }
    }

    /// Epstein drag parameter `1 / (rho R)`.
    pub fn gamma_epstein(&self) -> Scalar {
        let denominator = self.density * self.radius;
        if denominator > 0.0 { 1.0 / denominator } else { 0.0 }
    }
}

const COMPONENT_SUM_TOLERANCE: Scalar = 1.0e-4;

fn validate_components(components: &[Component]) -> Result<(), BodyError> {
    if components.is_empty() {
        return Ok(());
    }

    for component in components {
        if !(0.0..=100.0).contains(&component.ratio) {
            return Err(BodyError::Invalid(format!(
                "component '{}' has ratio {} outside of [0, 100]",
                component.name, component.ratio
            )));
        }
    }

    let total: Scalar = components.iter().map(|c| c.ratio).sum();
    if (total - 100.0).abs() > COMPONENT_SUM_TOLERANCE {
        return Err(BodyError::Invalid(format!(
            "component ratios sum to {total}, expected 100"
        )));
    }

    Ok(())
}

/// Descriptive fields carried through to the constant property records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Designations {
    pub designation: Option<String>,
    pub provisional_designation: Option<String>,
    pub reference: Option<String>,
    pub opposition: Option<String>,
    pub mpc_orbit_type: Option<String>,
    pub lagrange_point: Option<LagrangePoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    pub body_type: BodyType,
    pub migration: Option<Migration>,
    pub initial: InitialCondition,
    pub characteristics: Option<Characteristics>,
    pub designations: Designations,
}

impl Body {
    pub fn new(
        id: BodyId,
        name: impl Into<String>,
        body_type: BodyType,
        initial: InitialCondition,
        characteristics: Option<Characteristics>,
        migration: Option<Migration>,
    ) -> Result<Self, BodyError> {
        let name = name.into();

        if body_type == BodyType::TestParticle {
            if characteristics.is_some() {
                return Err(BodyError::Invalid(format!(
                    "test particle '{name}' cannot have characteristics"
                )));
            }
            if migration.is_some_and(|m| m.kind != MigrationType::None) {
                return Err(BodyError::Invalid(format!(
                    "test particle '{name}' cannot migrate"
                )));
            }
        }

        if let Some(migration) = migration {
            if migration.kind != MigrationType::None && migration.stop_at <= 0.0 {
                return Err(BodyError::Invalid(format!(
                    "migration of '{name}' needs a positive stop distance"
                )));
            }
        }

        if let InitialCondition::OrbitalElement(elements) = &initial {
            validate_elements(&name, elements)?;
        }

        Ok(Self {
            id,
            name,
            body_type,
            migration,
            initial,
            characteristics,
            designations: Designations::default(),
        })
    }

    pub fn with_designations(mut self, designations: Designations) -> Self {
        self.designations = designations;
        self
    }

    pub fn mass(&self) -> Scalar {
        self.characteristics.as_ref().map_or(0.0, |c| c.mass)
    }
}

fn validate_elements(name: &str, elements: &OrbitalElement) -> Result<(), BodyError> {
    if elements.semi_major_axis <= 0.0 {
        return Err(BodyError::Invalid(format!(
            "'{name}' needs a positive semi-major axis"
        )));
    }
    if !(0.0..1.0).contains(&elements.eccentricity) {
        return Err(BodyError::Invalid(format!(
            "'{name}' has eccentricity {} outside of [0, 1)",
            elements.eccentricity
        )));
    }
    if !(0.0..=core::f64::consts::PI).contains(&elements.inclination) {
        return Err(BodyError::Invalid(format!(
            "'{name}' has inclination {} outside of [0, pi]",
            elements.inclination
        )));
    }
    Ok(())
}

/// Hands out globally unique, monotonically increasing body ids.
#[derive(Debug, Clone)]
pub struct BodyIdAllocator {
    next: BodyId,
}

impl BodyIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> BodyId {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for BodyIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyGroup {
    pub description: String,
    pub epoch: Option<String>,
    pub offset: Scalar,
    pub reference_frame: String,
    pub bodies: Vec<Body>,
}

impl BodyGroup {
    /// Time at which the group enters the integration when start times are
    /// distinct: the epoch, a Julian date in days, plus `offset` days.
    /// Groups without an epoch start at `timeline_start + offset`.
    pub fn start_time(&self, timeline_start: Scalar) -> Result<Scalar, BodyError> {
        let epoch = match self.epoch.as_deref().map(str::trim) {
            None | Some("") => timeline_start,
            Some(text) => text.parse::<Scalar>().map_err(|_| {
                BodyError::Invalid(format!(
                    "undefined epoch format '{text}' in group '{}'",
                    self.description
                ))
            })?,
        };
        Ok(epoch + self.offset)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyGroupList {
    pub groups: Vec<BodyGroup>,
}

impl BodyGroupList {
    pub fn new(groups: Vec<BodyGroup>) -> Self {
        Self { groups }
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.groups.iter().flat_map(|group| group.bodies.iter())
    }

    pub fn count_of(&self, body_type: BodyType) -> usize {
        self.bodies().filter(|b| b.body_type == body_type).count()
    }

    /// Checks the list-level invariants: exactly one central body, listed
    /// first, and unique ids.
    pub fn validate(&self) -> Result<(), BodyError> {
        let central_bodies = self.count_of(BodyType::CentralBody);
        if central_bodies != 1 {
            return Err(BodyError::Invalid(format!(
                "exactly one central body is required, found {central_bodies}"
            )));
        }

        match self.bodies().next() {
            Some(first) if first.body_type == BodyType::CentralBody => {}
            _ => {
                return Err(BodyError::Invalid(
                    "the central body must be the first body of the first group".to_string(),
                ));
            }
        }

        if self.bodies().count() < 2 {
            return Err(BodyError::Invalid(
                "at least one body besides the central body is required".to_string(),
            ));
        }

        let mut ids: Vec<BodyId> = self.bodies().map(|b| b.id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(BodyError::Invalid("body ids must be unique".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyError {
    Invalid(String),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Invalid(msg) => write!(f, "Invalid body definition: {msg}"),
        }
    }
}

impl std::error::Error for BodyError {}
