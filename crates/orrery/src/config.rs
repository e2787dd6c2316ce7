//! Scenario configuration
//!
//! A scenario is a TOML file with the sections `integrator`, `timeline`,
//! `events`, `output`, the optional `nebula` and `disk`, and a list of
//! `body_groups`. Environment variables prefixed with `ORRERY_` override
//! file values, with `__` separating nested keys, e.g.
//! `ORRERY_INTEGRATOR__ACCURACY=-12`.

use crate::error::ConfigError;
use crate::events::{EventCondition, EventConditions};
use crate::generator::{DiskConfig, DiskGenerator};
use crate::physics::body::{
    Body, BodyError, BodyGroup, BodyGroupList, BodyIdAllocator, BodyType, Characteristics,
    Component, Designations, InitialCondition, LagrangePoint, Migration, MigrationType,
    OrbitalElement, Phase,
};
use crate::physics::body_data::FrameCenter;
use crate::physics::integrators::{MAX_ACCURACY, MIN_ACCURACY};
use crate::physics::math::{Scalar, Vector};
use crate::physics::nebula::Nebula;
use crate::output::OutputType;
use crate::physics::units::{
    AngleUnit, DensityUnit, DistanceUnit, MassUnit, TimeUnit, VelocityUnit,
};
use crate::simulation::timeline::TimeLine;
use bevy::prelude::*;
use directories::ProjectDirs;
use orrery_macros::ConfigDefaults;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Seed of the random disk; a fresh seed is drawn when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nebula: Option<Nebula>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskConfig>,
    #[serde(default)]
    pub body_groups: Vec<BodyGroupDefinition>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            integrator: IntegratorConfig::default(),
            timeline: TimelineConfig::default(),
            events: EventsConfig::default(),
            output: OutputConfig::default(),
            nebula: None,
            disk: None,
            body_groups: vec![BodyGroupDefinition::sun_and_jupiter()],
        }
    }
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Integrator name or alias, see `--list-integrators`
    #[default("rkf78")]
    pub name: String,

    /// log10 of the relative local error tolerance
    #[default(-10.0)]
    #[range(MIN_ACCURACY..=MAX_ACCURACY)]
    pub accuracy: Scalar,

    /// First trial step (days)
    #[default(1.0)]
    pub initial_step: Scalar,

    #[default(20)]
    #[range(1..)]
    pub max_iterations: usize,
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    #[default(0.0)]
    pub start: Scalar,

    /// Negative lengths integrate backwards
    #[default(100.0)]
    pub length: Scalar,

    /// Interval between output boundaries
    #[default(1.0)]
    pub output: Scalar,

    #[default(TimeUnit::Year)]
    pub unit: TimeUnit,

    /// Let each body group enter the integration at its own epoch plus
    /// offset instead of all at `start`
    #[default(false)]
    pub distinct_start_times: bool,
}

impl TimelineConfig {
    pub fn resolve(&self) -> Result<TimeLine, ConfigError> {
        TimeLine::new(
            self.unit.to_days(self.start),
            self.unit.to_days(self.length),
            self.unit.to_days(self.output),
        )
        .map_err(ConfigError::Invalid)
    }
}

/// Absolute distance threshold of the ejection and hit-centrum checks.
#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct DistanceCondition {
    #[default(0.0)]
    #[range(0.0..)]
    pub value: Scalar,

    #[default(DistanceUnit::Au)]
    pub unit: DistanceUnit,

    #[default(false)]
    pub stop: bool,
}

impl DistanceCondition {
    pub const fn new(value: Scalar, unit: DistanceUnit, stop: bool) -> Self {
        Self { value, unit, stop }
    }

    fn to_condition(self) -> EventCondition {
        EventCondition::new(self.unit.to_au(self.value), self.stop)
    }
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    #[default(DistanceCondition::new(100.0, DistanceUnit::Au, false))]
    pub ejection: DistanceCondition,

    #[default(DistanceCondition::new(0.005, DistanceUnit::Au, false))]
    pub hit_centrum: DistanceCondition,

    #[default(EventCondition::new(1.0, false))]
    pub collision: EventCondition,

    #[default(EventCondition::disabled())]
    pub close_encounter: EventCondition,

    #[default(EventCondition::disabled())]
    pub weak_capture: EventCondition,

    #[default(FrameCenter::Astro)]
    pub frame_center: FrameCenter,
}

impl EventsConfig {
    pub fn conditions(&self) -> EventConditions {
        EventConditions {
            ejection: self.ejection.to_condition(),
            hit_centrum: self.hit_centrum.to_condition(),
            collision: self.collision,
            close_encounter: self.close_encounter,
            weak_capture: self.weak_capture,
        }
    }

    fn validate(&self) -> Result<(), String> {
        self.ejection.validate_ranges()?;
        self.hit_centrum.validate_ranges()?;
        self.collision.validate_ranges()?;
        self.close_encounter.validate_ranges()?;
        self.weak_capture.validate_ranges()
    }
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    #[default("output")]
    pub directory: String,

    #[default(OutputType::Text)]
    #[serde(rename = "type")]
    pub output_type: OutputType,

    /// Run log with start parameters and milestones
    #[default("log.txt")]
    pub log: String,

    #[default("elapsed_times.txt")]
    pub elapsed_times: String,

    #[default("phases.txt")]
    pub phases: String,

    #[default("integrals.txt")]
    pub integrals: String,

    #[default("constant_properties.txt")]
    pub constant_properties: String,

    #[default("variable_properties.txt")]
    pub variable_properties: String,

    #[default("composition_properties.txt")]
    pub composition_properties: String,

    #[default("two_body_affairs.txt")]
    pub two_body_affairs: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BodyGroupDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
    #[serde(default)]
    pub offset: Scalar,
    #[serde(default)]
    pub reference_frame: String,
    pub bodies: Vec<BodyDefinition>,
}

impl BodyGroupDefinition {
    fn sun_and_jupiter() -> Self {
        Self {
            description: "Sun and Jupiter".to_string(),
            epoch: None,
            offset: 0.0,
            reference_frame: "ecliptic".to_string(),
            bodies: vec![
                BodyDefinition {
                    phase: Some(PhaseDefinition::default()),
                    characteristics: Some(CharacteristicsDefinition {
                        mass: 1.0,
                        radius: Some(695_700.0),
                        radius_unit: DistanceUnit::Km,
                        ..Default::default()
                    }),
                    ..BodyDefinition::new(BodyType::CentralBody, "Sun")
                },
                BodyDefinition {
                    orbital_element: Some(OrbitalElementDefinition {
                        sma: 5.2026,
                        ecc: 0.0485,
                        inc: 1.303,
                        peri: 273.867,
                        node: 100.464,
                        mean: 20.020,
                        distance_unit: DistanceUnit::Au,
                        angle_unit: AngleUnit::Degree,
                    }),
                    characteristics: Some(CharacteristicsDefinition {
                        mass: 1.0,
                        mass_unit: MassUnit::Jupiter,
                        radius: Some(71_492.0),
                        radius_unit: DistanceUnit::Km,
                        ..Default::default()
                    }),
                    ..BodyDefinition::new(BodyType::GiantPlanet, "Jupiter")
                },
            ],
        }
    }

    fn to_group(&self, ids: &mut BodyIdAllocator) -> Result<BodyGroup, BodyError> {
        let bodies = self
            .bodies
            .iter()
            .map(|body| body.to_body(ids.next_id()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BodyGroup {
            description: self.description.clone(),
            epoch: self.epoch.clone(),
            offset: self.offset,
            reference_frame: self.reference_frame.clone(),
            bodies,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BodyDefinition {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisional_designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpc_orbit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lagrange_point: Option<LagrangePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbital_element: Option<OrbitalElementDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<CharacteristicsDefinition>,
}

impl BodyDefinition {
    pub fn new(body_type: BodyType, name: impl Into<String>) -> Self {
        Self {
            body_type,
            name: name.into(),
            designation: None,
            provisional_designation: None,
            reference: None,
            opposition: None,
            mpc_orbit_type: None,
            lagrange_point: None,
            migration: None,
            phase: None,
            orbital_element: None,
            characteristics: None,
        }
    }

    pub fn to_body(&self, id: i64) -> Result<Body, BodyError> {
        let initial = match (&self.phase, &self.orbital_element) {
            (Some(phase), None) => InitialCondition::Phase(phase.resolve()),
            (None, Some(elements)) => InitialCondition::OrbitalElement(elements.resolve()),
            (Some(_), Some(_)) => {
                return Err(BodyError::Invalid(format!(
                    "'{}' has both a phase and orbital elements",
                    self.name
                )));
            }
            (None, None) => {
                return Err(BodyError::Invalid(format!(
                    "'{}' needs either a phase or orbital elements",
                    self.name
                )));
            }
        };

        let characteristics = self
            .characteristics
            .as_ref()
            .map(|c| c.resolve(self.body_type))
            .transpose()?;

        let migration = self.migration.map(|m| Migration {
            kind: m.kind,
            stop_at: m.unit.to_au(m.stop_at),
        });

        let body = Body::new(
            id,
            self.name.clone(),
            self.body_type,
            initial,
            characteristics,
            migration,
        )?;

        Ok(body.with_designations(Designations {
            designation: self.designation.clone(),
            provisional_designation: self.provisional_designation.clone(),
            reference: self.reference.clone(),
            opposition: self.opposition.clone(),
            mpc_orbit_type: self.mpc_orbit_type.clone(),
            lagrange_point: self.lagrange_point,
        }))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MigrationDefinition {
    #[serde(rename = "type")]
    pub kind: MigrationType,
    pub stop_at: Scalar,
    #[serde(default)]
    pub unit: DistanceUnit,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseDefinition {
    pub position: [Scalar; 3],
    pub velocity: [Scalar; 3],
    #[serde(default)]
    pub distance_unit: DistanceUnit,
    #[serde(default)]
    pub velocity_unit: VelocityUnit,
}

impl PhaseDefinition {
    fn resolve(&self) -> Phase {
        Phase {
            position: Vector::from_array(self.position.map(|x| self.distance_unit.to_au(x))),
            velocity: Vector::from_array(self.velocity.map(|v| self.velocity_unit.to_au_per_day(v))),
        }
    }
}

/// Keplerian elements with angles in `angle_unit`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct OrbitalElementDefinition {
    pub sma: Scalar,
    #[serde(default)]
    pub ecc: Scalar,
    #[serde(default)]
    pub inc: Scalar,
    #[serde(default)]
    pub peri: Scalar,
    #[serde(default)]
    pub node: Scalar,
    #[serde(default)]
    pub mean: Scalar,
    #[serde(default)]
    pub distance_unit: DistanceUnit,
    #[serde(default)]
    pub angle_unit: AngleUnit,
}

impl OrbitalElementDefinition {
    fn resolve(&self) -> OrbitalElement {
        let angle = |value| self.angle_unit.to_radians(value);
        OrbitalElement {
            semi_major_axis: self.distance_unit.to_au(self.sma),
            eccentricity: self.ecc,
            inclination: angle(self.inc),
            argument_of_periapsis: angle(self.peri),
            longitude_of_node: angle(self.node),
            mean_anomaly: angle(self.mean),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CharacteristicsDefinition {
    pub mass: Scalar,
    #[serde(default)]
    pub mass_unit: MassUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<Scalar>,
    #[serde(default)]
    pub radius_unit: DistanceUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Scalar>,
    #[serde(default)]
    pub density_unit: DensityUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_magnitude: Option<Scalar>,
    #[serde(default)]
    pub drag_coefficient: Scalar,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl CharacteristicsDefinition {
    fn resolve(&self, body_type: BodyType) -> Result<Characteristics, BodyError> {
        if self.drag_coefficient < 0.0 {
            return Err(BodyError::Invalid(
                "drag coefficient must be non-negative".to_string(),
            ));
        }

        let mut characteristics = Characteristics::resolve(
            body_type,
            self.mass_unit.to_solar(self.mass),
            self.radius.map(|r| self.radius_unit.to_au(r)),
            self.density.map(|d| self.density_unit.to_solar_per_au3(d)),
        )?
        .with_drag_coefficient(self.drag_coefficient)
        .with_components(self.components.clone())?;

        if let Some(magnitude) = self.absolute_magnitude {
            characteristics = characteristics.with_absolute_magnitude(magnitude);
        }
        Ok(characteristics)
    }
}

impl SimulationConfig {
    /// Loads a scenario file and applies `ORRERY_` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
            .add_source(
                ::config::Environment::with_prefix("ORRERY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config file {} not found. Using defaults.", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e} ({}). Using defaults.", path.display());
                Self::default()
            }
        }
    }

    /// Location of the per-user configuration file, if the platform has one
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "orrery").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load_from_user_config() -> Self {
        match Self::user_config_path() {
            Some(path) => Self::load_or_default(path),
            None => {
                warn!("No configuration directory on this platform. Using defaults.");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let section = |name: &str, result: Result<(), String>| {
            result.map_err(|msg| ConfigError::Invalid(format!("[{name}] {msg}")))
        };

        section("integrator", self.integrator.validate_ranges())?;
        let step = self.integrator.initial_step;
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "[integrator] initial_step must be positive, got {}",
                self.integrator.initial_step
            )));
        }
        self.timeline.resolve()?;
        section("events", self.events.validate())?;
        if let Some(nebula) = &self.nebula {
            section("nebula", nebula.validate_ranges())?;
        }
        if let Some(disk) = &self.disk {
            section("disk", disk.validate())?;
        }
        if self.body_groups.is_empty() {
            return Err(ConfigError::Invalid("no body groups defined".to_string()));
        }
        Ok(())
    }

    /// Resolves the body definitions, plus a generated disk when configured,
    /// into a validated group list. Ids are assigned in listing order.
    pub fn body_group_list<R: Rng>(&self, rng: &mut R) -> Result<BodyGroupList, ConfigError> {
        let mut ids = BodyIdAllocator::new();
        let mut groups = self
            .body_groups
            .iter()
            .map(|group| group.to_group(&mut ids))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(disk) = &self.disk {
            groups.push(DiskGenerator::new(disk.clone())?.generate(rng, &mut ids)?);
        }

        let list = BodyGroupList::new(groups);
        list.validate()?;
        Ok(list)
    }
}
