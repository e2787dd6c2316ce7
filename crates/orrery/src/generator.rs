//! Random planetesimal disks

use crate::physics::body::{
    Body, BodyError, BodyGroup, BodyIdAllocator, BodyType, Characteristics, InitialCondition,
    OrbitalElement,
};
use crate::physics::math::Scalar;
use crate::physics::units::{AngleUnit, DensityUnit, MassUnit};
use orrery_macros::ConfigDefaults;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed interval sampled uniformly.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct UniformRange {
    pub min: Scalar,
    pub max: Scalar,
}

impl UniformRange {
    pub const fn new(min: Scalar, max: Scalar) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Scalar {
        if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    fn check(&self, label: &str, lower: Scalar, upper: Scalar) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!("{label}: min {} exceeds max {}", self.min, self.max));
        }
        if self.min < lower || self.max > upper {
            return Err(format!(
                "{label}: [{}, {}] is outside of [{lower}, {upper}]",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

#[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DiskConfig {
    #[default("generated disk")]
    pub description: String,

    #[default(100)]
    pub count: usize,

    #[default(BodyType::Planetesimal)]
    pub body_type: BodyType,

    /// AU
    #[default(UniformRange::new(1.0, 3.0))]
    pub semi_major_axis: UniformRange,

    #[default(UniformRange::new(0.0, 0.1))]
    pub eccentricity: UniformRange,

    #[default(UniformRange::new(0.0, 1.0))]
    pub inclination: UniformRange,

    #[default(UniformRange::new(0.0, 360.0))]
    pub argument_of_periapsis: UniformRange,

    #[default(UniformRange::new(0.0, 360.0))]
    pub longitude_of_node: UniformRange,

    #[default(UniformRange::new(0.0, 360.0))]
    pub mean_anomaly: UniformRange,

    #[default(AngleUnit::Degree)]
    pub angle_unit: AngleUnit,

    #[default(UniformRange::new(1.0e-12, 1.0e-10))]
    pub mass: UniformRange,

    #[default(MassUnit::Solar)]
    pub mass_unit: MassUnit,

    #[default(2.0)]
    #[range(0.0..)]
    pub density: Scalar,

    #[default(DensityUnit::GramPerCm3)]
    pub density_unit: DensityUnit,

    #[default(0.0)]
    #[range(0.0..)]
    pub drag_coefficient: Scalar,
}

impl DiskConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.validate_ranges()?;
        self.semi_major_axis
            .check("semi_major_axis", Scalar::MIN_POSITIVE, Scalar::INFINITY)?;
        self.eccentricity.check("eccentricity", 0.0, 1.0 - Scalar::EPSILON)?;
        self.mass.check("mass", 0.0, Scalar::INFINITY)?;
        if self.body_type == BodyType::CentralBody {
            return Err("a disk cannot consist of central bodies".to_string());
        }
        let max_inclination = match self.angle_unit {
            AngleUnit::Degree => 180.0,
            AngleUnit::Radian => core::f64::consts::PI,
        };
        self.inclination.check("inclination", 0.0, max_inclination)
    }
}

/// Draws a group of bodies on random orbits around the central body.
#[derive(Debug, Clone)]
pub struct DiskGenerator {
    config: DiskConfig,
}

impl DiskGenerator {
    pub fn new(config: DiskConfig) -> Result<Self, BodyError> {
        config.validate().map_err(BodyError::Invalid)?;
        Ok(Self { config })
    }

    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        ids: &mut BodyIdAllocator,
    ) -> Result<BodyGroup, BodyError> {
        let config = &self.config;
        let angle = |value: Scalar| config.angle_unit.to_radians(value);

        let bodies = (0..config.count)
            .map(|n| {
                let elements = OrbitalElement {
                    semi_major_axis: config.semi_major_axis.sample(rng),
                    eccentricity: config.eccentricity.sample(rng),
                    inclination: angle(config.inclination.sample(rng)),
                    argument_of_periapsis: angle(config.argument_of_periapsis.sample(rng)),
                    longitude_of_node: angle(config.longitude_of_node.sample(rng)),
                    mean_anomaly: angle(config.mean_anomaly.sample(rng)),
                };

                let characteristics = if config.body_type == BodyType::TestParticle {
                    None
                } else {
                    let mass = config.mass_unit.to_solar(config.mass.sample(rng));
                    let density = config.density_unit.to_solar_per_au3(config.density);
                    let density = (density > 0.0).then_some(density);
                    Some(
                        Characteristics::resolve(config.body_type, mass, None, density)?
                            .with_drag_coefficient(config.drag_coefficient),
                    )
                };

                Body::new(
                    ids.next_id(),
                    format!("{}-{n}", config.body_type),
                    config.body_type,
                    InitialCondition::OrbitalElement(elements),
                    characteristics,
                    None,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BodyGroup {
            description: config.description.clone(),
            bodies,
            ..Default::default()
        })
    }
}
