//! Unit conversion into the internal system (AU, day, solar mass, radian)

use crate::physics::math::{PI, Scalar};
use serde::{Deserialize, Serialize};

const KILOMETERS_PER_AU: Scalar = 1.495_978_707e8;
const SECONDS_PER_DAY: Scalar = 86_400.0;
const DAYS_PER_YEAR: Scalar = 365.25;
const KILOGRAMS_PER_SOLAR_MASS: Scalar = 1.988_47e30;
const JUPITER_MASSES_PER_SOLAR_MASS: Scalar = 1_047.348_644;
const EARTH_MASSES_PER_SOLAR_MASS: Scalar = 332_946.048_7;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Au,
    Km,
    M,
    Cm,
}

impl DistanceUnit {
    pub fn to_au(self, value: Scalar) -> Scalar {
        match self {
            Self::Au => value,
            Self::Km => value / KILOMETERS_PER_AU,
            Self::M => value / (KILOMETERS_PER_AU * 1.0e3),
            Self::Cm => value / (KILOMETERS_PER_AU * 1.0e5),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    #[default]
    Day,
    Year,
}

impl TimeUnit {
    pub fn to_days(self, value: Scalar) -> Scalar {
        match self {
            Self::Second => value / SECONDS_PER_DAY,
            Self::Minute => value / 1_440.0,
            Self::Hour => value / 24.0,
            Self::Day => value,
            Self::Year => value * DAYS_PER_YEAR,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VelocityUnit {
    #[default]
    AuPerDay,
    KmPerSecond,
    MPerSecond,
}

impl VelocityUnit {
    pub fn to_au_per_day(self, value: Scalar) -> Scalar {
        match self {
            Self::AuPerDay => value,
            Self::KmPerSecond => value * SECONDS_PER_DAY / KILOMETERS_PER_AU,
            Self::MPerSecond => value * SECONDS_PER_DAY / (KILOMETERS_PER_AU * 1.0e3),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    #[default]
    Solar,
    Jupiter,
    Earth,
    Kg,
}

impl MassUnit {
    pub fn to_solar(self, value: Scalar) -> Scalar {
        match self {
            Self::Solar => value,
            Self::Jupiter => value / JUPITER_MASSES_PER_SOLAR_MASS,
            Self::Earth => value / EARTH_MASSES_PER_SOLAR_MASS,
            Self::Kg => value / KILOGRAMS_PER_SOLAR_MASS,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DensityUnit {
    #[default]
    SolarPerAu3,
    GramPerCm3,
    KgPerM3,
}

impl DensityUnit {
    pub fn to_solar_per_au3(self, value: Scalar) -> Scalar {
        let au_in_m = KILOMETERS_PER_AU * 1.0e3;
        let kg_per_m3 = match self {
            Self::SolarPerAu3 => return value,
            Self::GramPerCm3 => value * 1.0e3,
            Self::KgPerM3 => value,
        };
        kg_per_m3 / KILOGRAMS_PER_SOLAR_MASS * au_in_m * au_in_m * au_in_m
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degree,
    Radian,
}

impl AngleUnit {
    pub fn to_radians(self, value: Scalar) -> Scalar {
        match self {
            Self::Degree => value * PI / 180.0,
            Self::Radian => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_conversion() {
        assert_eq!(DistanceUnit::Au.to_au(2.5), 2.5);
        assert!((DistanceUnit::Km.to_au(KILOMETERS_PER_AU) - 1.0).abs() < 1e-15);
        assert!((DistanceUnit::Cm.to_au(KILOMETERS_PER_AU * 1.0e5) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_time_conversion() {
        assert_eq!(TimeUnit::Year.to_days(2.0), 730.5);
        assert_eq!(TimeUnit::Hour.to_days(36.0), 1.5);
        assert!((TimeUnit::Second.to_days(86_400.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_earth_orbital_speed() {
        // Earth moves at roughly 29.78 km/s, i.e. close to k AU/day
        let v = VelocityUnit::KmPerSecond.to_au_per_day(29.78);
        assert!((v - 0.0172).abs() < 1e-4, "got {v}");
    }

    #[test]
    fn test_water_density() {
        let rho = DensityUnit::GramPerCm3.to_solar_per_au3(1.0);
        assert!((rho / 1.6837e6 - 1.0).abs() < 1e-3, "got {rho}");
    }

    #[test]
    fn test_mass_units() {
        assert!((MassUnit::Jupiter.to_solar(1.0) - 9.5479e-4).abs() < 1e-8);
        assert!((MassUnit::Earth.to_solar(1.0) - 3.0035e-6).abs() < 1e-9);
    }

    #[test]
    fn test_angle_units() {
        assert!((AngleUnit::Degree.to_radians(180.0) - PI).abs() < 1e-15);
        assert_eq!(AngleUnit::Radian.to_radians(1.25), 1.25);
    }

    #[test]
    fn test_units_parse_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            unit: TimeUnit,
            speed: VelocityUnit,
        }

        let parsed: Wrapper = toml::from_str("unit = \"year\"\nspeed = \"km_per_second\"").unwrap();
        assert_eq!(parsed.unit, TimeUnit::Year);
        assert_eq!(parsed.speed, VelocityUnit::KmPerSecond);
    }
}
