//! Error types shared by the configuration loader, the simulation and the
//! output writers

use crate::physics::body::BodyError;
use crate::physics::math::Scalar;
use std::fmt;

/// Configuration could not be loaded or failed validation
#[derive(Debug)]
pub enum ConfigError {
    Load(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Failed to load configuration: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<::config::ConfigError> for ConfigError {
    fn from(error: ::config::ConfigError) -> Self {
        ConfigError::Load(error.to_string())
    }
}

impl From<BodyError> for ConfigError {
    fn from(error: BodyError) -> Self {
        ConfigError::Invalid(error.to_string())
    }
}

/// Writing results failed
#[derive(Debug)]
pub enum OutputError {
    Io(std::io::Error),
    /// An existing result file could not be read back
    Corrupt(String),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Io(error) => write!(f, "Output failed: {error}"),
            OutputError::Corrupt(message) => write!(f, "Malformed result file: {message}"),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(error) => Some(error),
            OutputError::Corrupt(_) => None,
        }
    }
}

impl From<std::io::Error> for OutputError {
    fn from(error: std::io::Error) -> Self {
        OutputError::Io(error)
    }
}

/// Fatal conditions of a run
#[derive(Debug)]
pub enum SimulationError {
    Configuration(String),
    /// The step controller rejected more steps in a row than allowed
    Convergence {
        time: Scalar,
        step: Scalar,
        error_max: Scalar,
        attempts: usize,
    },
    /// Fewer than two bodies remain active
    DegenerateState(String),
    Output(OutputError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            SimulationError::Convergence {
                time,
                step,
                error_max,
                attempts,
            } => write!(
                f,
                "No convergence at t = {time} d after {attempts} rejected steps \
                 (last step {step:e} d, error {error_max:e})"
            ),
            SimulationError::DegenerateState(msg) => write!(f, "Degenerate state: {msg}"),
            SimulationError::Output(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Output(error) => Some(error),
            _ => None,
        }
    }
}

impl From<OutputError> for SimulationError {
    fn from(error: OutputError) -> Self {
        SimulationError::Output(error)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(error: ConfigError) -> Self {
        SimulationError::Configuration(error.to_string())
    }
}

impl From<BodyError> for SimulationError {
    fn from(error: BodyError) -> Self {
        SimulationError::Configuration(error.to_string())
    }
}
