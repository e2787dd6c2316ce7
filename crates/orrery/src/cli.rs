//! Command line interface for Orrery

use clap::Parser;
use std::fmt;

use crate::config::SimulationConfig;
use crate::physics::integrators::registry::IntegratorRegistry;
use crate::physics::integrators::{MAX_ACCURACY, MIN_ACCURACY};

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be loaded
    ConfigLoad(String),
    /// Invalid integrator name provided
    InvalidIntegrator(String),
    /// Accuracy outside of the supported range
    InvalidAccuracy(f64),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ConfigLoad(msg) => write!(f, "Failed to load configuration: {msg}"),
            CliError::InvalidIntegrator(msg) => write!(f, "Invalid integrator: {msg}"),
            CliError::InvalidAccuracy(value) => write!(
                f,
                "Invalid accuracy {value}: expected a value in [{MIN_ACCURACY}, {MAX_ACCURACY}]"
            ),
        }
    }
}

impl std::error::Error for CliError {}

/// Orrery - adaptive N-body integrator for planetary systems
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to scenario file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Integrator type (e.g., rkf78, rkn76, rk4)
    #[arg(short = 'i', long, value_name = "TYPE")]
    pub integrator: Option<String>,

    /// log10 of the local error tolerance (overrides config file)
    #[arg(short = 'a', long, value_name = "VALUE", allow_hyphen_values = true)]
    pub accuracy: Option<f64>,

    /// Directory receiving the output files (overrides config file)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Random seed for disk generation
    #[arg(short = 's', long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// List available integrators and exit
    #[arg(long)]
    pub list_integrators: bool,

    /// Continue the run whose results are in the output directory
    #[arg(long = "continue")]
    pub resume: bool,
}

/// Handles the --list-integrators flag by printing available integrators and exiting
pub fn handle_list_integrators() {
    let registry = IntegratorRegistry::new();
    println!("Available integrators:");
    for name in registry.list_available() {
        println!("  - {name}");
    }

    let aliases = registry.list_aliases();
    if !aliases.is_empty() {
        println!("\nAliases:");
        for (alias, target) in aliases {
            println!("  - {alias} -> {target}");
        }
    }
}

/// Loads configuration from file or defaults, then applies command-line overrides
pub fn load_and_apply_config(args: &Args) -> Result<SimulationConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        println!("Loading configuration from: {config_path}");
        SimulationConfig::load(config_path).map_err(|e| CliError::ConfigLoad(e.to_string()))?
    } else {
        SimulationConfig::load_from_user_config()
    };

    if let Some(integrator_type) = &args.integrator {
        let registry = IntegratorRegistry::new();
        registry
            .create(integrator_type)
            .map_err(CliError::InvalidIntegrator)?;

        println!("Using integrator: {integrator_type}");
        config.integrator.name = integrator_type.clone();
    }

    if let Some(accuracy) = args.accuracy {
        if !(MIN_ACCURACY..=MAX_ACCURACY).contains(&accuracy) {
            return Err(CliError::InvalidAccuracy(accuracy));
        }
        println!("Overriding accuracy to: {accuracy}");
        config.integrator.accuracy = accuracy;
    }

    if let Some(output_dir) = &args.output_dir {
        println!("Writing output to: {output_dir}");
        config.output.directory = output_dir.clone();
    }

    if let Some(seed) = args.seed {
        println!("Using random seed: {seed}");
        config.seed = Some(seed);
    }

    Ok(config)
}
