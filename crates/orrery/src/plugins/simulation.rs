//! Headless simulation plugin
//!
//! Resolves the configuration into resources and runs the whole timeline
//! from a single `Startup` system, then requests the app to exit with the
//! status of the run.

use crate::prelude::*;

use crate::error::SimulationError;
use crate::output::{OpenMode, RunLog, create_sink, read_checkpoint};
use crate::physics::integrators::registry::IntegratorRegistry;
use crate::simulation::{RunOutcome, Simulation};
use std::time::Instant;

/// Whether the run starts from the scenario or picks up the results
/// already in the output directory.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunType {
    #[default]
    New,
    Continue,
}

pub struct SimulationPlugin {
    config: Option<SimulationConfig>,
    run_type: RunType,
}

impl SimulationPlugin {
    pub fn new() -> Self {
        Self {
            config: None,
            run_type: RunType::New,
        }
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            config: Some(config),
            run_type: RunType::New,
        }
    }

    pub fn with_run_type(mut self, run_type: RunType) -> Self {
        self.run_type = run_type;
        self
    }
}

impl Default for SimulationPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = self
            .config
            .clone()
            .unwrap_or_else(SimulationConfig::load_from_user_config);

        match toml::to_string_pretty(&config) {
            Ok(toml_string) => {
                debug!("=== Current Configuration (TOML) ===\n{}", toml_string);
                debug!("=== End Configuration ===");
            }
            Err(e) => {
                error!("Failed to serialize configuration to TOML: {}", e);
            }
        }

        app.insert_resource(SharedRng::from_optional_seed(config.seed));
        app.insert_resource(config);
        app.insert_resource(self.run_type);
        app.init_resource::<IntegratorRegistry>();

        app.add_systems(Startup, run_simulation);
    }
}

fn run_simulation(
    config: Res<SimulationConfig>,
    registry: Res<IntegratorRegistry>,
    run_type: Res<RunType>,
    mut rng: ResMut<SharedRng>,
    mut exit: EventWriter<AppExit>,
) {
    let status = match execute(&config, &registry, *run_type, &mut rng) {
        Ok(RunOutcome::Completed { time }) => {
            info!("Simulation completed at t = {time} d");
            AppExit::Success
        }
        Ok(RunOutcome::Halted { time, event }) => {
            info!("Simulation stopped by {event} at t = {time} d");
            AppExit::Success
        }
        Err(e) => {
            error!("{e}");
            AppExit::error()
        }
    };
    exit.write(status);
}

fn execute(
    config: &SimulationConfig,
    registry: &IntegratorRegistry,
    run_type: RunType,
    rng: &mut SharedRng,
) -> Result<RunOutcome, SimulationError> {
    let started = Instant::now();
    let mut log = RunLog::open(&config.output)?;
    log.start_parameters(std::env::args())?;

    let (mut simulation, mode) = match run_type {
        RunType::New => (
            Simulation::from_config(config, registry, &mut **rng)?,
            OpenMode::Create,
        ),
        RunType::Continue => {
            let checkpoint = read_checkpoint(&config.output)?;
            (
                Simulation::resume(config, registry, &mut **rng, &checkpoint)?,
                OpenMode::Append,
            )
        }
    };
    log.write("Scenario was successfully loaded", true)?;

    let mut sink = create_sink(&config.output, mode)?;
    info!(
        "Writing {:?} output to {}",
        config.output.output_type, config.output.directory
    );
    let outcome = simulation.run(sink.as_mut());

    match &outcome {
        Ok(RunOutcome::Completed { time }) => log.write(&format!("Completed at t = {time} d"), false)?,
        Ok(RunOutcome::Halted { time, event }) => {
            log.write(&format!("Stopped by {event} at t = {time} d"), false)?
        }
        Err(e) => log.write(&format!("Failed: {e}"), false)?,
    }
    log.time_span("Total time:", started, true)?;
    outcome
}
