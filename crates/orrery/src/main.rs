use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use orrery::cli::{Args, handle_list_integrators, load_and_apply_config};
use orrery::plugins::{RunType, SimulationPlugin};

fn main() -> AppExit {
    let args = Args::parse();

    if args.list_integrators {
        handle_list_integrators();
        return AppExit::Success;
    }

    let config = match load_and_apply_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return AppExit::error();
        }
    };

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let run_type = if args.resume { RunType::Continue } else { RunType::New };

    let mut app = App::new();
    app.add_plugins((
        LogPlugin {
            level,
            ..default()
        },
        SimulationPlugin::with_config(config).with_run_type(run_type),
    ));
    app.run()
}
