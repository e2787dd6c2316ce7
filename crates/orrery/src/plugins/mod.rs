pub mod simulation;

pub use simulation::{RunType, SimulationPlugin};
