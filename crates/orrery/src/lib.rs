//! Orrery library
//!
//! Adaptive-step N-body integration of planetary systems: explicit
//! Runge-Kutta integrators with embedded error control, event detection with
//! body removal, and timeline-driven output.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod output;
pub mod physics;
pub mod plugins;
pub mod prelude;
pub mod resources;
pub mod simulation;
