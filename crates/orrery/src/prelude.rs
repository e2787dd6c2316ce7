//! Orrery prelude module
//!
//! Re-exports the types most code in this crate and its tests reach for.

// External crate re-exports
pub use bevy::prelude::*;
pub use rand::Rng;

// Internal re-exports - Config
pub use crate::config::SimulationConfig;

// Internal re-exports - Resources
pub use crate::resources::SharedRng;

// Internal re-exports - Physics
pub use crate::physics::body_data::BodyData;
pub use crate::physics::math::{Scalar, Vector};

// Internal re-exports - Simulation
pub use crate::error::SimulationError;
pub use crate::events::EventKind;
pub use crate::simulation::{RunOutcome, Simulation};
