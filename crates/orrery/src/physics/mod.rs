pub mod acceleration;
pub mod body;
pub mod body_data;
pub mod integrators;
pub mod math;
pub mod nebula;
pub mod orbital_elements;
pub mod units;
