/// Scalar type for physics calculations (f64 for precision)
pub type Scalar = f64;

/// 3D vector type for positions and velocities
pub type Vector = bevy::math::DVec3;

pub const PI: Scalar = core::f64::consts::PI;
pub const TAU: Scalar = core::f64::consts::TAU;

/// Gaussian gravitational constant (AU^(3/2) / (day * M_sun^(1/2)))
pub const GAUSS_K: Scalar = 0.01720209895;

/// Gravitational constant in AU^3 / (M_sun * day^2)
pub const GAUSS_K2: Scalar = GAUSS_K * GAUSS_K;

/// Number of scalars describing one body in the state vector
pub const STATE_STRIDE: usize = 6;

/// Hill radius of a body of `mass` orbiting a primary of `primary_mass`
/// at distance `orbital_radius`.
pub fn hill_radius(mass: Scalar, orbital_radius: Scalar, primary_mass: Scalar) -> Scalar {
    if primary_mass <= 0.0 {
        return 0.0;
    }
    orbital_radius * libm::cbrt(mass / (3.0 * primary_mass))
}

/// Mutual Hill radius of two bodies around the same primary, using the mean
/// of their distances to it.
pub fn mutual_hill_radius(
    mass_a: Scalar,
    mass_b: Scalar,
    distance_a: Scalar,
    distance_b: Scalar,
    primary_mass: Scalar,
) -> Scalar {
    hill_radius(mass_a + mass_b, 0.5 * (distance_a + distance_b), primary_mass)
}

/// Reads the position of body `index` from an interleaved state slice.
#[inline]
pub fn position_of(state: &[Scalar], index: usize) -> Vector {
    let offset = index * STATE_STRIDE;
    Vector::new(state[offset], state[offset + 1], state[offset + 2])
}

/// Reads the velocity of body `index` from an interleaved state slice.
#[inline]
pub fn velocity_of(state: &[Scalar], index: usize) -> Vector {
    let offset = index * STATE_STRIDE + 3;
    Vector::new(state[offset], state[offset + 1], state[offset + 2])
}

#[inline]
pub fn write_position(state: &mut [Scalar], index: usize, position: Vector) {
    let offset = index * STATE_STRIDE;
    state[offset..offset + 3].copy_from_slice(&position.to_array());
}

#[inline]
pub fn write_velocity(state: &mut [Scalar], index: usize, velocity: Vector) {
    let offset = index * STATE_STRIDE + 3;
    state[offset..offset + 3].copy_from_slice(&velocity.to_array());
}

/// Volume of a sphere with the given radius.
pub fn sphere_volume(radius: Scalar) -> Scalar {
    4.0 / 3.0 * PI * radius * radius * radius
}

/// Radius of a sphere with the given mass and density.
pub fn radius_from_density(mass: Scalar, density: Scalar) -> Scalar {
    if density <= 0.0 {
        return 0.0;
    }
    libm::cbrt(mass / density / (4.0 / 3.0 * PI))
}

/// Density of a sphere with the given mass and radius.
pub fn density_from_radius(mass: Scalar, radius: Scalar) -> Scalar {
    let volume = sphere_volume(radius);
    if volume <= 0.0 {
        return 0.0;
    }
    mass / volume
}
