//! Conversion between Keplerian elements and Cartesian state.
//!
//! Positions are in AU, velocities in AU/day, angles in radians. The
//! gravitational parameter `mu` is `k^2 (M + m)`.

use crate::physics::body::{OrbitalElement, Phase};
use crate::physics::math::{Scalar, TAU, Vector};

const KEPLER_TOLERANCE: Scalar = 1.0e-15;
const KEPLER_MAX_ITERATIONS: usize = 50;

/// Solves `M = E - e sin(E)` for the eccentric anomaly with Newton-Raphson.
pub fn solve_kepler_equation(mean_anomaly: Scalar, eccentricity: Scalar) -> Scalar {
    let mean_anomaly = libm::fmod(mean_anomaly, TAU);
    let mut eccentric_anomaly = if eccentricity < 0.8 {
        mean_anomaly
    } else {
        core::f64::consts::PI
    };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = eccentric_anomaly - eccentricity * libm::sin(eccentric_anomaly) - mean_anomaly;
        let f_prime = 1.0 - eccentricity * libm::cos(eccentric_anomaly);
        let delta = f / f_prime;
        eccentric_anomaly -= delta;

        if delta.abs() < KEPLER_TOLERANCE {
            break;
        }
    }

    eccentric_anomaly
}

/// Cartesian state of a body on the given elliptic orbit, relative to the
/// primary.
pub fn to_phase(elements: &OrbitalElement, mu: Scalar) -> Phase {
    let a = elements.semi_major_axis;
    let e = elements.eccentricity;

    let eccentric_anomaly = solve_kepler_equation(elements.mean_anomaly, e);
    let true_anomaly = 2.0
        * libm::atan2(
            libm::sqrt(1.0 + e) * libm::sin(eccentric_anomaly / 2.0),
            libm::sqrt(1.0 - e) * libm::cos(eccentric_anomaly / 2.0),
        );

    let p = a * (1.0 - e * e);
    let r = p / (1.0 + e * libm::cos(true_anomaly));
    let speed_factor = libm::sqrt(mu / p);

    // Perifocal frame
    let (sin_v, cos_v) = (libm::sin(true_anomaly), libm::cos(true_anomaly));
    let position_pqw = (r * cos_v, r * sin_v);
    let velocity_pqw = (-speed_factor * sin_v, speed_factor * (e + cos_v));

    let (p_axis, q_axis) = perifocal_axes(elements);

    Phase {
        position: p_axis * position_pqw.0 + q_axis * position_pqw.1,
        velocity: p_axis * velocity_pqw.0 + q_axis * velocity_pqw.1,
    }
}

/// Unit vectors towards periapsis (P) and 90 degrees ahead in the orbital
/// plane (Q).
fn perifocal_axes(elements: &OrbitalElement) -> (Vector, Vector) {
    let (sin_w, cos_w) = (
        libm::sin(elements.argument_of_periapsis),
        libm::cos(elements.argument_of_periapsis),
    );
    let (sin_o, cos_o) = (
        libm::sin(elements.longitude_of_node),
        libm::cos(elements.longitude_of_node),
    );
    let (sin_i, cos_i) = (libm::sin(elements.inclination), libm::cos(elements.inclination));

    let p = Vector::new(
        cos_w * cos_o - sin_w * sin_o * cos_i,
        cos_w * sin_o + sin_w * cos_o * cos_i,
        sin_w * sin_i,
    );
    let q = Vector::new(
        -sin_w * cos_o - cos_w * sin_o * cos_i,
        -sin_w * sin_o + cos_w * cos_o * cos_i,
        cos_w * sin_i,
    );

    (p, q)
}

/// Elements of the osculating orbit for a relative state. Returns `None` for
/// unbound or degenerate states.
pub fn from_phase(phase: &Phase, mu: Scalar) -> Option<OrbitalElement> {
    let r = phase.position;
    let v = phase.velocity;
    let r_len = r.length();
    if r_len == 0.0 || mu <= 0.0 {
        return None;
    }

    let energy = 0.5 * v.length_squared() - mu / r_len;
    if energy >= 0.0 {
        return None;
    }
    let a = -mu / (2.0 * energy);

    let h = r.cross(v);
    let h_len = h.length();
    if h_len == 0.0 {
        return None;
    }

    let e_vec = v.cross(h) / mu - r / r_len;
    let e = e_vec.length();
    let inclination = libm::acos((h.z / h_len).clamp(-1.0, 1.0));

    let node_vec = Vector::Z.cross(h);
    let node_len = node_vec.length();

    let longitude_of_node = if node_len > 0.0 {
        wrap_angle(libm::atan2(node_vec.y, node_vec.x))
    } else {
        0.0
    };

    // Reference direction for the periapsis: the node line, or the x axis
    // for planar orbits
    let reference = if node_len > 0.0 {
        node_vec / node_len
    } else {
        Vector::X
    };
    let in_plane_normal = (h / h_len).cross(reference);

    let argument_of_periapsis = if e > 1.0e-12 {
        wrap_angle(libm::atan2(e_vec.dot(in_plane_normal), e_vec.dot(reference)))
    } else {
        0.0
    };

    let periapsis_direction = if e > 1.0e-12 {
        e_vec / e
    } else {
        reference
    };
    let periapsis_normal = (h / h_len).cross(periapsis_direction);
    let true_anomaly = libm::atan2(r.dot(periapsis_normal), r.dot(periapsis_direction));

    let eccentric_anomaly = 2.0
        * libm::atan2(
            libm::sqrt(1.0 - e) * libm::sin(true_anomaly / 2.0),
            libm::sqrt(1.0 + e) * libm::cos(true_anomaly / 2.0),
        );
    let mean_anomaly = wrap_angle(eccentric_anomaly - e * libm::sin(eccentric_anomaly));

    Some(OrbitalElement {
        semi_major_axis: a,
        eccentricity: e,
        inclination,
        argument_of_periapsis,
        longitude_of_node,
        mean_anomaly,
    })
}

/// Orbital period in days.
pub fn period(semi_major_axis: Scalar, mu: Scalar) -> Scalar {
    TAU * libm::sqrt(semi_major_axis * semi_major_axis * semi_major_axis / mu)
}

fn wrap_angle(angle: Scalar) -> Scalar {
    let wrapped = libm::fmod(angle, TAU);
    if wrapped < 0.0 { wrapped + TAU } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::math::{GAUSS_K, GAUSS_K2, PI};

    fn elements(a: Scalar, e: Scalar, i: Scalar, w: Scalar, o: Scalar, m: Scalar) -> OrbitalElement {
        OrbitalElement {
            semi_major_axis: a,
            eccentricity: e,
            inclination: i,
            argument_of_periapsis: w,
            longitude_of_node: o,
            mean_anomaly: m,
        }
    }

    #[test]
    fn test_kepler_equation_residual() {
        for &e in &[0.0, 0.1, 0.5, 0.9, 0.99] {
            for k in 0..12 {
                let m = k as Scalar * TAU / 12.0;
                let ea = solve_kepler_equation(m, e);
                let residual = ea - e * ea.sin() - libm::fmod(m, TAU);
                assert!(residual.abs() < 1e-12, "e = {e}, M = {m}: residual {residual}");
            }
        }
    }

    #[test]
    fn test_circular_orbit_at_one_au() {
        let phase = to_phase(&elements(1.0, 0.0, 0.0, 0.0, 0.0, 0.0), GAUSS_K2);

        assert!((phase.position - Vector::new(1.0, 0.0, 0.0)).length() < 1e-14);
        // Circular speed is k AU/day at 1 AU around one solar mass
        assert!((phase.velocity - Vector::new(0.0, GAUSS_K, 0.0)).length() < 1e-14);
    }

    #[test]
    fn test_periapsis_distance_and_speed() {
        let a = 2.0;
        let e = 0.5;
        let phase = to_phase(&elements(a, e, 0.3, 1.0, 2.0, 0.0), GAUSS_K2);

        assert!((phase.position.length() - a * (1.0 - e)).abs() < 1e-12);
        let vis_viva = libm::sqrt(GAUSS_K2 * (2.0 / (a * (1.0 - e)) - 1.0 / a));
        assert!((phase.velocity.length() - vis_viva).abs() < 1e-14);
        assert!(phase.position.dot(phase.velocity).abs() < 1e-14);
    }

    #[test]
    fn test_inclined_orbit_leaves_plane() {
        let phase = to_phase(&elements(1.0, 0.0, PI / 2.0, PI / 2.0, 0.0, 0.0), GAUSS_K2);
        assert!((phase.position.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_elements_recovered_from_phase() {
        let original = elements(1.5, 0.2, 0.1, 0.7, 1.2, 2.5);
        let phase = to_phase(&original, GAUSS_K2);
        let recovered = from_phase(&phase, GAUSS_K2).unwrap();

        assert!((recovered.semi_major_axis - original.semi_major_axis).abs() < 1e-12);
        assert!((recovered.eccentricity - original.eccentricity).abs() < 1e-12);
        assert!((recovered.inclination - original.inclination).abs() < 1e-12);
        assert!((recovered.longitude_of_node - original.longitude_of_node).abs() < 1e-10);
        assert!((recovered.argument_of_periapsis - original.argument_of_periapsis).abs() < 1e-10);
        assert!((recovered.mean_anomaly - original.mean_anomaly).abs() < 1e-10);
    }

    #[test]
    fn test_unbound_state_has_no_elements() {
        let phase = Phase {
            position: Vector::new(1.0, 0.0, 0.0),
            velocity: Vector::new(0.0, 1.0, 0.0),
        };
        assert!(from_phase(&phase, GAUSS_K2).is_none());
    }

    #[test]
    fn test_period_of_earth() {
        let days = period(1.0, GAUSS_K2);
        assert!((days - 365.2569).abs() < 1e-3, "got {days}");
    }
}
