//! Local-horizon geometry and planar polygon tests
//!
//! Altitude and azimuth are measured in the frame spanned by the local zenith
//! and the projection of the celestial pole onto the horizon plane. This is the
//! geometric (unrefracted) horizon; refraction is applied by the constraints
//! that ask for it.

use crate::utils::vector_math::{cross_product, dot_product, normalize_vector, vector_magnitude};

const CELESTIAL_POLE: [f64; 3] = [0.0, 0.0, 1.0];

/// Altitude of a direction above the plane normal to `zenith` (degrees)
pub fn altitude_deg(direction: &[f64; 3], zenith: &[f64; 3]) -> f64 {
    let d = normalize_vector(direction);
    dot_product(&d, zenith).clamp(-1.0, 1.0).asin().to_degrees()
}

/// Altitude and azimuth of a direction (degrees)
///
/// Azimuth is measured from North through East and lies in [0, 360). At the
/// geographic poles North is undefined and azimuth is reported as 0.
pub fn alt_az_deg(direction: &[f64; 3], zenith: &[f64; 3]) -> (f64, f64) {
    let d = normalize_vector(direction);
    let alt = dot_product(&d, zenith).clamp(-1.0, 1.0).asin().to_degrees();

    let z_dot = dot_product(&CELESTIAL_POLE, zenith);
    let north_raw = [
        CELESTIAL_POLE[0] - z_dot * zenith[0],
        CELESTIAL_POLE[1] - z_dot * zenith[1],
        CELESTIAL_POLE[2] - z_dot * zenith[2],
    ];
    if vector_magnitude(&north_raw) < 1e-12 {
        return (alt, 0.0);
    }
    let north = normalize_vector(&north_raw);
    let east = cross_product(&north, zenith);

    let az = dot_product(&d, &east)
        .atan2(dot_product(&d, &north))
        .to_degrees()
        .rem_euclid(360.0);
    (alt, az)
}

/// Even-odd ray casting test of a point against a closed polygon
///
/// Vertices are (x, y) pairs; the closing edge from the last vertex back to
/// the first is implied.
pub fn point_in_polygon(polygon: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    for i in 0..n {
        let j = (i + 1) % n;
        let (x1, y1) = polygon[i];
        let (x2, y2) = polygon[j];

        if ((y1 > y) != (y2 > y)) && (x < x1 + (x2 - x1) * (y - y1) / (y2 - y1)) {
            inside = !inside;
        }
    }
    inside
}
