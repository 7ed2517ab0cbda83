/// Vector math utilities for constraint calculations
///
/// This module provides helper functions for vector operations used in
/// astronomical constraint calculations, including coordinate conversions,
/// vector normalization, and angular separation calculations.
use ndarray::Array2;

/// Convert RA/Dec coordinates to a unit vector
///
/// # Arguments
/// * `ra_deg` - Right ascension in degrees
/// * `dec_deg` - Declination in degrees
///
/// # Returns
/// Unit vector [x, y, z] in ICRS/J2000 frame
pub fn radec_to_unit_vector(ra_deg: f64, dec_deg: f64) -> [f64; 3] {
    let ra_rad = ra_deg.to_radians();
    let dec_rad = dec_deg.to_radians();
    let cos_dec = dec_rad.cos();
    [
        cos_dec * ra_rad.cos(),
        cos_dec * ra_rad.sin(),
        dec_rad.sin(),
    ]
}

/// Convert a (not necessarily unit) direction vector to RA/Dec in degrees
///
/// RA is normalised to [0, 360). Returns `None` for the zero vector.
pub fn vector_to_radec(v: &[f64; 3]) -> Option<(f64, f64)> {
    let mag = vector_magnitude(v);
    if mag <= 0.0 || !mag.is_finite() {
        return None;
    }
    let ra = v[1].atan2(v[0]).to_degrees().rem_euclid(360.0);
    let dec = (v[2] / mag).clamp(-1.0, 1.0).asin().to_degrees();
    Some((ra, dec))
}

/// Normalize a 3D vector to unit length
///
/// Returns [0, 0, 0] if the input magnitude is zero
pub fn normalize_vector(v: &[f64; 3]) -> [f64; 3] {
    let mag = vector_magnitude(v);
    if mag > 0.0 {
        [v[0] / mag, v[1] / mag, v[2] / mag]
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// Dot product of two 3D vectors
pub fn dot_product(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product a × b
pub fn cross_product(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Magnitude (length) of a 3D vector
pub fn vector_magnitude(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Component-wise difference a - b
pub fn subtract(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Negated vector
pub fn negate(v: &[f64; 3]) -> [f64; 3] {
    [-v[0], -v[1], -v[2]]
}

/// Angular separation between two directions in degrees
///
/// Uses atan2(|a × b|, a · b), which keeps full precision near 0° and 180°
/// where the arccos form loses digits. Inputs need not be normalised and the
/// result is exactly symmetric in its arguments.
pub fn angular_separation(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let cross = cross_product(a, b);
    vector_magnitude(&cross)
        .atan2(dot_product(a, b))
        .to_degrees()
}

/// Angular separation between two RA/Dec positions in degrees
pub fn angular_separation_radec(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    angular_separation(
        &radec_to_unit_vector(ra1, dec1),
        &radec_to_unit_vector(ra2, dec2),
    )
}

/// Copy row `i` of an (N, >=3) array into a fixed 3-vector
pub fn row3(data: &Array2<f64>, i: usize) -> [f64; 3] {
    [data[[i, 0]], data[[i, 1]], data[[i, 2]]]
}

/// Convert multiple RA/Dec coordinates to unit vectors
///
/// Returns an array with shape (N, 3)
pub fn radec_to_unit_vectors_batch(ras_deg: &[f64], decs_deg: &[f64]) -> Array2<f64> {
    let n = ras_deg.len().min(decs_deg.len());
    let mut result = Array2::<f64>::zeros((n, 3));

    for (i, (&ra, &dec)) in ras_deg.iter().zip(decs_deg.iter()).enumerate() {
        let unit = radec_to_unit_vector(ra, dec);
        result[[i, 0]] = unit[0];
        result[[i, 1]] = unit[1];
        result[[i, 2]] = unit[2];
    }

    result
}
