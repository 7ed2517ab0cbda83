//! Moon-related calculations and utilities

use crate::utils::vector_math::angular_separation;

/// Calculate Moon illumination fraction from Sun/Moon vectors relative to observer.
///
/// # Arguments
/// * `sun_rel` - Sun position relative to observer (km)
/// * `moon_rel` - Moon position relative to observer (km)
///
/// # Returns
/// Moon illumination fraction (0.0 = new moon, 1.0 = full moon)
pub(crate) fn calculate_moon_illumination_from_vectors(
    sun_rel: [f64; 3],
    moon_rel: [f64; 3],
) -> f64 {
    let elongation = angular_separation(&sun_rel, &moon_rel).to_radians();
    ((1.0 - elongation.cos()) / 2.0).clamp(0.0, 1.0)
}

/// Descriptive name for a Moon illumination fraction
pub(crate) fn moon_phase_name(illumination: f64) -> &'static str {
    if illumination < 0.02 {
        "New Moon"
    } else if illumination < 0.48 {
        "Crescent"
    } else if illumination < 0.52 {
        "Quarter"
    } else if illumination < 0.98 {
        "Gibbous"
    } else {
        "Full Moon"
    }
}
