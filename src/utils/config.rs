//! Physical constants and engine limits

use std::time::Duration;

/// Earth equatorial radius (WGS84) in km
pub const EARTH_RADIUS_KM: f64 = 6378.137;
/// Mean solar radius in km
pub const SUN_RADIUS_KM: f64 = 696_000.0;
/// Mean lunar radius in km
pub const MOON_RADIUS_KM: f64 = 1737.4;
/// Astronomical unit in km
pub const AU_TO_KM: f64 = 149_597_870.7;

/// Nominal atmospheric refraction at the horizon in degrees
pub const HORIZON_REFRACTION_DEG: f64 = 0.5667;

/// Sun altitude thresholds for the twilight levels (degrees)
pub const CIVIL_TWILIGHT_DEG: f64 = -6.0;
pub const NAUTICAL_TWILIGHT_DEG: f64 = -12.0;
pub const ASTRONOMICAL_TWILIGHT_DEG: f64 = -18.0;

/// Moon centre altitude above which part of the disc is visible ("partial")
pub const MOON_PARTIAL_VISIBILITY_DEG: f64 = -0.5;

/// Maximum nesting depth of a constraint tree
pub const MAX_CONSTRAINT_DEPTH: usize = 64;
/// Maximum number of nodes in a constraint tree
pub const MAX_CONSTRAINT_NODES: usize = 4096;

/// Maximum number of timestamps a generated grid may contain
pub const MAX_TIMESTAMPS: i64 = 10_000_000;

/// JPL Horizons API endpoint
pub const HORIZONS_API_URL: &str = "https://ssd.jpl.nasa.gov/api/horizons.api";
/// Default bound on a single Horizons request
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on rows requested from Horizons for one query
pub const HORIZONS_MAX_ROWS: i64 = 5000;

/// Environment variable overriding the Horizons endpoint
pub const HORIZONS_URL_ENV: &str = "RUST_EPHEM_HORIZONS_URL";
/// Environment variable overriding the Horizons timeout in seconds
pub const HORIZONS_TIMEOUT_ENV: &str = "RUST_EPHEM_HORIZONS_TIMEOUT_SECS";
