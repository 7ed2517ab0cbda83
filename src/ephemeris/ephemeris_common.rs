use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConstraintError, Result};
use crate::utils::config::{EARTH_RADIUS_KM, MAX_TIMESTAMPS, MOON_RADIUS_KM, SUN_RADIUS_KM};
use crate::utils::vector_math::{
    cross_product, negate, normalize_vector, radec_to_unit_vector, subtract, vector_magnitude,
};

/// Ordered, strictly increasing sequence of evaluation instants
///
/// Every evaluation call works against exactly one grid; results are aligned
/// with it index by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    times: Vec<DateTime<Utc>>,
}

impl TimeGrid {
    /// Wrap a list of instants, rejecting unsorted or duplicated entries
    pub fn new(times: Vec<DateTime<Utc>>) -> Result<Self> {
        if let Some(pos) = times.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ConstraintError::config(format!(
                "time grid must be strictly increasing (index {} is {} but index {} is {})",
                pos,
                times[pos].to_rfc3339(),
                pos + 1,
                times[pos + 1].to_rfc3339()
            )));
        }
        Ok(TimeGrid { times })
    }

    /// Generate timestamps from begin to end (inclusive) with step_size in seconds
    ///
    /// # Errors
    /// Returns a configuration error if:
    /// - begin > end
    /// - step_size <= 0
    /// - the expected timestamp count exceeds MAX_TIMESTAMPS
    pub fn generate(begin: DateTime<Utc>, end: DateTime<Utc>, step_size: i64) -> Result<Self> {
        if begin > end {
            return Err(ConstraintError::config(
                "begin must be before or equal to end",
            ));
        }
        if step_size <= 0 {
            return Err(ConstraintError::config("step_size must be positive"));
        }

        let time_range_secs = (end - begin).num_seconds();
        let expected_count = time_range_secs / step_size + 1;
        if expected_count > MAX_TIMESTAMPS {
            return Err(ConstraintError::config(format!(
                "Time range would generate approximately {expected_count} timestamps (max: {MAX_TIMESTAMPS}). Use a larger step_size."
            )));
        }

        let mut times = Vec::with_capacity(expected_count as usize);
        let mut current = begin;
        let step_duration = Duration::seconds(step_size);
        while current <= end {
            times.push(current);
            current += step_duration;
        }

        Ok(TimeGrid { times })
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DateTime<Utc>> {
        self.times.get(index)
    }

    /// Index of an instant that lies exactly on the grid
    pub fn index_of(&self, time: &DateTime<Utc>) -> Result<usize> {
        self.times
            .binary_search(time)
            .map_err(|_| ConstraintError::LookupBounds { time: *time })
    }

    /// Instants at the given indices. Indices must be in range and strictly
    /// increasing so the selection stays a sub-grid in time order.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<DateTime<Utc>>> {
        let selected = indices
            .iter()
            .map(|&i| {
                self.times
                    .get(i)
                    .copied()
                    .ok_or(ConstraintError::IndexOutOfRange {
                        index: i,
                        len: self.times.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(pair) = indices.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(ConstraintError::config(format!(
                "time indices must be strictly increasing, got {} after {}",
                pair[1], pair[0]
            )));
        }
        Ok(selected)
    }
}

/// Kind of observing platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Orbiting or free-flying platform
    Spacecraft,
    /// Fixed site on the Earth's surface
    Ground,
}

/// Geodetic point: the site of a ground platform or the sub-platform point
/// (ground track) of a spacecraft
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height_km: f64,
}

/// Everything the constraint evaluators need at one instant
///
/// Positions are geocentric GCRS in km; directions derived from them are
/// platform-relative.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisSample {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub platform: PlatformKind,
    pub position: [f64; 3],
    pub velocity: Option<[f64; 3]>,
    pub sun_position: [f64; 3],
    pub moon_position: [f64; 3],
    /// Apparent angular radius of the Sun seen from the platform (degrees)
    pub sun_radius_deg: f64,
    /// Apparent angular radius of the Moon seen from the platform (degrees)
    pub moon_radius_deg: f64,
    /// Apparent angular radius of the Earth seen from the platform (degrees)
    pub earth_radius_deg: f64,
    pub geodetic: Option<GeodeticLocation>,
    /// Geocentric positions of the named bodies requested for this sample
    pub bodies: Vec<(String, [f64; 3])>,
}

fn angular_radius_deg(radius_km: f64, distance_km: f64) -> f64 {
    if distance_km <= radius_km {
        90.0
    } else {
        (radius_km / distance_km).asin().to_degrees()
    }
}

impl EphemerisSample {
    /// Build a sample from raw geocentric vectors, deriving the angular radii
    pub fn from_positions(
        index: usize,
        time: DateTime<Utc>,
        platform: PlatformKind,
        position: [f64; 3],
        velocity: Option<[f64; 3]>,
        sun_position: [f64; 3],
        moon_position: [f64; 3],
    ) -> Self {
        let sun_dist = vector_magnitude(&subtract(&sun_position, &position));
        let moon_dist = vector_magnitude(&subtract(&moon_position, &position));
        let earth_dist = vector_magnitude(&position);
        EphemerisSample {
            index,
            time,
            platform,
            position,
            velocity,
            sun_position,
            moon_position,
            sun_radius_deg: angular_radius_deg(SUN_RADIUS_KM, sun_dist),
            moon_radius_deg: angular_radius_deg(MOON_RADIUS_KM, moon_dist),
            earth_radius_deg: angular_radius_deg(EARTH_RADIUS_KM, earth_dist),
            geodetic: None,
            bodies: Vec::new(),
        }
    }

    pub fn with_geodetic(mut self, geodetic: GeodeticLocation) -> Self {
        self.geodetic = Some(geodetic);
        self
    }

    pub fn with_body(mut self, name: impl Into<String>, position: [f64; 3]) -> Self {
        self.bodies.push((name.into(), position));
        self
    }

    /// Sun position relative to the platform (km)
    pub fn sun_relative(&self) -> [f64; 3] {
        subtract(&self.sun_position, &self.position)
    }

    /// Moon position relative to the platform (km)
    pub fn moon_relative(&self) -> [f64; 3] {
        subtract(&self.moon_position, &self.position)
    }

    /// Direction from the platform towards the Earth's centre
    pub fn earth_center_direction(&self) -> [f64; 3] {
        negate(&self.position)
    }

    /// Named body position relative to the platform (km)
    pub fn body_relative(&self, name: &str) -> Option<[f64; 3]> {
        self.bodies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, pos)| subtract(pos, &self.position))
    }

    /// Local zenith unit vector
    ///
    /// With a geodetic point the zenith follows the geodetic latitude on the
    /// platform's meridian; otherwise it is the geocentric radial direction.
    pub fn zenith(&self) -> [f64; 3] {
        if vector_magnitude(&self.position) == 0.0 {
            return [0.0, 0.0, 1.0];
        }
        match self.geodetic {
            Some(geo) => {
                let ra = self.position[1].atan2(self.position[0]).to_degrees();
                radec_to_unit_vector(ra, geo.latitude_deg)
            }
            None => normalize_vector(&self.position),
        }
    }

    /// Velocity (RAM) direction, if velocity is known
    pub fn ram_direction(&self) -> Option<[f64; 3]> {
        self.velocity
            .filter(|v| vector_magnitude(v) > 0.0)
            .map(|v| normalize_vector(&v))
    }

    /// Orbit normal r × v, if velocity is known and not parallel to position
    pub fn orbit_pole(&self) -> Option<[f64; 3]> {
        let v = self.velocity?;
        let pole = cross_product(&self.position, &v);
        if vector_magnitude(&pole) > 0.0 {
            Some(normalize_vector(&pole))
        } else {
            None
        }
    }
}

/// Read-only source of ephemeris samples indexed by time-grid position
///
/// Implementations own the platform trajectory and the Sun/Moon/body
/// positions; the constraint engine only borrows them.
pub trait EphemerisContext: Send + Sync {
    /// The grid every sample is aligned with
    fn time_grid(&self) -> &TimeGrid;

    /// Kind of observing platform
    fn platform(&self) -> PlatformKind;

    /// Sample at a grid index, including the positions of `bodies`
    fn sample(&self, index: usize, bodies: &[String]) -> Result<EphemerisSample>;

    /// Sample at an instant that must lie on the grid
    fn sample_at(&self, time: &DateTime<Utc>, bodies: &[String]) -> Result<EphemerisSample> {
        let index = self.time_grid().index_of(time)?;
        self.sample(index, bodies)
    }
}
