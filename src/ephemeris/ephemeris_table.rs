//! In-memory ephemeris backed by tabulated position columns
//!
//! Holds the platform trajectory and Sun/Moon/body positions for every grid
//! instant, the way a propagated or kernel-interpolated ephemeris would after
//! it has been computed. Named body tables double as the local tier of the
//! body resolver.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ndarray::Array2;

use crate::ephemeris::ephemeris_common::{
    EphemerisContext, EphemerisSample, GeodeticLocation, PlatformKind, TimeGrid,
};
use crate::error::{ConstraintError, ResolutionError, Result};
use crate::resolver::{BodyId, BodySource};
use crate::utils::time_utils::seconds_between;
use crate::utils::vector_math::row3;

/// Tabulated ephemeris for one platform over one time grid
#[derive(Debug, Clone)]
pub struct EphemerisTable {
    grid: TimeGrid,
    platform: PlatformKind,
    /// Platform GCRS position (N x 3) or position+velocity (N x 6), km and km/s
    gcrs: Array2<f64>,
    sun_gcrs: Array2<f64>,
    moon_gcrs: Array2<f64>,
    geodetic: Option<Vec<GeodeticLocation>>,
    bodies: HashMap<String, Array2<f64>>,
}

fn check_rows(name: &str, data: &Array2<f64>, n: usize, min_cols: usize) -> Result<()> {
    if data.nrows() != n {
        return Err(ConstraintError::config(format!(
            "{name} has {} rows but the time grid has {n} samples",
            data.nrows()
        )));
    }
    if data.ncols() < min_cols {
        return Err(ConstraintError::config(format!(
            "{name} must have at least {min_cols} columns (got {})",
            data.ncols()
        )));
    }
    Ok(())
}

impl EphemerisTable {
    /// Create a table from aligned position columns
    ///
    /// `gcrs` may carry velocity in columns 3..6; constraints that need the
    /// orbit geometry (RAM, pole) require it.
    pub fn new(
        grid: TimeGrid,
        platform: PlatformKind,
        gcrs: Array2<f64>,
        sun_gcrs: Array2<f64>,
        moon_gcrs: Array2<f64>,
    ) -> Result<Self> {
        let n = grid.len();
        check_rows("platform positions", &gcrs, n, 3)?;
        check_rows("Sun positions", &sun_gcrs, n, 3)?;
        check_rows("Moon positions", &moon_gcrs, n, 3)?;
        Ok(EphemerisTable {
            grid,
            platform,
            gcrs,
            sun_gcrs,
            moon_gcrs,
            geodetic: None,
            bodies: HashMap::new(),
        })
    }

    /// Attach the per-sample geodetic point (site or ground track)
    pub fn with_geodetic(mut self, geodetic: Vec<GeodeticLocation>) -> Result<Self> {
        if geodetic.len() != self.grid.len() {
            return Err(ConstraintError::config(format!(
                "geodetic locations have {} entries but the time grid has {} samples",
                geodetic.len(),
                self.grid.len()
            )));
        }
        self.geodetic = Some(geodetic);
        Ok(self)
    }

    /// Attach geocentric positions (N x 3, km) for a named body
    pub fn with_body(mut self, body: &str, positions: Array2<f64>) -> Result<Self> {
        let id = BodyId::parse(body)
            .ok_or_else(|| ConstraintError::config("body identifier must not be empty"))?;
        check_rows(&format!("positions of body '{body}'"), &positions, self.grid.len(), 3)?;
        self.bodies.insert(id.key(), positions);
        Ok(self)
    }

    pub fn has_velocity(&self) -> bool {
        self.gcrs.ncols() >= 6
    }

    fn body_table(&self, body: &str) -> Option<&Array2<f64>> {
        BodyId::parse(body).and_then(|id| self.bodies.get(&id.key()))
    }

    /// Position of a tabulated body at an arbitrary instant, linearly
    /// interpolated between grid samples; `None` outside the grid
    fn interpolate_body(&self, table: &Array2<f64>, time: &DateTime<Utc>) -> Option<[f64; 3]> {
        let times = self.grid.as_slice();
        match times.binary_search(time) {
            Ok(i) => Some(row3(table, i)),
            Err(0) => None,
            Err(i) if i >= times.len() => None,
            Err(i) => {
                let (left, right) = (i - 1, i);
                let span = seconds_between(&times[left], &times[right]);
                let weight = if span > 0.0 {
                    seconds_between(&times[left], time) / span
                } else {
                    0.0
                };
                let a = row3(table, left);
                let b = row3(table, right);
                Some([
                    a[0] + weight * (b[0] - a[0]),
                    a[1] + weight * (b[1] - a[1]),
                    a[2] + weight * (b[2] - a[2]),
                ])
            }
        }
    }
}

impl EphemerisContext for EphemerisTable {
    fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn platform(&self) -> PlatformKind {
        self.platform
    }

    fn sample(&self, index: usize, bodies: &[String]) -> Result<EphemerisSample> {
        let time = *self.grid.get(index).ok_or(ConstraintError::IndexOutOfRange {
            index,
            len: self.grid.len(),
        })?;

        let velocity = if self.has_velocity() {
            Some([
                self.gcrs[[index, 3]],
                self.gcrs[[index, 4]],
                self.gcrs[[index, 5]],
            ])
        } else {
            None
        };

        let mut sample = EphemerisSample::from_positions(
            index,
            time,
            self.platform,
            row3(&self.gcrs, index),
            velocity,
            row3(&self.sun_gcrs, index),
            row3(&self.moon_gcrs, index),
        );
        if let Some(geo) = &self.geodetic {
            sample = sample.with_geodetic(geo[index]);
        }

        for body in bodies {
            let table = self.body_table(body).ok_or_else(|| ResolutionError::BodyNotFound {
                body: body.clone(),
            })?;
            sample = sample.with_body(body.clone(), row3(table, index));
        }

        Ok(sample)
    }
}

impl BodySource for EphemerisTable {
    fn tier_name(&self) -> &'static str {
        "ephemeris table"
    }

    fn locate(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
    ) -> std::result::Result<Vec<Option<[f64; 3]>>, ResolutionError> {
        let table = self
            .bodies
            .get(&body.key())
            .ok_or_else(|| ResolutionError::BodyNotFound { body: body.key() })?;
        Ok(times
            .iter()
            .map(|t| self.interpolate_body(table, t))
            .collect())
    }
}
