/// Altitude/Azimuth constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{check_range, ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::geo::{alt_az_deg, point_in_polygon};

/// Configuration for Altitude/Azimuth constraint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AltAzConfig {
    /// Minimum allowed altitude in degrees (0 = horizon, 90 = zenith)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_altitude: Option<f64>,
    /// Minimum allowed azimuth in degrees (0 = North, 90 = East)
    ///
    /// When greater than `max_azimuth` the allowed range wraps through North.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_azimuth: Option<f64>,
    /// Allowed region as (altitude, azimuth) vertices in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<(f64, f64)>>,
}

impl AltAzConfig {
    pub(crate) fn to_evaluator(&self) -> AltAzEvaluator {
        AltAzEvaluator {
            min_altitude: self.min_altitude,
            max_altitude: self.max_altitude,
            min_azimuth: self.min_azimuth,
            max_azimuth: self.max_azimuth,
            polygon: self.polygon.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AltAzEvaluator {
    min_altitude: Option<f64>,
    max_altitude: Option<f64>,
    min_azimuth: Option<f64>,
    max_azimuth: Option<f64>,
    polygon: Option<Vec<(f64, f64)>>,
}

/// Shortest angular distance between two azimuths (degrees)
fn azimuth_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

impl AltAzEvaluator {
    fn check_azimuth(&self, az: f64) -> Evaluation {
        let min = self.min_azimuth.unwrap_or(0.0);
        let max = self.max_azimuth.unwrap_or(360.0);
        let inside = if min <= max {
            az >= min && az <= max
        } else {
            az >= min || az <= max
        };
        let margin = azimuth_gap(az, min).min(azimuth_gap(az, max)) / 90.0;
        if inside {
            Evaluation::pass(margin)
        } else {
            Evaluation::fail(margin)
        }
    }
}

impl ConstraintEvaluator for AltAzEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, target: &[f64; 3]) -> Evaluation {
        let (alt, az) = alt_az_deg(target, &sample.zenith());
        let mut checks = vec![check_range(alt, self.min_altitude, self.max_altitude, |_| 90.0)];
        if self.min_azimuth.is_some() || self.max_azimuth.is_some() {
            checks.push(self.check_azimuth(az));
        }
        if let Some(polygon) = &self.polygon {
            checks.push(if point_in_polygon(polygon, alt, az) {
                Evaluation::pass(0.0)
            } else {
                Evaluation::fail(1.0)
            });
        }

        let worst = checks
            .iter()
            .filter(|c| !c.satisfied)
            .map(Evaluation::severity)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
        match worst {
            Some(severity) => Evaluation::fail(severity),
            None => Evaluation::pass(checks.iter().map(Evaluation::margin).fold(f64::INFINITY, f64::min)),
        }
    }

    fn name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(min_alt) = self.min_altitude {
            parts.push(format!("min_alt={min_alt:.1}°"));
        }
        if let Some(max_alt) = self.max_altitude {
            parts.push(format!("max_alt={max_alt:.1}°"));
        }
        if let Some(min_az) = self.min_azimuth {
            parts.push(format!("min_az={min_az:.1}°"));
        }
        if let Some(max_az) = self.max_azimuth {
            parts.push(format!("max_az={max_az:.1}°"));
        }
        if let Some(polygon) = &self.polygon {
            parts.push(format!("polygon={} vertices", polygon.len()));
        }
        format!("AltAzConstraint({})", parts.join(", "))
    }

    fn violation_description(&self) -> String {
        "Target outside the allowed altitude/azimuth region".to_string()
    }
}
