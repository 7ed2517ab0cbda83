/// South Atlantic Anomaly (exclusion polygon) constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::geo::point_in_polygon;

/// Configuration for South Atlantic Anomaly constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SAAConfig {
    /// Polygon defining the SAA region as (longitude, latitude) pairs in degrees
    pub polygon: Vec<(f64, f64)>,
}

impl SAAConfig {
    pub(crate) fn to_evaluator(&self) -> SAAEvaluator {
        SAAEvaluator {
            polygon: self.polygon.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SAAEvaluator {
    polygon: Vec<(f64, f64)>,
}

impl ConstraintEvaluator for SAAEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, _target: &[f64; 3]) -> Evaluation {
        let Some(geo) = sample.geodetic else {
            return Evaluation::fail(1.0);
        };
        if point_in_polygon(&self.polygon, geo.longitude_deg, geo.latitude_deg) {
            Evaluation::fail(1.0)
        } else {
            Evaluation::pass(1.0)
        }
    }

    fn name(&self) -> String {
        format!("SAAConstraint(vertices={})", self.polygon.len())
    }

    fn violation_description(&self) -> String {
        "In SAA region".to_string()
    }
}
