/// Daytime constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::config::{ASTRONOMICAL_TWILIGHT_DEG, CIVIL_TWILIGHT_DEG, NAUTICAL_TWILIGHT_DEG};
use crate::utils::geo::altitude_deg;

/// Twilight type for daytime constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwilightType {
    /// Civil twilight (-6° below horizon)
    #[default]
    #[serde(alias = "Civil")]
    Civil,
    /// Nautical twilight (-12° below horizon)
    #[serde(alias = "Nautical")]
    Nautical,
    /// Astronomical twilight (-18° below horizon)
    #[serde(alias = "Astronomical")]
    Astronomical,
    /// No twilight - any Sun above the horizon counts as day
    #[serde(alias = "None")]
    None,
}

impl TwilightType {
    /// Sun altitude above which it counts as daytime (degrees)
    pub fn sun_altitude_threshold(self) -> f64 {
        match self {
            TwilightType::Civil => CIVIL_TWILIGHT_DEG,
            TwilightType::Nautical => NAUTICAL_TWILIGHT_DEG,
            TwilightType::Astronomical => ASTRONOMICAL_TWILIGHT_DEG,
            TwilightType::None => 0.0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TwilightType::Civil => "civil",
            TwilightType::Nautical => "nautical",
            TwilightType::Astronomical => "astronomical",
            TwilightType::None => "none",
        }
    }
}

/// Configuration for daytime avoidance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaytimeConfig {
    #[serde(default)]
    pub twilight: TwilightType,
}

impl DaytimeConfig {
    pub(crate) fn to_evaluator(&self) -> DaytimeEvaluator {
        DaytimeEvaluator {
            twilight: self.twilight,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DaytimeEvaluator {
    twilight: TwilightType,
}

impl ConstraintEvaluator for DaytimeEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, _target: &[f64; 3]) -> Evaluation {
        let sun_alt = altitude_deg(&sample.sun_relative(), &sample.zenith());
        let threshold = self.twilight.sun_altitude_threshold();
        if sun_alt > threshold {
            Evaluation::fail((sun_alt - threshold) / 90.0)
        } else {
            Evaluation::pass((threshold - sun_alt) / 90.0)
        }
    }

    fn name(&self) -> String {
        format!("DaytimeConstraint(twilight={})", self.twilight.as_str())
    }

    fn violation_description(&self) -> String {
        format!("Daytime ({} twilight)", self.twilight.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{GeodeticLocation, PlatformKind};
    use crate::utils::config::{AU_TO_KM, EARTH_RADIUS_KM};
    use crate::utils::vector_math::radec_to_unit_vector;
    use chrono::{TimeZone, Utc};

    fn site_with_sun_altitude(alt: f64) -> EphemerisSample {
        // Site on +x at the equator; the Sun sits in the x-y plane.
        let dir = radec_to_unit_vector(90.0 - alt, 0.0);
        EphemerisSample::from_positions(
            0,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            PlatformKind::Ground,
            [EARTH_RADIUS_KM, 0.0, 0.0],
            None,
            [dir[0] * AU_TO_KM, dir[1] * AU_TO_KM, dir[2] * AU_TO_KM],
            [0.0, 0.0, 3.8e5],
        )
        .with_geodetic(GeodeticLocation { latitude_deg: 0.0, longitude_deg: 0.0, height_km: 0.0 })
    }

    #[test]
    fn test_twilight_levels() {
        let dusk = site_with_sun_altitude(-9.0);
        let target = [0.0, 0.0, 1.0];
        let civil = DaytimeConfig { twilight: TwilightType::Civil }.to_evaluator();
        let nautical = DaytimeConfig { twilight: TwilightType::Nautical }.to_evaluator();
        assert!(civil.evaluate_sample(&dusk, &target).satisfied);
        let eval = nautical.evaluate_sample(&dusk, &target);
        assert!(!eval.satisfied);
        assert!((eval.severity() - 3.0 / 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_none_means_sun_above_horizon() {
        let none = DaytimeConfig { twilight: TwilightType::None }.to_evaluator();
        assert!(!none.evaluate_sample(&site_with_sun_altitude(1.0), &[0.0, 0.0, 1.0]).satisfied);
        assert!(none.evaluate_sample(&site_with_sun_altitude(-1.0), &[0.0, 0.0, 1.0]).satisfied);
    }

    #[test]
    fn test_twilight_wire_names() {
        let cfg: DaytimeConfig = serde_json::from_str(r#"{"twilight":"astronomical"}"#).unwrap();
        assert_eq!(cfg.twilight, TwilightType::Astronomical);
        let default: DaytimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default.twilight, TwilightType::Civil);
    }
}
