/// Eclipse constraint implementation
use serde::{Deserialize, Serialize};

use super::core::{ConstraintEvaluator, Evaluation};
use crate::ephemeris::EphemerisSample;
use crate::utils::config::{EARTH_RADIUS_KM, SUN_RADIUS_KM};
use crate::utils::vector_math::{dot_product, normalize_vector, vector_magnitude};

fn default_umbra_only() -> bool {
    true
}

/// Configuration for eclipse avoidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EclipseConfig {
    /// Umbra only (true) or include penumbra (false)
    #[serde(default = "default_umbra_only")]
    pub umbra_only: bool,
}

impl Default for EclipseConfig {
    fn default() -> Self {
        EclipseConfig { umbra_only: true }
    }
}

impl EclipseConfig {
    pub(crate) fn to_evaluator(&self) -> EclipseEvaluator {
        EclipseEvaluator {
            umbra_only: self.umbra_only,
        }
    }
}

/// Platform position relative to Earth's shadow
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadowState {
    Sunlit,
    /// Depth into the penumbra, 0 at its outer edge and 1 at the umbra
    Penumbra(f64),
    /// Depth into the umbra, 0 at its edge and 1 on the shadow axis
    Umbra(f64),
}

/// Shadow cone geometry: (distance from shadow axis, umbra radius, penumbra
/// radius) at the platform's distance behind the Earth, km
pub(crate) fn shadow_geometry(obs_pos: &[f64; 3], sun_pos: &[f64; 3]) -> Option<(f64, f64, f64)> {
    let sun_dist = vector_magnitude(sun_pos);
    if sun_dist <= 0.0 {
        return None;
    }
    let sun_unit = normalize_vector(sun_pos);

    // Observer must be behind Earth relative to Sun direction.
    let dot = dot_product(obs_pos, &sun_unit);
    if dot >= 0.0 {
        return None;
    }
    let s = -dot;

    let perp = [
        obs_pos[0] - sun_unit[0] * dot,
        obs_pos[1] - sun_unit[1] * dot,
        obs_pos[2] - sun_unit[2] * dot,
    ];
    let dist_to_axis = vector_magnitude(&perp);

    let l_umbra = EARTH_RADIUS_KM * sun_dist / (SUN_RADIUS_KM - EARTH_RADIUS_KM);
    let l_penumbra = EARTH_RADIUS_KM * sun_dist / (SUN_RADIUS_KM + EARTH_RADIUS_KM);

    // Umbra narrows to a point at l_umbra; penumbra widens linearly.
    let umbra_radius = if s <= l_umbra {
        EARTH_RADIUS_KM * (1.0 - s / l_umbra)
    } else {
        0.0
    };
    let penumbra_radius = EARTH_RADIUS_KM * (1.0 + s / l_penumbra);

    Some((dist_to_axis, umbra_radius, penumbra_radius))
}

/// Classify the platform against the shadow cones
pub fn shadow_state(obs_pos: &[f64; 3], sun_pos: &[f64; 3]) -> ShadowState {
    let Some((dist_to_axis, umbra_radius, penumbra_radius)) = shadow_geometry(obs_pos, sun_pos)
    else {
        return ShadowState::Sunlit;
    };
    if umbra_radius > 0.0 && dist_to_axis < umbra_radius {
        return ShadowState::Umbra(1.0 - dist_to_axis / umbra_radius);
    }
    if dist_to_axis < penumbra_radius {
        let denom = (penumbra_radius - umbra_radius).max(1e-9);
        return ShadowState::Penumbra((penumbra_radius - dist_to_axis) / denom);
    }
    ShadowState::Sunlit
}

#[derive(Debug, Clone)]
pub(crate) struct EclipseEvaluator {
    umbra_only: bool,
}

impl ConstraintEvaluator for EclipseEvaluator {
    fn evaluate_sample(&self, sample: &EphemerisSample, _target: &[f64; 3]) -> Evaluation {
        match shadow_state(&sample.position, &sample.sun_position) {
            ShadowState::Umbra(depth) => Evaluation::fail(depth),
            ShadowState::Penumbra(depth) if !self.umbra_only => Evaluation::fail(0.5 * depth),
            ShadowState::Penumbra(_) | ShadowState::Sunlit => Evaluation::pass(0.0),
        }
    }

    fn name(&self) -> String {
        format!(
            "Eclipse({})",
            if self.umbra_only {
                "umbra"
            } else {
                "umbra+penumbra"
            }
        )
    }

    fn violation_description(&self) -> String {
        if self.umbra_only {
            "Observer in umbra".to_string()
        } else {
            "Observer in shadow".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::PlatformKind;
    use crate::utils::config::AU_TO_KM;
    use chrono::{TimeZone, Utc};

    fn sample_at(position: [f64; 3]) -> EphemerisSample {
        EphemerisSample::from_positions(
            0,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            PlatformKind::Spacecraft,
            position,
            None,
            [AU_TO_KM, 0.0, 0.0],
            [0.0, 384_400.0, 0.0],
        )
    }

    #[test]
    fn test_penumbra_wider_than_umbra() {
        let (_, umbra_radius, penumbra_radius) =
            shadow_geometry(&[-7000.0, 0.0, 0.0], &[AU_TO_KM, 0.0, 0.0]).expect("shadow geometry");
        assert!(umbra_radius > 0.0);
        assert!(penumbra_radius > umbra_radius);
    }

    #[test]
    fn test_umbra_only_ignores_penumbra() {
        let sun = [AU_TO_KM, 0.0, 0.0];
        let s = 7000.0;
        let (_, umbra_radius, penumbra_radius) =
            shadow_geometry(&[-s, 0.0, 0.0], &sun).expect("shadow geometry");
        let obs = [-s, 0.5 * (umbra_radius + penumbra_radius), 0.0];
        assert!(matches!(shadow_state(&obs, &sun), ShadowState::Penumbra(_)));

        let sample = sample_at(obs);
        let umbra_only = EclipseConfig { umbra_only: true }.to_evaluator();
        let with_penumbra = EclipseConfig { umbra_only: false }.to_evaluator();
        assert!(umbra_only.evaluate_sample(&sample, &[0.0, 0.0, 1.0]).satisfied);
        let eval = with_penumbra.evaluate_sample(&sample, &[0.0, 0.0, 1.0]);
        assert!(!eval.satisfied);
        assert!(eval.severity() > 0.0 && eval.severity() <= 0.5);
    }

    #[test]
    fn test_umbra_and_sunlit() {
        let eval = EclipseConfig::default().to_evaluator();
        let shadowed = eval.evaluate_sample(&sample_at([-7000.0, 0.0, 0.0]), &[0.0, 0.0, 1.0]);
        assert!(!shadowed.satisfied);
        assert!((shadowed.severity() - 1.0).abs() < 1e-12);
        assert!(eval.evaluate_sample(&sample_at([7000.0, 0.0, 0.0]), &[0.0, 0.0, 1.0]).satisfied);
        assert_eq!(eval.name(), "Eclipse(umbra)");
    }
}
