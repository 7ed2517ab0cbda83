//! Constraint configuration tree
//!
//! [`ConstraintConfig`] is the serialisable description of a constraint: a
//! closed set of primitive variants plus the AND/OR/XOR/NOT combinators, each
//! node owning its children. The `type` tag of every variant is part of the
//! JSON wire format.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use serde::{Deserialize, Serialize};

use super::airmass::AirmassConfig;
use super::alt_az::AltAzConfig;
use super::daytime::DaytimeConfig;
use super::earth_limb::EarthLimbConfig;
use super::eclipse::EclipseConfig;
use super::logical::Node;
use super::moon_phase::MoonPhaseConfig;
use super::orbit_pole::OrbitPoleConfig;
use super::proximity::{BodyProximityConfig, ProximityConfig};
use super::saa::SAAConfig;
use crate::error::{ConstraintError, Result};
use crate::resolver::BodyId;
use crate::utils::config::{MAX_CONSTRAINT_DEPTH, MAX_CONSTRAINT_NODES};

/// Children of an AND/OR/XOR node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalConfig {
    pub constraints: Vec<ConstraintConfig>,
}

/// Child of a NOT node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotConfig {
    pub constraint: Box<ConstraintConfig>,
}

/// A constraint tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintConfig {
    Sun(ProximityConfig),
    Moon(ProximityConfig),
    EarthLimb(EarthLimbConfig),
    Body(BodyProximityConfig),
    Eclipse(EclipseConfig),
    Daytime(DaytimeConfig),
    Airmass(AirmassConfig),
    MoonPhase(MoonPhaseConfig),
    Saa(SAAConfig),
    AltAz(AltAzConfig),
    OrbitRam(ProximityConfig),
    OrbitPole(OrbitPoleConfig),
    And(LogicalConfig),
    Or(LogicalConfig),
    Xor(LogicalConfig),
    Not(NotConfig),
}

fn check_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConstraintError::config(format!("{what} must be finite (got {value})")))
    }
}

fn check_within(what: &str, value: f64, lo: f64, hi: f64) -> Result<()> {
    check_finite(what, value)?;
    if value < lo || value > hi {
        return Err(ConstraintError::config(format!(
            "{what} must be within [{lo}, {hi}] (got {value})"
        )));
    }
    Ok(())
}

/// Validate an optional `[min, max]` pair sharing the allowed range
fn check_bounds(what: &str, min: Option<f64>, max: Option<f64>, lo: f64, hi: f64) -> Result<()> {
    if let Some(min) = min {
        check_within(&format!("{what} minimum"), min, lo, hi)?;
    }
    if let Some(max) = max {
        check_within(&format!("{what} maximum"), max, lo, hi)?;
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ConstraintError::config(format!(
                "{what} minimum ({min}) exceeds maximum ({max})"
            )));
        }
    }
    Ok(())
}

fn check_polygon(what: &str, polygon: &[(f64, f64)]) -> Result<()> {
    if polygon.len() < 3 {
        return Err(ConstraintError::config(format!(
            "{what} polygon needs at least 3 vertices (got {})",
            polygon.len()
        )));
    }
    for &(x, y) in polygon {
        check_finite(&format!("{what} polygon vertex"), x)?;
        check_finite(&format!("{what} polygon vertex"), y)?;
    }
    Ok(())
}

impl ConstraintConfig {
    pub fn sun(min_angle: f64) -> Self {
        ConstraintConfig::Sun(ProximityConfig { min_angle, max_angle: None })
    }

    pub fn moon(min_angle: f64) -> Self {
        ConstraintConfig::Moon(ProximityConfig { min_angle, max_angle: None })
    }

    pub fn body(body: impl Into<String>, min_angle: f64) -> Self {
        ConstraintConfig::Body(BodyProximityConfig {
            body: body.into(),
            min_angle,
            max_angle: None,
        })
    }

    pub fn earth_limb(min_angle: f64) -> Self {
        ConstraintConfig::EarthLimb(EarthLimbConfig {
            min_angle,
            max_angle: None,
            include_refraction: false,
            horizon_dip: false,
        })
    }

    pub fn eclipse(umbra_only: bool) -> Self {
        ConstraintConfig::Eclipse(EclipseConfig { umbra_only })
    }

    pub fn all(constraints: Vec<ConstraintConfig>) -> Self {
        ConstraintConfig::And(LogicalConfig { constraints })
    }

    pub fn any(constraints: Vec<ConstraintConfig>) -> Self {
        ConstraintConfig::Or(LogicalConfig { constraints })
    }

    pub fn exactly_one(constraints: Vec<ConstraintConfig>) -> Self {
        ConstraintConfig::Xor(LogicalConfig { constraints })
    }

    pub fn negate(constraint: ConstraintConfig) -> Self {
        ConstraintConfig::Not(NotConfig {
            constraint: Box::new(constraint),
        })
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire tag of this node
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstraintConfig::Sun(_) => "sun",
            ConstraintConfig::Moon(_) => "moon",
            ConstraintConfig::EarthLimb(_) => "earth_limb",
            ConstraintConfig::Body(_) => "body",
            ConstraintConfig::Eclipse(_) => "eclipse",
            ConstraintConfig::Daytime(_) => "daytime",
            ConstraintConfig::Airmass(_) => "airmass",
            ConstraintConfig::MoonPhase(_) => "moon_phase",
            ConstraintConfig::Saa(_) => "saa",
            ConstraintConfig::AltAz(_) => "alt_az",
            ConstraintConfig::OrbitRam(_) => "orbit_ram",
            ConstraintConfig::OrbitPole(_) => "orbit_pole",
            ConstraintConfig::And(_) => "and",
            ConstraintConfig::Or(_) => "or",
            ConstraintConfig::Xor(_) => "xor",
            ConstraintConfig::Not(_) => "not",
        }
    }

    /// Human-readable name, e.g. `AND(SunProximity(min=45°), Eclipse(umbra))`
    pub fn name(&self) -> String {
        Node::compile(self).name()
    }

    /// Check parameters and tree shape
    ///
    /// Fails on bad bounds, missing identifiers, combinators with too few
    /// children, or trees deeper than [`MAX_CONSTRAINT_DEPTH`] or larger than
    /// [`MAX_CONSTRAINT_NODES`].
    pub fn validate(&self) -> Result<()> {
        let mut nodes = 0;
        self.validate_node(1, &mut nodes)
    }

    fn validate_node(&self, depth: usize, nodes: &mut usize) -> Result<()> {
        if depth > MAX_CONSTRAINT_DEPTH {
            return Err(ConstraintError::config(format!(
                "constraint tree is deeper than {MAX_CONSTRAINT_DEPTH} levels"
            )));
        }
        *nodes += 1;
        if *nodes > MAX_CONSTRAINT_NODES {
            return Err(ConstraintError::config(format!(
                "constraint tree has more than {MAX_CONSTRAINT_NODES} nodes"
            )));
        }

        match self {
            ConstraintConfig::Sun(c) | ConstraintConfig::Moon(c) | ConstraintConfig::OrbitRam(c) => {
                check_bounds(self.type_name(), Some(c.min_angle), c.max_angle, 0.0, 180.0)
            }
            ConstraintConfig::Body(c) => {
                if BodyId::parse(&c.body).is_none() {
                    return Err(ConstraintError::config("body constraint requires a body identifier"));
                }
                check_bounds("body angle", Some(c.min_angle), c.max_angle, 0.0, 180.0)
            }
            ConstraintConfig::EarthLimb(c) => {
                check_bounds("earth_limb angle", Some(c.min_angle), c.max_angle, -90.0, 180.0)
            }
            // Separation from the nearer pole never exceeds 90°
            ConstraintConfig::OrbitPole(c) => {
                check_bounds("orbit_pole angle", Some(c.min_angle), c.max_angle, 0.0, 90.0)
            }
            ConstraintConfig::Eclipse(_) | ConstraintConfig::Daytime(_) => Ok(()),
            ConstraintConfig::Airmass(c) => {
                check_bounds("airmass", c.min_airmass, Some(c.max_airmass), 1.0, f64::MAX)
            }
            ConstraintConfig::MoonPhase(c) => {
                check_bounds("moon illumination", c.min_illumination, Some(c.max_illumination), 0.0, 1.0)?;
                check_bounds("moon distance", c.min_distance, c.max_distance, 0.0, 180.0)
            }
            ConstraintConfig::Saa(c) => {
                check_polygon("saa", &c.polygon)?;
                for &(_, lat) in &c.polygon {
                    check_within("saa polygon latitude", lat, -90.0, 90.0)?;
                }
                Ok(())
            }
            ConstraintConfig::AltAz(c) => {
                check_bounds("altitude", c.min_altitude, c.max_altitude, -90.0, 90.0)?;
                if let Some(min) = c.min_azimuth {
                    check_within("minimum azimuth", min, 0.0, 360.0)?;
                }
                if let Some(max) = c.max_azimuth {
                    check_within("maximum azimuth", max, 0.0, 360.0)?;
                }
                match &c.polygon {
                    Some(polygon) => check_polygon("alt_az", polygon),
                    None => Ok(()),
                }
            }
            ConstraintConfig::And(c) | ConstraintConfig::Or(c) => {
                if c.constraints.is_empty() {
                    return Err(ConstraintError::config(format!(
                        "{} constraint requires at least one child",
                        self.type_name()
                    )));
                }
                c.constraints
                    .iter()
                    .try_for_each(|child| child.validate_node(depth + 1, nodes))
            }
            ConstraintConfig::Xor(c) => {
                if c.constraints.len() < 2 {
                    return Err(ConstraintError::config(format!(
                        "xor constraint requires at least two children (got {})",
                        c.constraints.len()
                    )));
                }
                c.constraints
                    .iter()
                    .try_for_each(|child| child.validate_node(depth + 1, nodes))
            }
            ConstraintConfig::Not(c) => c.constraint.validate_node(depth + 1, nodes),
        }
    }
}

impl BitAnd for ConstraintConfig {
    type Output = ConstraintConfig;

    fn bitand(self, rhs: Self) -> Self::Output {
        ConstraintConfig::all(vec![self, rhs])
    }
}

impl BitOr for ConstraintConfig {
    type Output = ConstraintConfig;

    fn bitor(self, rhs: Self) -> Self::Output {
        ConstraintConfig::any(vec![self, rhs])
    }
}

impl BitXor for ConstraintConfig {
    type Output = ConstraintConfig;

    fn bitxor(self, rhs: Self) -> Self::Output {
        ConstraintConfig::exactly_one(vec![self, rhs])
    }
}

impl Not for ConstraintConfig {
    type Output = ConstraintConfig;

    fn not(self) -> Self::Output {
        ConstraintConfig::negate(self)
    }
}
