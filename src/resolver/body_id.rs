//! Body identifier normalisation
//!
//! Major bodies and barycentres are mapped to their NAIF integer codes so that
//! "Jupiter", "jupiter" and "599" refer to the same cache entry. Anything else
//! (asteroid numbers, comet designations, spacecraft names) is kept verbatim
//! and handed to the resolver tiers as-is.

use std::fmt;

const NAMED_BODIES: &[(&str, i32)] = &[
    ("solar system barycenter", 0),
    ("ssb", 0),
    ("mercury barycenter", 1),
    ("venus barycenter", 2),
    ("earth barycenter", 3),
    ("earth-moon barycenter", 3),
    ("mars barycenter", 4),
    ("jupiter barycenter", 5),
    ("saturn barycenter", 6),
    ("uranus barycenter", 7),
    ("neptune barycenter", 8),
    ("pluto barycenter", 9),
    ("sun", 10),
    ("mercury", 199),
    ("venus", 299),
    ("moon", 301),
    ("earth", 399),
    ("mars", 499),
    ("jupiter", 599),
    ("saturn", 699),
    ("uranus", 799),
    ("neptune", 899),
    ("pluto", 999),
];

/// A normalised body identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyId {
    /// NAIF integer code
    Naif(i32),
    /// Free-form designation understood by the network tier
    Designation(String),
}

impl BodyId {
    /// Parse a NAIF code, a known body name, or a free-form designation
    ///
    /// Returns `None` for an empty identifier.
    pub fn parse(identifier: &str) -> Option<BodyId> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(id) = trimmed.parse::<i32>() {
            return Some(BodyId::Naif(id));
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(&(_, id)) = NAMED_BODIES.iter().find(|(name, _)| *name == lower) {
            return Some(BodyId::Naif(id));
        }
        Some(BodyId::Designation(trimmed.to_string()))
    }

    /// NAIF code, if the body has one
    pub fn naif_id(&self) -> Option<i32> {
        match self {
            BodyId::Naif(id) => Some(*id),
            BodyId::Designation(_) => None,
        }
    }

    /// Stable string key used for caches and lookup tables
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyId::Naif(id) => write!(f, "{id}"),
            BodyId::Designation(name) => f.write_str(name),
        }
    }
}
