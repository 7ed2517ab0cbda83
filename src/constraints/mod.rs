//! Constraint evaluation modules
//!
//! Primitive evaluators (Sun/Moon/body proximity, Earth limb, eclipse,
//! daytime, airmass, Moon phase, exclusion polygon, alt/az window, orbit
//! geometry), the boolean combinators over them, and the reducer that turns
//! a per-sample series into violation intervals.

pub mod airmass;
pub mod alt_az;
pub mod config;
pub mod core;
pub mod daytime;
pub mod earth_limb;
pub mod eclipse;
pub mod engine;
pub mod logical;
pub mod moon_phase;
pub mod moving;
pub mod orbit_pole;
pub mod proximity;
pub mod saa;

// Re-export main types
pub use airmass::{altitude_to_airmass, AirmassConfig};
pub use alt_az::AltAzConfig;
pub use config::{ConstraintConfig, LogicalConfig, NotConfig};
pub use core::{
    ConstraintEvaluator, ConstraintResult, ConstraintViolation, Evaluation, VisibilityWindow,
};
pub use daytime::{DaytimeConfig, TwilightType};
pub use earth_limb::EarthLimbConfig;
pub use eclipse::{shadow_state, EclipseConfig, ShadowState};
pub use engine::{BatchResult, CancellationToken, Constraint, EvalOptions};
pub use logical::{combine_and, combine_or, combine_xor};
pub use moon_phase::{MoonPhaseConfig, MoonVisibility};
pub use moving::{MovingOptions, MovingTarget, MovingVisibilityResult, OnFailure};
pub use orbit_pole::OrbitPoleConfig;
pub use proximity::{BodyProximityConfig, ProximityConfig};
pub use saa::SAAConfig;
