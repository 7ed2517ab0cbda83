//! Observation constraint evaluation
//!
//! Evaluates composable geometric constraints (Sun/Moon/Earth avoidance,
//! eclipse, airmass, orbit geometry, exclusion polygons) against an
//! ephemeris time series, reduces the per-sample signal to violation
//! intervals with severities, and tracks moving targets resolved through a
//! tiered, cached body lookup.
//!
//! ```no_run
//! use rust_ephem_constraints::{Constraint, ConstraintConfig, EvalOptions};
//! # fn run(ctx: &rust_ephem_constraints::EphemerisTable) -> rust_ephem_constraints::Result<()> {
//! let config = ConstraintConfig::sun(45.0) & !ConstraintConfig::eclipse(true);
//! let constraint = Constraint::from_config(config)?;
//! let result = constraint.evaluate(ctx, 83.63, 22.01, &EvalOptions::default())?;
//! for v in &result.violations {
//!     println!("{} - {}: {}", v.start_time, v.end_time, v.description);
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod constraints;
pub mod ephemeris;
pub mod error;
pub mod resolver;
pub mod utils;

// Re-export public API
pub use constraints::{
    BatchResult, CancellationToken, Constraint, ConstraintConfig, ConstraintResult,
    ConstraintViolation, EvalOptions, Evaluation, MovingOptions, MovingTarget,
    MovingVisibilityResult, OnFailure, VisibilityWindow,
};
pub use ephemeris::{EphemerisContext, EphemerisSample, EphemerisTable, PlatformKind, TimeGrid};
pub use error::{ConstraintError, ResolutionError, Result};
pub use resolver::{BodyResolver, BodySource, Resolution, ResolveOptions, Tier};

#[cfg(feature = "horizons")]
pub use utils::horizons::{HorizonsClient, HorizonsConfig};
