//! Shared numerical helpers

pub mod config;
pub mod geo;
#[cfg(feature = "horizons")]
pub mod horizons;
pub(crate) mod moon;
pub mod time_utils;
pub mod vector_math;
