//! Ephemeris context consumed by the constraint engine

pub mod ephemeris_common;
pub mod ephemeris_table;

pub use ephemeris_common::{
    EphemerisContext, EphemerisSample, GeodeticLocation, PlatformKind, TimeGrid,
};
pub use ephemeris_table::EphemerisTable;
