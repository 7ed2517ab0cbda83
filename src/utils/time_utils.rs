//! Time utilities: chrono/hifitime interop and duration helpers
//!
//! The hifitime conversions are only needed to read Horizons TDB Julian
//! dates and are compiled with the `horizons` feature.

use chrono::{DateTime, Utc};
#[cfg(feature = "horizons")]
use chrono::TimeZone;
#[cfg(feature = "horizons")]
use hifitime::{Duration, Epoch};

/// Convert chrono `DateTime<Utc>` to hifitime `Epoch`
#[cfg(feature = "horizons")]
#[inline]
pub fn chrono_to_epoch(dt: &DateTime<Utc>) -> Epoch {
    let nanos = (dt.timestamp() as i128) * 1_000_000_000 + (dt.timestamp_subsec_nanos() as i128);
    Epoch::from_unix_duration(Duration::from_total_nanoseconds(nanos))
}

/// Convert a TDB Julian date to `DateTime<Utc>`
#[cfg(feature = "horizons")]
pub fn jd_tdb_to_utc(jd_tdb: f64) -> Option<DateTime<Utc>> {
    if !jd_tdb.is_finite() {
        return None;
    }
    let unix_seconds = Epoch::from_jde_tdb(jd_tdb).to_unix_seconds();
    if !unix_seconds.is_finite() {
        return None;
    }

    let mut secs = unix_seconds.floor() as i64;
    let mut nsecs = ((unix_seconds - secs as f64) * 1e9).round() as i64;
    if nsecs >= 1_000_000_000 {
        secs += 1;
        nsecs -= 1_000_000_000;
    }
    if nsecs < 0 {
        secs -= 1;
        nsecs += 1_000_000_000;
    }

    Utc.timestamp_opt(secs, nsecs as u32).single()
}

/// Signed span between two instants in seconds, with sub-second precision
#[inline]
pub fn seconds_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    let delta = *end - *start;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Nanoseconds since the Unix epoch, used for hashing and cache keys
#[inline]
pub fn unix_nanos(dt: &DateTime<Utc>) -> i128 {
    (dt.timestamp() as i128) * 1_000_000_000 + (dt.timestamp_subsec_nanos() as i128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[cfg(feature = "horizons")]
    #[test]
    fn test_jd_tdb_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, 56).unwrap();
        let jd_tdb = chrono_to_epoch(&dt).to_jde_tdb_days();
        let parsed = jd_tdb_to_utc(jd_tdb).expect("valid JD");
        let diff_ns = (parsed - dt).num_nanoseconds().unwrap().abs();
        assert!(diff_ns < 1_000_000);
    }

    #[cfg(feature = "horizons")]
    #[test]
    fn test_jd_tdb_rejects_nan() {
        assert!(jd_tdb_to_utc(f64::NAN).is_none());
    }

    #[test]
    fn test_seconds_between_subsecond() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert!((seconds_between(&a, &b) - 1.5).abs() < 1e-12);
        assert!((seconds_between(&b, &a) + 1.5).abs() < 1e-12);
    }
}
