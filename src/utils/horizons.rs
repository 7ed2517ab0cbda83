//! JPL Horizons network tier
//!
//! Queries geocentric ICRF state vectors for bodies the loaded ephemeris does
//! not cover, and interpolates them onto the requested instants. The request
//! covers the whole date span in one call with the step widened so that the
//! row count stays bounded.
use std::env;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use crate::error::{ConstraintError, ResolutionError, Result};
use crate::resolver::{BodyId, BodySource};
use crate::utils::config::{
    DEFAULT_NETWORK_TIMEOUT, HORIZONS_API_URL, HORIZONS_MAX_ROWS, HORIZONS_TIMEOUT_ENV,
    HORIZONS_URL_ENV,
};
use crate::utils::time_utils::{jd_tdb_to_utc, seconds_between};

/// Endpoint and transport settings for Horizons requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HorizonsConfig {
    fn default() -> Self {
        HorizonsConfig {
            base_url: HORIZONS_API_URL.to_string(),
            timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }
}

impl HorizonsConfig {
    /// Defaults overridden by `RUST_EPHEM_HORIZONS_URL` and
    /// `RUST_EPHEM_HORIZONS_TIMEOUT_SECS`, reading a `.env` file if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = HorizonsConfig::default();
        if let Ok(url) = env::var(HORIZONS_URL_ENV) {
            Url::parse(&url).map_err(|e| {
                ConstraintError::config(format!("{HORIZONS_URL_ENV} is not a valid URL: {e}"))
            })?;
            config.base_url = url;
        }
        if let Ok(secs) = env::var(HORIZONS_TIMEOUT_ENV) {
            let secs: f64 = secs.trim().parse().map_err(|_| {
                ConstraintError::config(format!("{HORIZONS_TIMEOUT_ENV} must be a number of seconds"))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConstraintError::config(format!(
                    "{HORIZONS_TIMEOUT_ENV} must be positive"
                )));
            }
            config.timeout = Duration::from_secs_f64(secs);
        }
        Ok(config)
    }
}

/// Blocking Horizons client usable as the resolver's network tier
pub struct HorizonsClient {
    config: HorizonsConfig,
    agent: Agent,
}

impl HorizonsClient {
    pub fn new(config: HorizonsConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        HorizonsClient { config, agent }
    }

    pub fn from_env() -> Result<Self> {
        Ok(HorizonsClient::new(HorizonsConfig::from_env()?))
    }

    pub fn config(&self) -> &HorizonsConfig {
        &self.config
    }

    fn fetch(&self, body: &BodyId, times: &[DateTime<Utc>]) -> std::result::Result<String, ResolutionError> {
        let url = request_url(&self.config.base_url, body, times)?;
        debug!(body = %body, url = %url, "Horizons request");

        let response = self.agent.get(url.as_str()).call().map_err(|e| match e {
            ureq::Error::Timeout(_) => ResolutionError::Timeout {
                body: body.key(),
                millis: self.config.timeout.as_millis(),
            },
            other => ResolutionError::Network {
                body: body.key(),
                message: other.to_string(),
            },
        })?;

        response
            .into_body()
            .read_to_string()
            .map_err(|e| ResolutionError::Network {
                body: body.key(),
                message: format!("failed to read response: {e}"),
            })
    }
}

impl BodySource for HorizonsClient {
    fn tier_name(&self) -> &'static str {
        "JPL Horizons"
    }

    fn locate(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
    ) -> std::result::Result<Vec<Option<[f64; 3]>>, ResolutionError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.fetch(body, times)?;
        let rows = parse_vectors(body, &text)?;
        Ok(interpolate_positions(&rows, times))
    }
}

fn horizons_command(body: &BodyId) -> String {
    match body {
        BodyId::Naif(id) => format!("'{id}'"),
        BodyId::Designation(name) => format!("'{name}'"),
    }
}

fn day_after(time: &DateTime<Utc>) -> NaiveDate {
    let day = time.date_naive();
    day.succ_opt().unwrap_or(day)
}

/// Build the VECTORS request for the date span covering `times`
///
/// `times` must not be empty.
fn request_url(
    base_url: &str,
    body: &BodyId,
    times: &[DateTime<Utc>],
) -> std::result::Result<Url, ResolutionError> {
    let (Some(first), Some(last)) = (times.iter().min(), times.iter().max()) else {
        return Err(ResolutionError::InvalidResponse(
            "no instants requested".to_string(),
        ));
    };

    // Horizons needs distinct start and stop dates, so the stop is the day
    // after the last instant.
    let start = first.date_naive();
    let stop = day_after(last);
    let span_minutes = (stop - start).num_minutes().max(1);
    let step_minutes = (span_minutes / HORIZONS_MAX_ROWS).max(1);

    let start_str = format!("{}-{:02}-{:02}", start.year(), start.month(), start.day());
    let stop_str = format!("{}-{:02}-{:02}", stop.year(), stop.month(), stop.day());

    Url::parse_with_params(
        base_url,
        &[
            ("format", "text".to_string()),
            ("COMMAND", horizons_command(body)),
            ("MAKE_EPHEM", "'YES'".to_string()),
            ("EPHEM_TYPE", "'VECTORS'".to_string()),
            ("VEC_TABLE", "'2'".to_string()),
            ("CENTER", "'@399'".to_string()),
            ("REF_PLANE", "'FRAME'".to_string()),
            ("START_TIME", format!("'{start_str}'")),
            ("STOP_TIME", format!("'{stop_str}'")),
            ("STEP_SIZE", format!("'{step_minutes}m'")),
            ("OUT_UNITS", "'KM-S'".to_string()),
            ("CSV_FORMAT", "'YES'".to_string()),
        ],
    )
    .map_err(|e| ResolutionError::Network {
        body: body.key(),
        message: format!("invalid Horizons URL '{base_url}': {e}"),
    })
}

/// One tabulated Horizons row
#[derive(Debug, Clone, Copy, PartialEq)]
struct VectorRow {
    time: DateTime<Utc>,
    position: [f64; 3],
}

/// Extract the `$$SOE` .. `$$EOE` rows of a CSV VECTORS response
fn parse_vectors(body: &BodyId, response: &str) -> std::result::Result<Vec<VectorRow>, ResolutionError> {
    if response.contains("No matches found") || response.contains("No such object") {
        return Err(ResolutionError::BodyNotFound { body: body.key() });
    }

    let mut rows = Vec::new();
    let mut in_data = false;
    for line in response.lines() {
        if line.contains("$$SOE") {
            in_data = true;
            continue;
        }
        if line.contains("$$EOE") {
            break;
        }
        if !in_data || line.trim().is_empty() {
            continue;
        }

        // JDTDB, Calendar Date, X, Y, Z, VX, VY, VZ, ...
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 5 {
            warn!(line, "skipping malformed Horizons row");
            continue;
        }
        let jd: f64 = parts[0]
            .parse()
            .map_err(|_| ResolutionError::InvalidResponse(format!("invalid Julian date '{}'", parts[0])))?;
        let time = jd_tdb_to_utc(jd)
            .ok_or_else(|| ResolutionError::InvalidResponse(format!("Julian date {jd} out of range")))?;
        let mut position = [0.0; 3];
        for (slot, text) in position.iter_mut().zip(&parts[2..5]) {
            *slot = text
                .parse()
                .map_err(|_| ResolutionError::InvalidResponse(format!("invalid number '{text}'")))?;
        }
        rows.push(VectorRow { time, position });
    }

    if rows.is_empty() {
        let reason = response
            .lines()
            .find(|l| l.contains("ERROR") || l.contains("error"))
            .unwrap_or("no ephemeris rows in response")
            .trim()
            .to_string();
        return Err(ResolutionError::InvalidResponse(reason));
    }
    rows.sort_by_key(|r| r.time);
    Ok(rows)
}

/// Linear interpolation onto `times`; `None` outside the tabulated span
fn interpolate_positions(rows: &[VectorRow], times: &[DateTime<Utc>]) -> Vec<Option<[f64; 3]>> {
    times
        .iter()
        .map(|t| match rows.binary_search_by_key(t, |r| r.time) {
            Ok(i) => Some(rows[i].position),
            Err(0) => None,
            Err(i) if i >= rows.len() => None,
            Err(i) => {
                let (a, b) = (&rows[i - 1], &rows[i]);
                let span = seconds_between(&a.time, &b.time);
                let w = if span > 0.0 {
                    seconds_between(&a.time, t) / span
                } else {
                    0.0
                };
                Some([
                    a.position[0] + w * (b.position[0] - a.position[0]),
                    a.position[1] + w * (b.position[1] - a.position[1]),
                    a.position[2] + w * (b.position[2] - a.position[2]),
                ])
            }
        })
        .collect()
}
