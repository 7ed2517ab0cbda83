//! Tiered body resolution with caching
//!
//! A lookup walks `Unresolved → TryLocal → TryNetwork → Resolved | Failed`.
//! The local tier is whatever ephemeris data is already loaded; the network
//! tier is only entered when the caller opts in through [`ResolveOptions`].
//! Complete tracks are cached per (body, time grid) for the lifetime of the
//! resolver, and concurrent lookups of the same key share one resolution.
//! A caller joining a lookup already in flight waits no longer than its own
//! timeout, and receives the shared outcome whether it succeeded or failed.
//! Failures are never stored: the next caller after a failed lookup retries.

pub mod body_id;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use body_id::BodyId;

use crate::error::ResolutionError;
use crate::utils::time_utils::unix_nanos;

/// One tier able to report geocentric body positions (GCRS, km)
pub trait BodySource: Send + Sync {
    /// Short label used in logs
    fn tier_name(&self) -> &'static str;

    /// Positions at each requested instant; `None` where the source has no
    /// coverage. An unknown body is reported as
    /// [`ResolutionError::BodyNotFound`].
    fn locate(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
    ) -> Result<Vec<Option<[f64; 3]>>, ResolutionError>;
}

/// Tier that produced a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Local,
    Network,
}

/// Per-instant positions of one body over one time grid
#[derive(Debug, Clone, PartialEq)]
pub struct BodyTrack {
    pub body: BodyId,
    pub tier: Tier,
    pub positions: Vec<Option<[f64; 3]>>,
}

impl BodyTrack {
    pub fn is_complete(&self) -> bool {
        self.positions.iter().all(Option::is_some)
    }

    pub fn missing_indices(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.is_none().then_some(i))
            .collect()
    }
}

/// Outcome of a lookup
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Every instant resolved from already-loaded data
    Local(Arc<BodyTrack>),
    /// The network tier was needed for at least one instant
    Network(Arc<BodyTrack>),
    /// Some or all instants could not be resolved
    Failed {
        error: ResolutionError,
        /// Positions that did resolve, if any
        partial: Option<BodyTrack>,
    },
}

impl Resolution {
    fn from_track(track: Arc<BodyTrack>) -> Self {
        match track.tier {
            Tier::Local => Resolution::Local(track),
            Tier::Network => Resolution::Network(track),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Failed { .. })
    }

    /// Best available positions, complete or partial
    pub fn track(&self) -> Option<&BodyTrack> {
        match self {
            Resolution::Local(track) | Resolution::Network(track) => Some(track),
            Resolution::Failed { partial, .. } => partial.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&ResolutionError> {
        match self {
            Resolution::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Per-call resolution policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Permit the network tier when local data is insufficient
    pub allow_network: bool,
    /// Bound on the network tier; elapsed time is reported as
    /// [`ResolutionError::Timeout`]
    pub timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn local_only() -> Self {
        ResolveOptions::default()
    }

    pub fn with_network(timeout: Option<Duration>) -> Self {
        ResolveOptions {
            allow_network: true,
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GridKey {
    len: usize,
    first: i128,
    last: i128,
    digest: u64,
}

impl GridKey {
    fn new(times: &[DateTime<Utc>]) -> Self {
        let mut hasher = DefaultHasher::new();
        for t in times {
            unix_nanos(t).hash(&mut hasher);
        }
        GridKey {
            len: times.len(),
            first: times.first().map(unix_nanos).unwrap_or_default(),
            last: times.last().map(unix_nanos).unwrap_or_default(),
            digest: hasher.finish(),
        }
    }
}

type CacheKey = (String, GridKey);

enum Joined {
    Leader(Arc<Flight>),
    Waiter(Arc<Flight>),
}

/// One lookup shared by every caller of the same key. Stays in the cache once
/// it holds a track; removed again when it fails.
#[derive(Default)]
struct Flight {
    outcome: OnceCell<Result<Arc<BodyTrack>, Failure>>,
    lock: Mutex<()>,
    done: Condvar,
}

impl Flight {
    fn track(&self) -> Option<&Arc<BodyTrack>> {
        self.outcome.get().and_then(|outcome| outcome.as_ref().ok())
    }

    fn settle(&self, outcome: Result<Arc<BodyTrack>, Failure>) {
        let _ = self.outcome.set(outcome);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.done.notify_all();
    }
}

/// Held by the caller running a lookup. Settles the flight on every exit path
/// and drops it from the cache unless it produced a track.
struct Lead<'a> {
    resolver: &'a BodyResolver,
    key: CacheKey,
    flight: Arc<Flight>,
}

impl Drop for Lead<'_> {
    fn drop(&mut self) {
        if self.flight.outcome.get().is_none() {
            self.flight.settle(Err(Failure {
                error: ResolutionError::Network {
                    body: self.key.0.clone(),
                    message: "lookup abandoned before completing".to_string(),
                },
                partial: None,
            }));
        }
        if self.flight.track().is_none() {
            let mut cache = self
                .resolver
                .cache
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if cache
                .get(&self.key)
                .is_some_and(|f| Arc::ptr_eq(f, &self.flight))
            {
                cache.remove(&self.key);
            }
        }
    }
}

enum LookupState {
    Unresolved,
    TryLocal,
    TryNetwork {
        positions: Vec<Option<[f64; 3]>>,
        local_error: Option<ResolutionError>,
    },
    Resolved(BodyTrack),
    Failed {
        error: ResolutionError,
        partial: Option<BodyTrack>,
    },
}

#[derive(Clone)]
struct Failure {
    error: ResolutionError,
    partial: Option<BodyTrack>,
}

fn first_gap(positions: &[Option<[f64; 3]>]) -> Option<usize> {
    positions.iter().position(Option::is_none)
}

/// Tiered body resolver owning the process-lifetime location cache
pub struct BodyResolver {
    local: Option<Arc<dyn BodySource>>,
    network: Option<Arc<dyn BodySource>>,
    cache: RwLock<HashMap<CacheKey, Arc<Flight>>>,
    network_requests: AtomicUsize,
}

impl BodyResolver {
    /// Resolver with a local tier only
    pub fn new(local: Arc<dyn BodySource>) -> Self {
        BodyResolver {
            local: Some(local),
            network: None,
            cache: RwLock::new(HashMap::new()),
            network_requests: AtomicUsize::new(0),
        }
    }

    /// Resolver without local data; every lookup needs the network tier
    pub fn network_only(network: Arc<dyn BodySource>) -> Self {
        BodyResolver {
            local: None,
            network: Some(network),
            cache: RwLock::new(HashMap::new()),
            network_requests: AtomicUsize::new(0),
        }
    }

    /// Add a network tier
    pub fn with_network(mut self, network: Arc<dyn BodySource>) -> Self {
        self.network = Some(network);
        self
    }

    /// Number of cached tracks
    pub fn cache_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|flight| flight.track().is_some())
            .count()
    }

    /// Drop every cached track
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Network requests issued so far
    pub fn network_requests(&self) -> usize {
        self.network_requests.load(Ordering::Relaxed)
    }

    /// Resolve a body over a set of instants
    pub fn resolve(
        &self,
        body: &str,
        times: &[DateTime<Utc>],
        options: &ResolveOptions,
    ) -> Resolution {
        let Some(id) = BodyId::parse(body) else {
            return Resolution::Failed {
                error: ResolutionError::BodyNotFound {
                    body: body.to_string(),
                },
                partial: None,
            };
        };

        if times.is_empty() {
            return Resolution::Local(Arc::new(BodyTrack {
                body: id,
                tier: Tier::Local,
                positions: Vec::new(),
            }));
        }

        let key = (id.key(), GridKey::new(times));
        let flight = match self.join(&key) {
            Joined::Leader(flight) => flight,
            Joined::Waiter(flight) => {
                if let Some(track) = flight.track() {
                    debug!(body = %id, "body track served from cache");
                    return Resolution::from_track(track.clone());
                }
                return self.wait_for(&id, &flight, options.timeout);
            }
        };

        let lead = Lead {
            resolver: self,
            key,
            flight,
        };
        let outcome = self.run_tiers(&id, times, options).map(Arc::new);
        lead.flight.settle(outcome.clone());
        drop(lead);

        match outcome {
            Ok(track) => Resolution::from_track(track),
            Err(Failure { error, partial }) => {
                warn!(body = %id, %error, "body resolution failed");
                Resolution::Failed { error, partial }
            }
        }
    }

    /// Existing flight for the key, or a new one this caller must run
    fn join(&self, key: &CacheKey) -> Joined {
        if let Some(flight) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Joined::Waiter(flight.clone());
        }
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = cache.get(key) {
            return Joined::Waiter(flight.clone());
        }
        let flight = Arc::new(Flight::default());
        cache.insert(key.clone(), flight.clone());
        Joined::Leader(flight)
    }

    /// Block until another caller settles the flight, bounded by `timeout`
    fn wait_for(&self, id: &BodyId, flight: &Flight, timeout: Option<Duration>) -> Resolution {
        debug!(body = %id, "waiting on in-flight body lookup");
        let guard = flight.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let pending = |_: &mut ()| flight.outcome.get().is_none();
        match timeout {
            Some(timeout) => {
                let _ = flight
                    .done
                    .wait_timeout_while(guard, timeout, pending)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            None => {
                drop(
                    flight
                        .done
                        .wait_while(guard, pending)
                        .unwrap_or_else(PoisonError::into_inner),
                );
            }
        }

        match flight.outcome.get() {
            Some(Ok(track)) => Resolution::from_track(track.clone()),
            Some(Err(Failure { error, partial })) => Resolution::Failed {
                error: error.clone(),
                partial: partial.clone(),
            },
            None => {
                let error = ResolutionError::Timeout {
                    body: id.key(),
                    millis: timeout.unwrap_or_default().as_millis(),
                };
                warn!(body = %id, %error, "gave up waiting on in-flight body lookup");
                Resolution::Failed {
                    error,
                    partial: None,
                }
            }
        }
    }

    fn run_tiers(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
        options: &ResolveOptions,
    ) -> Result<BodyTrack, Failure> {
        let mut state = LookupState::Unresolved;
        loop {
            state = match state {
                LookupState::Unresolved => LookupState::TryLocal,
                LookupState::TryLocal => self.try_local(body, times, options),
                LookupState::TryNetwork {
                    positions,
                    local_error,
                } => self.try_network(body, times, positions, local_error, options),
                LookupState::Resolved(track) => return Ok(track),
                LookupState::Failed { error, partial } => return Err(Failure { error, partial }),
            };
        }
    }

    fn try_local(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
        options: &ResolveOptions,
    ) -> LookupState {
        let (positions, local_error) = match &self.local {
            Some(local) => match local.locate(body, times) {
                Ok(positions) if positions.len() == times.len() => (positions, None),
                Ok(positions) => (
                    vec![None; times.len()],
                    Some(ResolutionError::InvalidResponse(format!(
                        "{} returned {} positions for {} instants",
                        local.tier_name(),
                        positions.len(),
                        times.len()
                    ))),
                ),
                Err(err) => {
                    debug!(body = %body, tier = local.tier_name(), %err, "local lookup missed");
                    (vec![None; times.len()], Some(err))
                }
            },
            None => (vec![None; times.len()], None),
        };

        if first_gap(&positions).is_none() {
            debug!(body = %body, "body resolved from local data");
            return LookupState::Resolved(BodyTrack {
                body: body.clone(),
                tier: Tier::Local,
                positions,
            });
        }

        if options.allow_network && self.network.is_some() {
            return LookupState::TryNetwork {
                positions,
                local_error,
            };
        }

        let error = match first_gap(&positions) {
            Some(gap) if positions.iter().any(Option::is_some) => ResolutionError::OutOfRange {
                body: body.key(),
                time: times[gap],
            },
            _ if self.network.is_some() => ResolutionError::NetworkDisabled { body: body.key() },
            _ => local_error.unwrap_or_else(|| ResolutionError::BodyNotFound { body: body.key() }),
        };
        LookupState::Failed {
            error,
            partial: partial_track(body, Tier::Local, positions),
        }
    }

    fn try_network(
        &self,
        body: &BodyId,
        times: &[DateTime<Utc>],
        mut positions: Vec<Option<[f64; 3]>>,
        local_error: Option<ResolutionError>,
        options: &ResolveOptions,
    ) -> LookupState {
        let Some(network) = self.network.clone() else {
            return LookupState::Failed {
                error: local_error
                    .unwrap_or_else(|| ResolutionError::BodyNotFound { body: body.key() }),
                partial: partial_track(body, Tier::Local, positions),
            };
        };

        let gaps: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.is_none().then_some(i))
            .collect();
        let gap_times: Vec<DateTime<Utc>> = gaps.iter().map(|&i| times[i]).collect();

        info!(
            body = %body,
            tier = network.tier_name(),
            instants = gap_times.len(),
            "querying network tier"
        );
        self.network_requests.fetch_add(1, Ordering::Relaxed);

        let fetched = match query_bounded(network, body, gap_times, options.timeout) {
            Ok(fetched) if fetched.len() == gaps.len() => fetched,
            Ok(fetched) => {
                return LookupState::Failed {
                    error: ResolutionError::InvalidResponse(format!(
                        "network tier returned {} positions for {} instants",
                        fetched.len(),
                        gaps.len()
                    )),
                    partial: partial_track(body, Tier::Local, positions),
                }
            }
            Err(error) => {
                return LookupState::Failed {
                    error,
                    partial: partial_track(body, Tier::Local, positions),
                }
            }
        };

        for (&i, value) in gaps.iter().zip(fetched) {
            positions[i] = value;
        }

        match first_gap(&positions) {
            None => LookupState::Resolved(BodyTrack {
                body: body.clone(),
                tier: Tier::Network,
                positions,
            }),
            Some(gap) => LookupState::Failed {
                error: ResolutionError::OutOfRange {
                    body: body.key(),
                    time: times[gap],
                },
                partial: partial_track(body, Tier::Network, positions),
            },
        }
    }
}

fn partial_track(body: &BodyId, tier: Tier, positions: Vec<Option<[f64; 3]>>) -> Option<BodyTrack> {
    positions.iter().any(Option::is_some).then(|| BodyTrack {
        body: body.clone(),
        tier,
        positions,
    })
}

/// Run a network lookup, giving up after `timeout`
///
/// The query runs on a helper thread so a stalled transport cannot hold the
/// caller past the deadline; a late answer is discarded.
fn query_bounded(
    network: Arc<dyn BodySource>,
    body: &BodyId,
    times: Vec<DateTime<Utc>>,
    timeout: Option<Duration>,
) -> Result<Vec<Option<[f64; 3]>>, ResolutionError> {
    let Some(timeout) = timeout else {
        return network.locate(body, &times);
    };

    let (tx, rx) = mpsc::channel();
    let worker_body = body.clone();
    thread::Builder::new()
        .name("body-resolver".to_string())
        .spawn(move || {
            let _ = tx.send(network.locate(&worker_body, &times));
        })
        .map_err(|e| ResolutionError::Network {
            body: body.key(),
            message: format!("failed to start lookup thread: {e}"),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ResolutionError::Timeout {
            body: body.key(),
            millis: timeout.as_millis(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(ResolutionError::Network {
            body: body.key(),
            message: "lookup thread exited without a result".to_string(),
        }),
    }
}
