//! Login outcome recording and per-day failure tallies.
//!
//! Flow Overview:
//! 1) Every adjudicated attempt appends one entry to the [`AuditStore`].
//! 2) Failures return today's failure count for the same identity, including
//!    the entry just written.
//! 3) Any store error degrades to [`FailureTally::Degraded`], which the
//!    throttle treats as "not blocked". Nothing here returns an error to the
//!    login flow.
//!
//! With the tally cache enabled the store is scanned once per day (on the
//! first failure after rollover) and the cached counters are bumped on each
//! later failure. Appends and cache updates share one lock so a count never
//! includes an entry twice.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, error};

use super::{
    entry::{AuditEntry, Outcome},
    store::{AuditError, AuditStore},
};

/// Source of "now" for audit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where one calendar day ends and the next begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DayBoundary {
    /// Server-local midnight.
    #[default]
    Local,
    Utc,
}

impl DayBoundary {
    #[must_use]
    pub fn day_of(self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => timestamp.with_timezone(&Local).date_naive(),
            Self::Utc => timestamp.date_naive(),
        }
    }
}

impl FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(format!("invalid day boundary: {other} (expected local or utc)")),
        }
    }
}

/// Result of recording a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureTally {
    /// Failures recorded today for the identity, including the current one.
    Counted(usize),
    /// The log could not be written or read; the count is unknown.
    Degraded,
}

#[derive(Debug)]
struct DailyTally {
    day: NaiveDate,
    failures: HashMap<String, usize>,
}

pub struct LoginAuditor {
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    boundary: DayBoundary,
    cache_enabled: bool,
    // Also serialises appends so the cache and the log never disagree.
    tally: Mutex<Option<DailyTally>>,
}

impl std::fmt::Debug for LoginAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAuditor")
            .field("boundary", &self.boundary)
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

impl LoginAuditor {
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            boundary: DayBoundary::default(),
            cache_enabled: true,
            tally: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    #[must_use]
    pub fn with_tally_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Append a SUCCESS entry. Failures are only reported through tracing so
    /// a broken log never blocks a valid login.
    pub fn record_success(&self, identity: &str) {
        let entry = AuditEntry::new(self.clock.now(), Outcome::Success, identity);
        let result = self
            .lock_tally()
            .and_then(|_guard| self.store.append(&entry));
        if let Err(err) = result {
            error!("Error logging successful login: {err}");
        }
    }

    /// Append a FAILED entry and return today's failure tally for `identity`.
    pub fn record_failure_and_count_today(&self, identity: &str) -> FailureTally {
        match self.try_record_failure(identity) {
            Ok(count) => FailureTally::Counted(count),
            Err(err) => {
                error!("Error logging failed login: {err}");
                FailureTally::Degraded
            }
        }
    }

    fn try_record_failure(&self, identity: &str) -> Result<usize, AuditError> {
        let now = self.clock.now();
        let today = self.boundary.day_of(now);
        let entry = AuditEntry::new(now, Outcome::Failed, identity);

        let mut tally = self.lock_tally()?;
        self.store.append(&entry)?;

        if !self.cache_enabled {
            return self.count_failures_on(today, identity);
        }

        if let Some(cached) = tally.as_mut().filter(|cached| cached.day == today) {
            let count = cached
                .failures
                .entry(entry.identity().to_string())
                .or_insert(0);
            *count += 1;
            return Ok(*count);
        }

        // First failure of the day (or the cache was never built): rebuild
        // from the log, which already contains the entry above.
        *tally = None;
        let rebuilt = self.rebuild_tally(today)?;
        let count = rebuilt.failures.get(entry.identity()).copied().unwrap_or(0);
        debug!(
            "Rebuilt failure tally for {today}: {} identities",
            rebuilt.failures.len()
        );
        *tally = Some(rebuilt);
        Ok(count)
    }

    fn count_failures_on(&self, day: NaiveDate, identity: &str) -> Result<usize, AuditError> {
        let boundary = self.boundary;
        self.store.count(&|entry| {
            entry.is_failure() && entry.is_for(identity) && boundary.day_of(entry.timestamp()) == day
        })
    }

    fn rebuild_tally(&self, day: NaiveDate) -> Result<DailyTally, AuditError> {
        let boundary = self.boundary;
        let mut failures: HashMap<String, usize> = HashMap::new();
        self.store.scan(&mut |entry| {
            if entry.is_failure() && boundary.day_of(entry.timestamp()) == day {
                *failures.entry(entry.identity().to_string()).or_insert(0) += 1;
            }
        })?;
        Ok(DailyTally { day, failures })
    }

    fn lock_tally(&self) -> Result<MutexGuard<'_, Option<DailyTally>>, AuditError> {
        self.tally.lock().map_err(|_| AuditError::Poisoned)
    }
}

/// Run [`LoginAuditor::record_success`] on the blocking pool.
pub async fn record_success(auditor: &Arc<LoginAuditor>, identity: &str) {
    let auditor = Arc::clone(auditor);
    let identity = identity.to_string();
    if let Err(err) = tokio::task::spawn_blocking(move || auditor.record_success(&identity)).await
    {
        error!("Error logging successful login: {}", AuditError::Task(err.to_string()));
    }
}

/// Run [`LoginAuditor::record_failure_and_count_today`] on the blocking pool.
pub async fn record_failure(auditor: &Arc<LoginAuditor>, identity: &str) -> FailureTally {
    let auditor = Arc::clone(auditor);
    let identity = identity.to_string();
    match tokio::task::spawn_blocking(move || auditor.record_failure_and_count_today(&identity))
        .await
    {
        Ok(tally) => tally,
        Err(err) => {
            error!("Error logging failed login: {}", AuditError::Task(err.to_string()));
            FailureTally::Degraded
        }
    }
}
