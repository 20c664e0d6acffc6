//! In-memory dispatch counters per route.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Key used for requests that matched no route.
pub const UNROUTED: &str = "<unrouted>";

/// Counters for one route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub calls: u64,
    pub errors: u64,
    pub total_micros: u64,
    pub max_micros: u64,
    /// Count per response status.
    pub statuses: BTreeMap<u16, u64>,
}

impl RouteStats {
    #[must_use]
    pub fn mean_micros(&self) -> u64 {
        self.total_micros.checked_div(self.calls).unwrap_or(0)
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_calls: u64,
    pub total_errors: u64,
    pub resets: u64,
    pub routes: BTreeMap<String, RouteStats>,
}

/// Thread-safe per-route counters.
#[derive(Debug, Default)]
pub struct RequestStats {
    inner: Mutex<StatsSnapshot>,
}

impl RequestStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatch. `route` is `None` when nothing matched.
    pub fn record(&self, route: Option<&str>, status: u16, failed: bool, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        if failed {
            inner.total_errors += 1;
        }
        let entry = inner
            .routes
            .entry(route.unwrap_or(UNROUTED).to_string())
            .or_default();
        entry.calls += 1;
        if failed {
            entry.errors += 1;
        }
        entry.total_micros = entry.total_micros.saturating_add(micros);
        entry.max_micros = entry.max_micros.max(micros);
        *entry.statuses.entry(status).or_default() += 1;
    }

    pub fn record_reset(&self) {
        self.inner.lock().resets += 1;
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }
}
