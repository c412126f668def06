//! Bounded, time-limited cache for aggregated usage statistics.
//!
//! Entries expire after a fixed TTL and the cache never holds more than
//! `max_entries` results; when full, the oldest entry is evicted. Writers that
//! change usage data call [`UsageStatsCache::invalidate_ambassador`].
//!
//! Every invalidation bumps the ambassador's [`Generation`]. Readers take the
//! generation before running their query and hand it back to
//! [`UsageStatsCache::insert`], which discards results computed before a newer
//! invalidation.

use crate::core::stats::MonthlyUsage;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Identifies one aggregation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatsKey {
    /// Ambassador the statistics belong to
    pub ambassador_id: i64,
    /// Single code the statistics are narrowed to, if any
    pub code_id: Option<i64>,
    /// Trailing window in months
    pub months: u32,
}

/// Invalidation counter of one ambassador, as observed by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    ambassador: u64,
}

#[derive(Debug, Clone)]
struct CachedStats {
    stats: Vec<MonthlyUsage>,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<StatsKey, CachedStats>,
    generations: HashMap<i64, u64>,
    // Bumped by `clear`, invalidates every ambassador at once
    epoch: u64,
}

impl CacheState {
    fn generation(&self, ambassador_id: i64) -> Generation {
        Generation {
            epoch: self.epoch,
            ambassador: self.generations.get(&ambassador_id).copied().unwrap_or(0),
        }
    }
}

/// Shared cache of aggregation results.
#[derive(Debug)]
pub struct UsageStatsCache {
    ttl: Duration,
    max_entries: usize,
    state: RwLock<CacheState>,
}

impl UsageStatsCache {
    /// Creates an empty cache. `max_entries` is raised to at least one.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            state: RwLock::new(CacheState::default()),
        }
    }

    fn is_fresh(&self, entry: &CachedStats, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }

    /// Returns the cached result for `key` if it has not expired at `now`.
    pub async fn get(&self, key: &StatsKey, now: DateTime<Utc>) -> Option<Vec<MonthlyUsage>> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.stats.clone())
    }

    /// Current generation of `ambassador_id`. Take it before computing a result.
    pub async fn generation(&self, ambassador_id: i64) -> Generation {
        self.state.read().await.generation(ambassador_id)
    }

    /// Stores `stats` for `key`, evicting expired entries and, if still full,
    /// the oldest one.
    ///
    /// Nothing is stored when the ambassador was invalidated after `generation`
    /// was taken. Returns whether the result was stored.
    pub async fn insert(
        &self,
        key: StatsKey,
        stats: Vec<MonthlyUsage>,
        now: DateTime<Utc>,
        generation: Generation,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation(key.ambassador_id) != generation {
            debug!(?key, "Discarding usage stats computed before an invalidation");
            return false;
        }

        state.entries.retain(|_, entry| self.is_fresh(entry, now));

        if state.entries.len() >= self.max_entries && !state.entries.contains_key(&key) {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                trace!(?oldest, "Evicting oldest usage stats entry");
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key,
            CachedStats {
                stats,
                stored_at: now,
            },
        );
        true
    }

    /// Drops every entry belonging to `ambassador_id` and bumps its generation.
    pub async fn invalidate_ambassador(&self, ambassador_id: i64) {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|key, _| key.ambassador_id != ambassador_id);
        *state.generations.entry(ambassador_id).or_insert(0) += 1;
        debug!(
            ambassador_id,
            removed = before - state.entries.len(),
            "Invalidated cached usage stats"
        );
    }

    /// Drops everything.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.epoch += 1;
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}
