use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::EliaError;
use crate::fetch::{RawRecord, RecordFetcher};

type CacheKey = (String, NaiveDate);

/// Expiry and size limits of a [`CachedFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are fetched again. `None` keeps them forever.
    pub ttl: Option<Duration>,
    /// Oldest entries are evicted once this many are stored.
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(15 * 60)),
            max_entries: 64,
        }
    }
}

struct CacheEntry {
    fetched_at: Instant,
    sequence: u64,
    records: Vec<RawRecord>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    next_sequence: u64,
}

/// Wraps a [`RecordFetcher`] and remembers its successful responses per
/// `(dataset, date)`.
pub struct CachedFetcher<F> {
    inner: F,
    policy: CachePolicy,
    state: Mutex<CacheState>,
}

impl<F> CachedFetcher<F> {
    pub fn new(inner: F, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state().entries.clear();
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.policy.ttl {
            Some(ttl) => now.duration_since(entry.fetched_at) < ttl,
            None => true,
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Vec<RawRecord>> {
        let now = Instant::now();
        let mut state = self.state();

        let fresh = state.entries.get(key).map(|entry| self.is_fresh(entry, now));
        match fresh {
            Some(true) => state.entries.get(key).map(|entry| entry.records.clone()),
            Some(false) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: CacheKey, records: Vec<RawRecord>) {
        if self.policy.max_entries == 0 {
            return;
        }

        let mut state = self.state();
        while state.entries.len() >= self.policy.max_entries && !state.entries.contains_key(&key) {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                sequence,
                records,
            },
        );
    }
}

impl<F> RecordFetcher for CachedFetcher<F>
where
    F: RecordFetcher + Sync,
{
    async fn fetch(&self, dataset_id: &str, date: NaiveDate) -> Result<Vec<RawRecord>, EliaError> {
        let key = (dataset_id.to_owned(), date);

        if let Some(records) = self.lookup(&key) {
            debug!(dataset = dataset_id, %date, "cache hit");
            return Ok(records);
        }

        let records = self.inner.fetch(dataset_id, date).await?;
        self.store(key, records.clone());

        Ok(records)
    }
}
