//! Per-user month cache in front of [`aggregate_month`].
//!
//! Entries stay fresh for a fixed ttl. Every successful read also warms the
//! neighbouring months in background tasks so that navigating forwards or
//! backwards is served locally. Schedule mutations drop the user's entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::aggregator::aggregate_month;
use crate::models::{CalendarEvent, UserId};
use crate::month::YearMonth;
use crate::store::{ClassStore, StoreResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

pub type MonthEvents = Arc<Vec<CalendarEvent>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user: UserId,
    month: YearMonth,
}

struct CacheEntry {
    events: MonthEvents,
    fetched_at: Instant,
}

/// Start of one fetch. `seq` orders it against invalidations, `started` is
/// the instant the data was requested and becomes the entry's age.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    seq: u64,
    started: Instant,
}

/// An invalidation, ordered against fetches by `seq`.
#[derive(Debug, Clone, Copy)]
struct Mark {
    seq: u64,
    at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    seq: u64,
    user_marks: HashMap<UserId, Mark>,
    month_marks: HashMap<CacheKey, Mark>,
    prefetches: Vec<JoinHandle<()>>,
}

impl CacheState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn begin(&mut self) -> Ticket {
        Ticket {
            seq: self.next_seq(),
            started: Instant::now(),
        }
    }

    fn mark(&mut self) -> Mark {
        Mark {
            seq: self.next_seq(),
            at: Instant::now(),
        }
    }

    fn fresh(&self, key: &CacheKey, ttl: Duration) -> Option<MonthEvents> {
        self.entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(|entry| entry.events.clone())
    }

    /// Whether the user or this month was invalidated after `ticket` started.
    fn superseded(&self, key: &CacheKey, ticket: Ticket) -> bool {
        let newer = |mark: Option<&Mark>| mark.is_some_and(|m| m.seq > ticket.seq);
        newer(self.user_marks.get(&key.user)) || newer(self.month_marks.get(key))
    }

    /// Drops expired entries and marks older than `ttl`. A fetch that
    /// started before a pruned mark is itself older than `ttl` and is
    /// refused by `store_entry`, so the mark is no longer needed.
    fn prune(&mut self, ttl: Duration) {
        self.entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        self.user_marks.retain(|_, mark| mark.at.elapsed() < ttl);
        self.month_marks.retain(|_, mark| mark.at.elapsed() < ttl);
    }
}

#[derive(Clone)]
pub struct MonthCache {
    store: Arc<dyn ClassStore>,
    state: Arc<Mutex<CacheState>>,
    ttl: Duration,
}

impl MonthCache {
    pub fn new(store: Arc<dyn ClassStore>, ttl: Duration) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn ClassStore> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached events for `(user, month)`, fetching them when missing or
    /// stale, then warms `month - 1` and `month + 1`.
    pub async fn get(&self, user: Option<&UserId>, month: YearMonth) -> StoreResult<MonthEvents> {
        let Some(user) = user else {
            return Ok(Arc::new(Vec::new()));
        };

        let events = match self.lookup(user, month) {
            Some(events) => {
                debug!(%user, %month, "month cache hit");
                events
            }
            None => self.fetch(user, month).await?,
        };

        self.prefetch(user, month.previous());
        self.prefetch(user, month.next());
        Ok(events)
    }

    /// Fresh cached events, without touching the store.
    pub fn lookup(&self, user: &UserId, month: YearMonth) -> Option<MonthEvents> {
        let key = CacheKey {
            user: user.clone(),
            month,
        };
        self.state().fresh(&key, self.ttl)
    }

    async fn fetch(&self, user: &UserId, month: YearMonth) -> StoreResult<MonthEvents> {
        let ticket = self.state().begin();
        let events = Arc::new(aggregate_month(self.store.as_ref(), Some(user), month).await?);
        let key = CacheKey {
            user: user.clone(),
            month,
        };
        self.store_entry(key, ticket, events.clone());
        Ok(events)
    }

    /// Writes a fetch result back, sweeping expired entries first. Results
    /// older than the ttl, or superseded by an invalidation, are dropped.
    fn store_entry(&self, key: CacheKey, ticket: Ticket, events: MonthEvents) {
        let mut state = self.state();
        state.prune(self.ttl);
        if ticket.started.elapsed() >= self.ttl {
            debug!(user = %key.user, month = %key.month, "dropping result that expired in flight");
            return;
        }
        if state.superseded(&key, ticket) {
            debug!(user = %key.user, month = %key.month, "dropping result fetched before invalidation");
            return;
        }
        state.entries.insert(
            key,
            CacheEntry {
                events,
                fetched_at: ticket.started,
            },
        );
    }

    /// Fire-and-forget warm-up of one month. Errors are logged and dropped.
    fn prefetch(&self, user: &UserId, month: YearMonth) {
        if self.lookup(user, month).is_some() {
            return;
        }
        let cache = self.clone();
        let user = user.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = cache.fetch(&user, month).await {
                warn!(%user, %month, error = %err, "month prefetch failed");
            }
        });
        let mut state = self.state();
        state.prefetches.retain(|h| !h.is_finished());
        state.prefetches.push(handle);
    }

    /// Waits for every prefetch spawned so far.
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = std::mem::take(&mut self.state().prefetches);
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    warn!(error = %err, "prefetch task aborted");
                }
            }
        }
    }

    /// Drops one month. In-flight fetches of other months are unaffected.
    pub fn invalidate(&self, user: &UserId, month: YearMonth) {
        let key = CacheKey {
            user: user.clone(),
            month,
        };
        let mut state = self.state();
        state.entries.remove(&key);
        let mark = state.mark();
        state.month_marks.insert(key, mark);
    }

    /// Drops every cached month of `user`.
    pub fn invalidate_user(&self, user: &UserId) {
        let mut state = self.state();
        state.entries.retain(|key, _| &key.user != user);
        let mark = state.mark();
        state.user_marks.insert(user.clone(), mark);
        debug!(%user, "invalidated cached months");
    }

    /// Months of `user` with a fresh entry.
    pub fn cached_months(&self, user: &UserId) -> Vec<YearMonth> {
        let mut months: Vec<YearMonth> = self
            .state()
            .entries
            .iter()
            .filter(|(key, entry)| &key.user == user && entry.fetched_at.elapsed() < self.ttl)
            .map(|(key, _)| key.month)
            .collect();
        months.sort();
        months
    }
}
