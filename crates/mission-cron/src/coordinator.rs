use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use mission_core::config::{CronConfig, CRON_CACHE_TTL_MS};
use mission_store::{read_doc, write_doc, DocumentStore};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CronError, Result};
use crate::fetcher::SnapshotFetcher;
use crate::schedule::{generate, Horizon};
use crate::types::{CacheMeta, CachePayload, CacheState, CronData, ScheduleDescriptor};

/// Document key of the last-known-good descriptor set.
pub const SNAPSHOT_KEY: &str = "openclaw-cron";
/// Document key of the materialized cache payload.
pub const CACHE_KEY: &str = "openclaw-cron-cache";

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// TTL cache in front of the snapshot fetcher and occurrence generator.
///
/// Reads never wait on a refresh they did not start themselves:
///
/// | Cached payload | Age          | Behaviour                                    |
/// |----------------|--------------|----------------------------------------------|
/// | present        | `<= ttl`     | serve it (`fresh`)                           |
/// | present        | `> ttl`      | serve it (`stale`), refresh in background    |
/// | absent         | n/a          | await a refresh; on failure serve snapshot   |
///
/// At most one refresh runs per coordinator. Cloning shares that state.
/// Every refresh runs on its own task, so dropping a caller mid-read never
/// leaves the cache half-written.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn SnapshotFetcher>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    horizon: Horizon,
    refreshing: AtomicBool,
}

/// Holds the in-flight marker; releasing it on drop covers success, error,
/// timeout and panic alike.
struct RefreshGuard {
    inner: Arc<Inner>,
}

impl RefreshGuard {
    fn acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.inner.refreshing.store(false, Ordering::Release);
    }
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fetcher,
                clock: Arc::new(SystemClock),
                ttl_ms: CRON_CACHE_TTL_MS,
                horizon: Horizon::default(),
                refreshing: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_config(
        config: &CronConfig,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn SnapshotFetcher>,
    ) -> Self {
        Self::new(store, fetcher)
            .with_ttl_ms(config.ttl_ms)
            .with_horizon(Horizon::from(config))
    }

    pub fn with_ttl_ms(self, ttl_ms: i64) -> Self {
        self.map_inner(|inner| inner.ttl_ms = ttl_ms)
    }

    pub fn with_horizon(self, horizon: Horizon) -> Self {
        self.map_inner(|inner| inner.horizon = horizon)
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        self.map_inner(|inner| inner.clock = clock)
    }

    /// Builder helper; only valid before the coordinator is shared.
    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                store: Arc::clone(&shared.store),
                fetcher: Arc::clone(&shared.fetcher),
                clock: Arc::clone(&shared.clock),
                ttl_ms: shared.ttl_ms,
                horizon: shared.horizon,
                refreshing: AtomicBool::new(false),
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Current descriptors and occurrences plus cache metadata.
    ///
    /// Never fails: upstream and storage problems surface only as
    /// `stale`/`fallback` in the returned metadata.
    pub async fn read(&self) -> CronData {
        let now = self.inner.clock.now_ms();

        let Some(cached) = self.inner.load::<CachePayload>(CACHE_KEY) else {
            return self.cold_read(now).await;
        };

        let stale = now - cached.cached_at_ms > self.inner.ttl_ms;
        if stale && self.spawn_refresh() {
            debug!(age_ms = now - cached.cached_at_ms, "cron cache stale, refreshing in background");
        }

        let state = if stale {
            CacheState::Stale
        } else {
            CacheState::Fresh
        };
        CronData {
            cron: cached.cron,
            cron_events: cached.cron_events,
            cache: CacheMeta::new(state, cached.cached_at_ms),
        }
    }

    /// Start a background refresh unless one is already running. Returns
    /// whether a refresh was started. Must be called within a Tokio runtime.
    pub fn spawn_refresh(&self) -> bool {
        let Some(guard) = RefreshGuard::acquire(&self.inner) else {
            return false;
        };
        let task = self.run_detached(guard);
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(payload)) => info!(
                    jobs = payload.cron.len(),
                    events = payload.cron_events.len(),
                    "cron cache refreshed"
                ),
                Ok(Err(e)) => warn!("background cron refresh failed: {e}"),
                Err(e) => warn!("background cron refresh aborted: {e}"),
            }
        });
        true
    }

    /// Refresh and wait for it. `Ok(false)` when another refresh was already
    /// in flight (nothing was done).
    pub async fn refresh_now(&self) -> Result<bool> {
        let Some(guard) = RefreshGuard::acquire(&self.inner) else {
            return Ok(false);
        };
        self.run_detached(guard)
            .await
            .map_err(|e| CronError::Task(e.to_string()))??;
        Ok(true)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    async fn cold_read(&self, now: i64) -> CronData {
        let Some(guard) = RefreshGuard::acquire(&self.inner) else {
            debug!("cron refresh already in flight, serving snapshot");
            return self.inner.fallback(now);
        };
        match self.run_detached(guard).await {
            Ok(Ok(payload)) => {
                info!(jobs = payload.cron.len(), "cron cache populated");
                CronData {
                    cache: CacheMeta::new(CacheState::Fresh, payload.cached_at_ms),
                    cron: payload.cron,
                    cron_events: payload.cron_events,
                }
            }
            Ok(Err(e)) => {
                warn!("cold-start cron refresh failed, serving snapshot: {e}");
                self.inner.fallback(now)
            }
            Err(e) => {
                warn!("cold-start cron refresh aborted, serving snapshot: {e}");
                self.inner.fallback(now)
            }
        }
    }

    /// Run a refresh on its own task; the guard is released when it ends.
    fn run_detached(&self, guard: RefreshGuard) -> JoinHandle<Result<CachePayload>> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = guard;
            inner.refresh().await
        })
    }
}

impl Inner {
    /// Fetch, persist the snapshot, regenerate, replace the cache payload.
    async fn refresh(&self) -> Result<CachePayload> {
        let jobs = self.fetcher.fetch().await?;

        // A lost snapshot only weakens future fallbacks; keep going.
        if let Err(e) = write_doc(self.store.as_ref(), SNAPSHOT_KEY, &jobs) {
            warn!("failed to persist cron snapshot: {e}");
        }

        let now = self.clock.now_ms();
        let payload = CachePayload {
            cached_at_ms: now,
            cron_events: generate(&jobs, now, &self.horizon),
            cron: jobs,
        };
        write_doc(self.store.as_ref(), CACHE_KEY, &payload)?;
        Ok(payload)
    }

    /// Occurrences regenerated from the last persisted snapshot.
    fn fallback(&self, now: i64) -> CronData {
        let jobs: Vec<ScheduleDescriptor> = self.load(SNAPSHOT_KEY).unwrap_or_default();
        CronData {
            cron_events: generate(&jobs, now, &self.horizon),
            cron: jobs,
            cache: CacheMeta::new(CacheState::Fallback, now),
        }
    }

    /// Unreadable documents are treated as absent.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        read_doc(self.store.as_ref(), key).unwrap_or_else(|e| {
            warn!(%key, "ignoring unreadable document: {e}");
            None
        })
    }
}
