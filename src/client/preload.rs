//! Hover-driven background warming of the dataset cache.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use super::api::DashboardApi;
use super::cache::{write_cached, CacheEntry, CacheStore};
use super::debounce::Debouncer;
use super::lock;

pub const PRELOAD_DEBOUNCE: Duration = Duration::from_millis(300);
pub const STAGGER_STEP: Duration = Duration::from_millis(500);
pub const MAX_STAGGERED: usize = 3;

struct PreloadShared {
    api: Arc<dyn DashboardApi>,
    store: Arc<dyn CacheStore>,
    preloaded: Mutex<HashSet<String>>,
}

/// Fetches and caches whole session datasets ahead of selection.
///
/// A session is warmed at most once per preloader. All requests share one debounce slot,
/// so of several sessions requested within [`PRELOAD_DEBOUNCE`] only the last is fetched.
#[derive(Clone)]
pub struct Preloader {
    shared: Arc<PreloadShared>,
    debouncer: Debouncer<String>,
}

impl Preloader {
    pub fn new(api: Arc<dyn DashboardApi>, store: Arc<dyn CacheStore>) -> Self {
        let shared = Arc::new(PreloadShared {
            api,
            store,
            preloaded: Mutex::new(HashSet::new()),
        });
        let fire = Arc::clone(&shared);
        let debouncer = Debouncer::new(PRELOAD_DEBOUNCE, move |session_id: String| {
            fetch_and_cache(Arc::clone(&fire), session_id)
        });
        Self { shared, debouncer }
    }

    pub fn is_preloaded(&self, session_id: &str) -> bool {
        lock(&self.shared.preloaded).contains(session_id)
    }

    /// Schedules a warm-up for `session_id`. Empty or already-warmed ids are ignored.
    pub fn preload_session_data(&self, session_id: &str) {
        if session_id.is_empty() || self.is_preloaded(session_id) {
            return;
        }
        self.debouncer.call(session_id.to_string());
    }

    /// Spreads preloads for the first [`MAX_STAGGERED`] ids, `index * STAGGER_STEP` apart.
    /// Returns how many were scheduled.
    pub fn schedule_staggered<I>(&self, session_ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut scheduled = 0;
        for (index, session_id) in session_ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .take(MAX_STAGGERED)
            .enumerate()
        {
            let preloader = self.clone();
            let delay = STAGGER_STEP * index as u32;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                preloader.preload_session_data(&session_id);
            });
            scheduled += 1;
        }
        scheduled
    }
}

async fn fetch_and_cache(shared: Arc<PreloadShared>, session_id: String) {
    let response = match shared.api.all_data(&session_id).await {
        Ok(response) => response,
        Err(err) => {
            warn!(%session_id, "preload failed: {err}");
            return;
        }
    };

    let entry = CacheEntry::from_response(&response);
    if let Err(err) = write_cached(shared.store.as_ref(), &session_id, &entry).await {
        warn!(%session_id, "preload cache write failed: {err}");
        return;
    }

    debug!(%session_id, rows = entry.data.len(), "preloaded session");
    lock(&shared.preloaded).insert(session_id);
}
