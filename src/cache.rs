//! Short-lived in-memory cache for `/api/all-data` responses.

use crate::models::AllDataResponse;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Upper bound on live keys; the oldest entry goes first.
pub const MAX_ENTRIES: usize = 64;

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<String, (Instant, AllDataResponse)>,
    // Bumped by every invalidation.
    generation: u64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            generation: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<AllDataResponse> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<AllDataResponse> {
        let (stored_at, response) = self.entries.get(key)?;
        if now.saturating_duration_since(*stored_at) > self.ttl {
            return None;
        }
        Some(response.clone())
    }

    pub fn put(&mut self, key: String, response: AllDataResponse) {
        self.put_at(key, response, Instant::now());
    }

    /// Stores `response` only if nothing invalidated the cache since `generation` was read.
    pub fn put_if_current(
        &mut self,
        key: String,
        response: AllDataResponse,
        generation: u64,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.put(key, response);
        true
    }

    fn put_at(&mut self, key: String, response: AllDataResponse, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) <= ttl);

        if !self.entries.contains_key(&key) && self.entries.len() >= MAX_ENTRIES {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(oldest_key, _)| oldest_key.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, (now, response));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops everything. Called after any write to the store.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }
}

/// Cache key for one `(sort_by, sort_dir, session_id)` combination.
pub fn cache_key(sort_by: &str, sort_dir: &str, session_id: &str) -> String {
    if sort_by.is_empty() && session_id.is_empty() {
        "no_sort".to_string()
    } else {
        format!("{sort_by}_{sort_dir}_{session_id}")
    }
}
