//! Client-side session/history sync layer.
//!
//! A [`SessionController`] owns the selected session and snapshot, talks to the
//! dashboard's JSON API through [`DashboardApi`], writes versioned entries into a
//! [`CacheStore`] and reflects results onto a [`DashboardView`].

pub mod api;
pub mod cache;
pub mod clipboard;
pub mod debounce;
pub mod error;
pub mod preload;
pub mod sync;
pub mod view;

pub use api::{DashboardApi, HttpApi};
pub use cache::{CacheEntry, CacheStore, FileStore, MemoryStore, CACHE_VERSION};
pub use clipboard::{copy_text, Clipboard, ClipboardError, CopyOutcome};
pub use debounce::Debouncer;
pub use error::{Result, SyncError};
pub use preload::Preloader;
pub use sync::{PageHook, PageHooks, SessionController, SyncState};
pub use view::{DashboardView, ElementId, MemoryView, SelectOption};

use std::sync::{Mutex, MutexGuard, PoisonError};

// State behind these mutexes is plain data, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
