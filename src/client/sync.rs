//! Session and history selection state machine.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, info, warn};

use super::api::DashboardApi;
use super::cache::{read_cached, write_cached, CacheEntry, CacheStore};
use super::lock;
use super::preload::Preloader;
use super::view::{DashboardView, ElementId, SelectOption};
use crate::models::{session_label, LiveStats, ProductRow, SessionSummary, Timeslot};
use crate::util::format_currency;

pub const LIVE_LABEL: &str = "Live now";
pub const LOADING_LABEL: &str = "Loading…";
pub const LOADING_HTML: &str = r#"<div class="loading">Loading data…</div>"#;

pub type PageHook = Arc<dyn Fn() + Send + Sync>;

/// Optional callbacks into the host page.
///
/// Without `load_live` the controller's own [`SessionController::load_live_data`] runs.
/// Without `refilter` nothing is re-rendered after new data lands.
#[derive(Clone, Default)]
pub struct PageHooks {
    pub load_live: Option<PageHook>,
    pub refilter: Option<PageHook>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub current_session_id: String,
    /// Empty means live data.
    pub current_archived_at: String,
    pub data_loaded: bool,
    pub full_data: Vec<ProductRow>,
    pub sessions: Vec<SessionSummary>,
    // Latest request issued per slot; older responses are dropped.
    timeslot_seq: u64,
    data_seq: u64,
    listeners_attached: bool,
}

pub struct SessionController {
    api: Arc<dyn DashboardApi>,
    store: Arc<dyn CacheStore>,
    view: Arc<dyn DashboardView>,
    hooks: PageHooks,
    preloader: Preloader,
    state: Mutex<SyncState>,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        store: Arc<dyn CacheStore>,
        view: Arc<dyn DashboardView>,
        hooks: PageHooks,
    ) -> Self {
        let preloader = Preloader::new(Arc::clone(&api), Arc::clone(&store));
        Self {
            api,
            store,
            view,
            hooks,
            preloader,
            state: Mutex::new(SyncState::default()),
        }
    }

    pub fn state(&self) -> SyncState {
        lock(&self.state).clone()
    }

    pub fn current_session_id(&self) -> String {
        lock(&self.state).current_session_id.clone()
    }

    pub fn current_archived_at(&self) -> String {
        lock(&self.state).current_archived_at.clone()
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    /// Fills the session selector. On failure the selector keeps its previous options.
    pub async fn load_sessions(&self) {
        let sessions = match self.api.sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!("failed to load sessions: {err}");
                return;
            }
        };

        let options = sessions
            .iter()
            .map(|session| SelectOption::new(session.session_id.clone(), session.label()))
            .collect();
        self.view.set_options(ElementId::SessionFilter, options);
        info!(count = sessions.len(), "loaded sessions");
        lock(&self.state).sessions = sessions;

        // Options exist now, so hover targets are valid.
        self.attach_preload_listeners();
    }

    /// Enables hover preloading. Only the first call has an effect.
    fn attach_preload_listeners(&self) -> bool {
        let mut state = lock(&self.state);
        if state.listeners_attached {
            return false;
        }
        state.listeners_attached = true;
        true
    }

    /// Pointer entered the session selector: warm the first few listed sessions.
    /// Returns how many preloads were scheduled.
    pub fn on_session_filter_hover(&self) -> usize {
        if !lock(&self.state).listeners_attached {
            return 0;
        }
        let ids = self
            .view
            .options(ElementId::SessionFilter)
            .into_iter()
            .map(|opt| opt.value);
        self.preloader.schedule_staggered(ids)
    }

    pub async fn on_session_change(&self, session_id: &str) {
        let (timeslot_seq, label) = {
            let mut state = lock(&self.state);
            state.current_session_id = session_id.to_string();
            state.current_archived_at.clear();
            state.timeslot_seq += 1;
            state.data_seq += 1;
            let title = state
                .sessions
                .iter()
                .find(|s| s.session_id == session_id)
                .and_then(|s| s.session_title.clone());
            (state.timeslot_seq, session_label(session_id, title.as_deref()))
        };

        self.view.set_html(ElementId::TableWrapper, LOADING_HTML);

        // The history selector and the live data load side by side.
        tokio::join!(
            self.refresh_timeslots(session_id, timeslot_seq),
            self.reload_live(&label),
        );
    }

    async fn refresh_timeslots(&self, session_id: &str, timeslot_seq: u64) {
        self.view.set_disabled(ElementId::HistorySlotFilter, true);
        self.view.set_options(
            ElementId::HistorySlotFilter,
            vec![live_option(), SelectOption::new("", LOADING_LABEL).disabled()],
        );

        let result = self.api.timeslots(session_id).await;
        if lock(&self.state).timeslot_seq != timeslot_seq {
            debug!(session_id, "dropping timeslots for superseded session");
            return;
        }

        let mut options = vec![live_option()];
        match result {
            Ok(timeslots) => options.extend(timeslots.iter().map(timeslot_option)),
            Err(err) => warn!(session_id, "failed to load timeslots: {err}"),
        }
        self.view.set_options(ElementId::HistorySlotFilter, options);
        self.view.set_disabled(ElementId::HistorySlotFilter, false);
    }

    async fn reload_live(&self, label: &str) {
        self.view.set_text(ElementId::CurrentSessionTitle, label);
        self.view.set_class(ElementId::SessionInfoBadge, "show", true);

        {
            let mut state = lock(&self.state);
            state.data_loaded = false;
            state.full_data.clear();
        }
        self.load_live().await;
    }

    /// Switches to a snapshot, or back to live data for an empty `archived_at`.
    /// `current_archived_at` only changes once the snapshot's rows are applied.
    pub async fn on_history_slot_change(&self, archived_at: &str) {
        let (session_id, data_seq) = {
            let mut state = lock(&self.state);
            state.data_seq += 1;
            if archived_at.is_empty() {
                state.current_archived_at.clear();
            }
            (state.current_session_id.clone(), state.data_seq)
        };

        if archived_at.is_empty() {
            self.load_live().await;
            return;
        }

        let response = match self.api.history_data(&session_id, archived_at).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%session_id, archived_at, "failed to load history data: {err}");
                return;
            }
        };

        {
            let mut state = lock(&self.state);
            if state.data_seq != data_seq {
                debug!(%session_id, archived_at, "dropping superseded history data");
                return;
            }
            state.current_archived_at = archived_at.to_string();
            state.full_data = response.data;
            state.data_loaded = true;
        }

        let stats = response.stats;
        self.show_stats(stats.total_gmv, stats.total_nmv, stats.gap, response.count);
        self.rerender();
    }

    /// Built-in live loader: a valid cache entry is shown at once, then replaced by a fresh fetch.
    pub async fn load_live_data(&self) {
        let (session_id, data_seq) = {
            let mut state = lock(&self.state);
            state.data_seq += 1;
            (state.current_session_id.clone(), state.data_seq)
        };

        if !session_id.is_empty() {
            if let Some(entry) = read_cached(self.store.as_ref(), &session_id).await {
                debug!(%session_id, rows = entry.data.len(), "showing cached data");
                self.apply_live(data_seq, entry.data, entry.stats);
            }
        }

        let response = match self.api.all_data(&session_id).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%session_id, "failed to load live data: {err}");
                return;
            }
        };

        if !session_id.is_empty() {
            let entry = CacheEntry::from_response(&response);
            if let Err(err) = write_cached(self.store.as_ref(), &session_id, &entry).await {
                warn!(%session_id, "failed to cache live data: {err}");
            }
        }
        self.apply_live(data_seq, response.data, response.stats);
    }

    async fn load_live(&self) {
        match &self.hooks.load_live {
            Some(hook) => hook(),
            None => self.load_live_data().await,
        }
    }

    fn apply_live(&self, data_seq: u64, rows: Vec<ProductRow>, stats: LiveStats) {
        let count = rows.len();
        {
            let mut state = lock(&self.state);
            if state.data_seq != data_seq {
                debug!("dropping superseded live data");
                return;
            }
            state.full_data = rows;
            state.data_loaded = true;
        }
        self.show_stats(
            stats.total_revenue,
            stats.total_confirmed_revenue,
            stats.gap(),
            count,
        );
        self.rerender();
    }

    fn show_stats(&self, gmv: i64, nmv: i64, gap: i64, count: usize) {
        self.view
            .set_text(ElementId::TotalRevenue, &format_currency(gmv as f64));
        self.view
            .set_text(ElementId::TotalConfirmedRevenue, &format_currency(nmv as f64));
        self.view
            .set_text(ElementId::GapRevenue, &format_currency(gap as f64));
        self.view
            .set_text(ElementId::CurrentProductCount, &count.to_string());
    }

    fn rerender(&self) {
        if let Some(refilter) = &self.hooks.refilter {
            refilter();
        }
    }
}

fn live_option() -> SelectOption {
    SelectOption::new("", LIVE_LABEL)
}

fn timeslot_option(slot: &Timeslot) -> SelectOption {
    SelectOption::new(slot.archived_at.clone(), timeslot_label(slot))
}

/// `"16/01/2026 14:30 (120 items)"`; unparseable stamps are shown raw.
pub fn timeslot_label(slot: &Timeslot) -> String {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    let when = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&slot.archived_at, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(&slot.archived_at)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| slot.archived_at.clone());
    format!("{when} ({} items)", slot.item_count)
}
