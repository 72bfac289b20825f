use async_trait::async_trait;
use gmv_dashboard::client::cache::{cache_key, read_cached, write_cached};
use gmv_dashboard::client::sync::{LIVE_LABEL, LOADING_HTML, LOADING_LABEL};
use gmv_dashboard::client::{
    CacheEntry, CacheStore, DashboardApi, DashboardView, ElementId, MemoryStore, MemoryView,
    PageHooks, SelectOption, SessionController, SyncError, CACHE_VERSION,
};
use gmv_dashboard::models::{
    AllDataResponse, HistoryDataResponse, ProductRow, SessionSummary, Timeslot,
};
use gmv_dashboard::stats::{history_stats, live_stats};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Default)]
struct FakeApi {
    sessions: Option<Vec<SessionSummary>>,
    timeslots: HashMap<String, Vec<Timeslot>>,
    timeslot_delay: HashMap<String, Duration>,
    history: HashMap<String, Vec<ProductRow>>,
    history_delay: HashMap<String, Duration>,
    live: HashMap<String, Vec<ProductRow>>,
    failing_live: Mutex<HashSet<String>>,
    live_calls: Mutex<Vec<(String, Duration)>>,
    history_calls: AtomicUsize,
    start: Option<Instant>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            start: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.map(|s| s.elapsed()).unwrap_or_default()
    }

    fn live_calls(&self) -> Vec<(String, Duration)> {
        self.live_calls.lock().unwrap().clone()
    }

    fn live_call_ids(&self) -> Vec<String> {
        self.live_calls().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn sessions(&self) -> Result<Vec<SessionSummary>, SyncError> {
        self.sessions
            .clone()
            .ok_or_else(|| SyncError::Server("sessions unavailable".to_string()))
    }

    async fn timeslots(&self, session_id: &str) -> Result<Vec<Timeslot>, SyncError> {
        if let Some(delay) = self.timeslot_delay.get(session_id) {
            sleep(*delay).await;
        }
        self.timeslots
            .get(session_id)
            .cloned()
            .ok_or_else(|| SyncError::Status {
                status: 500,
                message: "boom".to_string(),
            })
    }

    async fn history_data(
        &self,
        session_id: &str,
        archived_at: &str,
    ) -> Result<HistoryDataResponse, SyncError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.history_delay.get(archived_at) {
            sleep(*delay).await;
        }
        let rows = self
            .history
            .get(archived_at)
            .cloned()
            .ok_or_else(|| SyncError::Server("no such snapshot".to_string()))?;
        Ok(HistoryDataResponse {
            success: true,
            session_id: session_id.to_string(),
            archived_at: archived_at.to_string(),
            count: rows.len(),
            stats: history_stats(&rows),
            data: rows,
            error: None,
        })
    }

    async fn all_data(&self, session_id: &str) -> Result<AllDataResponse, SyncError> {
        self.live_calls
            .lock()
            .unwrap()
            .push((session_id.to_string(), self.elapsed()));
        if self.failing_live.lock().unwrap().contains(session_id) {
            return Err(SyncError::Server("database down".to_string()));
        }
        let rows = self.live.get(session_id).cloned().unwrap_or_default();
        Ok(AllDataResponse {
            success: true,
            shop_ids: Vec::new(),
            stats: live_stats(&rows),
            last_sync: None,
            data: rows,
            from_cache: false,
            error: None,
        })
    }
}

fn session(id: &str, title: Option<&str>) -> SessionSummary {
    SessionSummary {
        session_id: id.to_string(),
        session_title: title.map(str::to_string),
        item_count: 0,
        last_scraped: None,
    }
}

fn slot(archived_at: &str, item_count: usize) -> Timeslot {
    Timeslot {
        archived_at: archived_at.to_string(),
        item_count,
    }
}

fn row(item_id: &str, revenue: i64, confirmed: i64) -> ProductRow {
    ProductRow {
        item_id: item_id.to_string(),
        revenue,
        confirmed_revenue: confirmed,
        ..Default::default()
    }
}

struct Harness {
    api: Arc<FakeApi>,
    store: Arc<MemoryStore>,
    view: Arc<MemoryView>,
    controller: SessionController,
}

fn harness(api: FakeApi, hooks: PageHooks) -> Harness {
    harness_with_view(api, hooks, MemoryView::new())
}

fn harness_with_view(api: FakeApi, hooks: PageHooks, view: MemoryView) -> Harness {
    let api = Arc::new(api);
    let store = Arc::new(MemoryStore::new());
    let view = Arc::new(view);
    let controller = SessionController::new(
        api.clone(),
        store.clone(),
        view.clone() as Arc<dyn DashboardView>,
        hooks,
    );
    Harness {
        api,
        store,
        view,
        controller,
    }
}

fn labels(options: &[SelectOption]) -> Vec<(&str, &str)> {
    options
        .iter()
        .map(|opt| (opt.value.as_str(), opt.label.as_str()))
        .collect()
}

fn counting_hook() -> (Arc<AtomicUsize>, Arc<dyn Fn() + Send + Sync>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let hook: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (count, hook)
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn load_sessions_fills_selector_with_fallback_labels() {
    let mut api = FakeApi::new();
    api.sessions = Some(vec![session("s1", Some("[16.01] Host")), session("s2", None)]);
    let h = harness(api, PageHooks::default());

    assert_eq!(h.controller.on_session_filter_hover(), 0);

    h.controller.load_sessions().await;
    let options = h.view.options(ElementId::SessionFilter);
    assert_eq!(
        labels(&options),
        vec![("s1", "[16.01] Host"), ("s2", "Session s2")]
    );
    assert_eq!(h.controller.state().sessions.len(), 2);
    assert_eq!(h.controller.on_session_filter_hover(), 2);
}

#[tokio::test(start_paused = true)]
async fn load_sessions_failure_keeps_previous_options() {
    let view = MemoryView::new();
    view.set_options(ElementId::SessionFilter, vec![SelectOption::new("old", "Old")]);
    let h = harness_with_view(FakeApi::new(), PageHooks::default(), view);

    h.controller.load_sessions().await;

    assert_eq!(
        labels(&h.view.options(ElementId::SessionFilter)),
        vec![("old", "Old")]
    );
    assert_eq!(h.controller.on_session_filter_hover(), 0);
}

#[tokio::test(start_paused = true)]
async fn session_change_resets_history_and_lists_timeslots_in_server_order() {
    let mut api = FakeApi::new();
    api.sessions = Some(vec![session("s1", Some("Morning live"))]);
    api.timeslots.insert(
        "s1".to_string(),
        vec![
            slot("2026-01-16T09:00:00", 4),
            slot("2026-01-16T11:00:00", 5),
        ],
    );
    api.history
        .insert("2026-01-16T09:00:00".to_string(), vec![row("1", 10, 5)]);
    api.live.insert(
        "s1".to_string(),
        vec![row("1", 2_500_000, 1_000_000), row("2", 500_000, 0)],
    );
    let h = harness(api, PageHooks::default());
    h.controller.load_sessions().await;

    h.controller.on_session_change("s1").await;
    h.controller.on_history_slot_change("2026-01-16T09:00:00").await;
    assert_eq!(h.controller.current_archived_at(), "2026-01-16T09:00:00");

    h.controller.on_session_change("s1").await;

    let state = h.controller.state();
    assert_eq!(state.current_session_id, "s1");
    assert_eq!(state.current_archived_at, "");
    assert!(state.data_loaded);
    assert_eq!(state.full_data.len(), 2);

    let history = h.view.options(ElementId::HistorySlotFilter);
    assert_eq!(
        labels(&history),
        vec![
            ("", LIVE_LABEL),
            ("2026-01-16T09:00:00", "16/01/2026 09:00 (4 items)"),
            ("2026-01-16T11:00:00", "16/01/2026 11:00 (5 items)"),
        ]
    );
    assert!(history.iter().all(|opt| !opt.disabled));
    assert!(!h.view.is_disabled(ElementId::HistorySlotFilter));

    assert_eq!(
        h.view.text(ElementId::CurrentSessionTitle).as_deref(),
        Some("Morning live")
    );
    assert!(h.view.has_class(ElementId::SessionInfoBadge, "show"));
    assert_eq!(h.view.text(ElementId::TotalRevenue).as_deref(), Some("3.0M đ"));
    assert_eq!(
        h.view.text(ElementId::TotalConfirmedRevenue).as_deref(),
        Some("1.0M đ")
    );
    assert_eq!(h.view.text(ElementId::GapRevenue).as_deref(), Some("2.0M đ"));
    assert_eq!(h.view.text(ElementId::CurrentProductCount).as_deref(), Some("2"));
}

#[tokio::test(start_paused = true)]
async fn loading_state_is_shown_before_timeslots_arrive() {
    let mut api = FakeApi::new();
    api.timeslots
        .insert("s1".to_string(), vec![slot("2026-01-16T09:00:00", 1)]);
    api.timeslot_delay
        .insert("s1".to_string(), Duration::from_millis(200));
    let h = harness(api, PageHooks::default());

    let observe = async {
        sleep(Duration::from_millis(50)).await;
        assert_eq!(h.view.html(ElementId::TableWrapper).as_deref(), Some(LOADING_HTML));
        assert!(h.view.is_disabled(ElementId::HistorySlotFilter));
        let options = h.view.options(ElementId::HistorySlotFilter);
        assert_eq!(labels(&options), vec![("", LIVE_LABEL), ("", LOADING_LABEL)]);
        assert!(options[1].disabled);
    };
    tokio::join!(h.controller.on_session_change("s1"), observe);

    assert_eq!(h.view.options(ElementId::HistorySlotFilter).len(), 2);
    assert!(!h.view.is_disabled(ElementId::HistorySlotFilter));
}

#[tokio::test(start_paused = true)]
async fn live_data_does_not_wait_for_timeslots() {
    let mut api = FakeApi::new();
    api.timeslots
        .insert("s1".to_string(), vec![slot("2026-01-16T09:00:00", 1)]);
    api.timeslot_delay
        .insert("s1".to_string(), Duration::from_secs(30));
    api.live.insert("s1".to_string(), vec![row("1", 2_000, 0)]);
    let h = harness(api, PageHooks::default());

    let observe = async {
        sleep(Duration::from_millis(10)).await;
        let calls = h.api.live_calls();
        assert_eq!(calls.len(), 1);
        assert_near(calls[0].1, 0);
        assert!(h.controller.state().data_loaded);
        assert!(h.view.has_class(ElementId::SessionInfoBadge, "show"));
        assert_eq!(h.view.text(ElementId::TotalRevenue).as_deref(), Some("2K đ"));
        assert!(h.view.is_disabled(ElementId::HistorySlotFilter));
    };
    tokio::join!(h.controller.on_session_change("s1"), observe);

    assert_eq!(h.view.options(ElementId::HistorySlotFilter).len(), 2);
    assert!(!h.view.is_disabled(ElementId::HistorySlotFilter));
}

#[tokio::test(start_paused = true)]
async fn timeslot_failure_leaves_only_live_option() {
    let (loads, load_hook) = counting_hook();
    let hooks = PageHooks {
        load_live: Some(load_hook),
        refilter: None,
    };
    let h = harness(FakeApi::new(), hooks);

    h.controller.on_session_change("missing").await;

    let history = h.view.options(ElementId::HistorySlotFilter);
    assert_eq!(labels(&history), vec![("", LIVE_LABEL)]);
    assert!(!h.view.is_disabled(ElementId::HistorySlotFilter));
    assert_eq!(
        h.view.text(ElementId::CurrentSessionTitle).as_deref(),
        Some("Session missing")
    );
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(h.api.live_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn history_slot_updates_stats_and_rerenders() {
    let mut api = FakeApi::new();
    api.history.insert(
        "2026-01-16T09:00:00".to_string(),
        vec![row("1", 2_500_000, 1_000_000)],
    );
    let (renders, render_hook) = counting_hook();
    let (loads, load_hook) = counting_hook();
    let hooks = PageHooks {
        load_live: Some(load_hook),
        refilter: Some(render_hook),
    };
    let h = harness(api, hooks);

    h.controller.on_history_slot_change("2026-01-16T09:00:00").await;

    let state = h.controller.state();
    assert!(state.data_loaded);
    assert_eq!(state.full_data, vec![row("1", 2_500_000, 1_000_000)]);
    assert_eq!(h.view.text(ElementId::TotalRevenue).as_deref(), Some("2.5M đ"));
    assert_eq!(
        h.view.text(ElementId::TotalConfirmedRevenue).as_deref(),
        Some("1.0M đ")
    );
    assert_eq!(h.view.text(ElementId::GapRevenue).as_deref(), Some("1.5M đ"));
    assert_eq!(h.view.text(ElementId::CurrentProductCount).as_deref(), Some("1"));
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn history_without_render_hook_still_updates_stats() {
    let mut api = FakeApi::new();
    api.history
        .insert("2026-01-16T09:00:00".to_string(), vec![row("1", 1_500, 0)]);
    let h = harness(api, PageHooks::default());

    h.controller.on_history_slot_change("2026-01-16T09:00:00").await;
    assert_eq!(h.view.text(ElementId::TotalRevenue).as_deref(), Some("2K đ"));
}

#[tokio::test(start_paused = true)]
async fn history_failure_leaves_data_untouched() {
    let mut api = FakeApi::new();
    api.timeslots.insert("s1".to_string(), Vec::new());
    api.live.insert("s1".to_string(), vec![row("1", 5_000, 1_000)]);
    let h = harness(api, PageHooks::default());
    h.controller.on_session_change("s1").await;
    let before = h.controller.state();

    h.controller.on_history_slot_change("2020-01-01T00:00:00").await;

    let after = h.controller.state();
    assert_eq!(after.full_data, before.full_data);
    assert!(after.data_loaded);
    assert_eq!(after.current_archived_at, "");
    assert_eq!(h.view.text(ElementId::TotalRevenue).as_deref(), Some("5K đ"));
}

#[tokio::test(start_paused = true)]
async fn failed_snapshot_keeps_previous_selection() {
    let mut api = FakeApi::new();
    api.history
        .insert("2026-01-16T09:00:00".to_string(), vec![row("1", 10, 0)]);
    let h = harness(api, PageHooks::default());

    h.controller.on_history_slot_change("2026-01-16T09:00:00").await;
    h.controller.on_history_slot_change("2026-01-16T23:00:00").await;

    assert_eq!(h.controller.current_archived_at(), "2026-01-16T09:00:00");
    assert_eq!(h.controller.state().full_data, vec![row("1", 10, 0)]);
}

#[tokio::test(start_paused = true)]
async fn empty_history_selection_delegates_to_live_loader() {
    let (loads, load_hook) = counting_hook();
    let hooks = PageHooks {
        load_live: Some(load_hook),
        refilter: None,
    };
    let h = harness(FakeApi::new(), hooks);

    h.controller.on_history_slot_change("").await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.history_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.controller.current_archived_at(), "");
}

#[tokio::test(start_paused = true)]
async fn slow_timeslots_for_superseded_session_are_dropped() {
    let mut api = FakeApi::new();
    api.timeslots
        .insert("s1".to_string(), vec![slot("2026-01-16T09:00:00", 1)]);
    api.timeslots
        .insert("s2".to_string(), vec![slot("2026-01-17T09:00:00", 2)]);
    api.timeslot_delay
        .insert("s1".to_string(), Duration::from_millis(500));
    let h = harness(api, PageHooks::default());

    let later = async {
        sleep(Duration::from_millis(10)).await;
        h.controller.on_session_change("s2").await;
    };
    tokio::join!(h.controller.on_session_change("s1"), later);

    assert_eq!(h.controller.current_session_id(), "s2");
    let history = h.view.options(ElementId::HistorySlotFilter);
    assert_eq!(
        labels(&history),
        vec![("", LIVE_LABEL), ("2026-01-17T09:00:00", "17/01/2026 09:00 (2 items)")]
    );
    assert_eq!(
        h.api.live_call_ids(),
        vec!["s1".to_string(), "s2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_history_response_does_not_overwrite_newer_selection() {
    let mut api = FakeApi::new();
    api.history
        .insert("slow".to_string(), vec![row("old", 1, 0)]);
    api.history
        .insert("fast".to_string(), vec![row("new", 2, 0)]);
    api.history_delay
        .insert("slow".to_string(), Duration::from_millis(500));
    let h = harness(api, PageHooks::default());

    let later = async {
        sleep(Duration::from_millis(10)).await;
        h.controller.on_history_slot_change("fast").await;
    };
    tokio::join!(h.controller.on_history_slot_change("slow"), later);

    assert_eq!(h.controller.current_archived_at(), "fast");
    assert_eq!(h.controller.state().full_data, vec![row("new", 2, 0)]);
}

#[tokio::test(start_paused = true)]
async fn preload_is_debounced_and_idempotent() {
    let mut api = FakeApi::new();
    api.live.insert("s1".to_string(), vec![row("1", 10, 0)]);
    let h = harness(api, PageHooks::default());
    let preloader = h.controller.preloader();

    preloader.preload_session_data("s1");
    sleep(Duration::from_millis(100)).await;
    preloader.preload_session_data("s1");
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.api.live_call_ids(), vec!["s1".to_string()]);
    assert!(preloader.is_preloaded("s1"));
    let cached = read_cached(h.store.as_ref(), "s1").await.expect("cache entry");
    assert_eq!(cached.version, CACHE_VERSION);
    assert_eq!(cached.data, vec![row("1", 10, 0)]);

    preloader.preload_session_data("s1");
    preloader.preload_session_data("");
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.api.live_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_preloads_only_fetch_the_last_session() {
    let h = harness(FakeApi::new(), PageHooks::default());
    let preloader = h.controller.preloader();

    preloader.preload_session_data("s1");
    sleep(Duration::from_millis(100)).await;
    preloader.preload_session_data("s2");
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.api.live_call_ids(),
        vec!["s1".to_string(), "s2".to_string()]
    );
    assert!(!preloader.is_preloaded("s1"));
    assert!(preloader.is_preloaded("s2"));
}

#[tokio::test(start_paused = true)]
async fn failed_preload_stays_eligible_for_retry() {
    let api = FakeApi::new();
    api.failing_live.lock().unwrap().insert("s1".to_string());
    let h = harness(api, PageHooks::default());
    let preloader = h.controller.preloader();

    preloader.preload_session_data("s1");
    sleep(Duration::from_secs(1)).await;
    assert!(!preloader.is_preloaded("s1"));
    assert!(h.store.get(&cache_key("s1")).await.is_none());

    h.api.failing_live.lock().unwrap().clear();
    preloader.preload_session_data("s1");
    sleep(Duration::from_secs(1)).await;
    assert!(preloader.is_preloaded("s1"));
    assert_eq!(h.api.live_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn hover_staggers_the_first_three_sessions() {
    let mut api = FakeApi::new();
    api.sessions = Some(
        (1..=5)
            .map(|n| session(&format!("s{n}"), None))
            .collect(),
    );
    let h = harness(api, PageHooks::default());
    h.controller.load_sessions().await;

    assert_eq!(h.controller.on_session_filter_hover(), 3);
    sleep(Duration::from_secs(3)).await;

    let calls = h.api.live_calls();
    let ids: Vec<&str> = calls.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
    assert_near(calls[0].1, 300);
    assert_near(calls[1].1, 800);
    assert_near(calls[2].1, 1300);
}

#[tokio::test(start_paused = true)]
async fn live_loader_ignores_stale_cache_versions() {
    let mut api = FakeApi::new();
    api.timeslots.insert("s1".to_string(), Vec::new());
    api.failing_live.lock().unwrap().insert("s1".to_string());
    let h = harness(api, PageHooks::default());

    let mut stale = CacheEntry {
        version: CACHE_VERSION - 1,
        data: vec![row("stale", 1, 0)],
        shop_ids: Vec::new(),
        stats: Default::default(),
        last_sync: None,
        timestamp: 0,
    };
    write_cached(h.store.as_ref(), "s1", &stale).await.unwrap();

    h.controller.on_session_change("s1").await;
    let state = h.controller.state();
    assert!(!state.data_loaded);
    assert!(state.full_data.is_empty());

    stale.version = CACHE_VERSION;
    stale.data = vec![row("cached", 1, 0)];
    write_cached(h.store.as_ref(), "s1", &stale).await.unwrap();

    h.controller.on_session_change("s1").await;
    let state = h.controller.state();
    assert!(state.data_loaded);
    assert_eq!(state.full_data, vec![row("cached", 1, 0)]);
}

#[tokio::test(start_paused = true)]
async fn live_loader_refreshes_cache_after_fetch() {
    let mut api = FakeApi::new();
    api.timeslots.insert("s1".to_string(), Vec::new());
    api.live.insert("s1".to_string(), vec![row("fresh", 7, 0)]);
    let h = harness(api, PageHooks::default());

    h.controller.on_session_change("s1").await;

    let cached = read_cached(h.store.as_ref(), "s1").await.expect("cache entry");
    assert_eq!(cached.data, vec![row("fresh", 7, 0)]);
    assert_eq!(h.controller.state().full_data, vec![row("fresh", 7, 0)]);
}
