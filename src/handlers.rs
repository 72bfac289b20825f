use crate::archive::{self, local_stamp, run_archive};
use crate::cache::cache_key;
use crate::errors::AppError;
use crate::import::{apply_import, enrich};
use crate::models::{
    AllDataQuery, AllDataResponse, AnalyticsQuery, AppData, ArchiveResponse,
    ArchivedSessionsResponse, CacheStatusEntry, CacheStatusResponse, CategoryDistributionResponse,
    HistoryDataQuery, HistoryDataResponse, ImportRequest, ImportResponse, ProductRow, SessionQuery,
    SessionSummary, SessionsResponse, TimeslotsResponse, TopProductsResponse,
};
use crate::state::AppState;
use crate::stats::{
    analytics_metric, category_distribution, history_stats, live_stats, shop_ids, top_products,
};
use crate::storage::persist_data;
use crate::ui::{render_dashboard, DashboardPage};
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use tracing::{debug, info};

const SORT_COLUMNS: [&str; 6] = [
    "revenue",
    "clicks",
    "add_to_cart",
    "orders",
    "confirmed_revenue",
    "items_sold",
];

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Html<String> {
    let data = state.data.lock().await;
    let sessions = active_sessions(&data);
    let selected = match query.session_id.trim() {
        "" => sessions.first().map(|s| s.session_id.clone()),
        id => Some(id.to_string()),
    };

    let mut rows = match selected.as_deref() {
        Some(id) => live_rows(&data, id),
        None => Vec::new(),
    };
    sort_rows(&mut rows, "revenue", "desc");
    let stats = live_stats(&rows);

    Html(render_dashboard(&DashboardPage {
        sessions: &sessions,
        selected: selected.as_deref(),
        rows: &rows,
        stats: &stats,
    }))
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let data = state.data.lock().await;
    let sessions = active_sessions(&data);
    Json(SessionsResponse {
        success: true,
        count: sessions.len(),
        sessions,
        error: None,
    })
}

pub async fn get_archived_sessions(
    State(state): State<AppState>,
) -> Json<ArchivedSessionsResponse> {
    let data = state.data.lock().await;
    let sessions = archive::archived_sessions(&data);
    Json(ArchivedSessionsResponse {
        success: true,
        count: sessions.len(),
        sessions,
    })
}

pub async fn get_timeslots(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<TimeslotsResponse>, AppError> {
    let session_id = query.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::bad_request("session_id is required"));
    }

    let data = state.data.lock().await;
    let timeslots = archive::timeslots(&data, session_id);
    Ok(Json(TimeslotsResponse {
        success: true,
        session_id: session_id.to_string(),
        count: timeslots.len(),
        timeslots,
        error: None,
    }))
}

pub async fn get_history_data(
    State(state): State<AppState>,
    Query(query): Query<HistoryDataQuery>,
) -> Result<Json<HistoryDataResponse>, AppError> {
    let session_id = query.session_id.trim();
    let archived_at = query.archived_at.trim();
    if session_id.is_empty() || archived_at.is_empty() {
        return Err(AppError::bad_request(
            "session_id and archived_at are required",
        ));
    }

    let data = state.data.lock().await;
    let rows = archive::snapshot_rows(&data, session_id, archived_at);
    Ok(Json(HistoryDataResponse {
        success: true,
        session_id: session_id.to_string(),
        archived_at: archived_at.to_string(),
        count: rows.len(),
        stats: history_stats(&rows),
        data: rows,
        error: None,
    }))
}

pub async fn get_all_data(
    State(state): State<AppState>,
    Query(query): Query<AllDataQuery>,
) -> Json<AllDataResponse> {
    let sort_by = query.sort_by.trim();
    let sort_by = if SORT_COLUMNS.contains(&sort_by) { sort_by } else { "" };
    let sort_dir = match query.sort_dir.trim().to_ascii_lowercase().as_str() {
        "asc" => "asc",
        _ => "desc",
    };
    let session_id = query.session_id.trim();
    let key = cache_key(sort_by, sort_dir, session_id);

    let generation = {
        let cache = state.cache.lock().await;
        if let Some(mut cached) = cache.get(&key) {
            debug!(%key, rows = cached.data.len(), "serving all-data from cache");
            cached.from_cache = true;
            return Json(cached);
        }
        cache.generation()
    };

    let data = state.data.lock().await;
    let mut rows = live_rows(&data, session_id);
    sort_rows(&mut rows, sort_by, sort_dir);

    let response = AllDataResponse {
        success: true,
        shop_ids: shop_ids(&rows),
        stats: live_stats(&rows),
        last_sync: rows.iter().map(|row| row.datetime.clone()).max(),
        data: rows,
        from_cache: false,
        error: None,
    };
    drop(data);

    info!(%key, rows = response.data.len(), "all-data cache miss");
    let stored = state
        .cache
        .lock()
        .await
        .put_if_current(key, response.clone(), generation);
    if !stored {
        debug!("store changed while building all-data, not caching");
    }
    Json(response)
}

pub async fn get_top_products(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Json<TopProductsResponse> {
    let metric = analytics_metric(&query.metric);
    let data = state.data.lock().await;
    let rows = live_rows(&data, query.session_id.trim());
    Json(TopProductsResponse {
        success: true,
        metric: metric.to_string(),
        data: top_products(&rows, metric),
    })
}

pub async fn get_category_distribution(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Json<CategoryDistributionResponse> {
    let metric = analytics_metric(&query.metric);
    let data = state.data.lock().await;
    let rows = live_rows(&data, query.session_id.trim());
    Json(CategoryDistributionResponse {
        success: true,
        metric: metric.to_string(),
        data: category_distribution(&rows, &data.deals, metric),
    })
}

pub async fn import_rows(
    State(state): State<AppState>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let session_id = payload.session_id.trim().to_string();
    if session_id.is_empty() {
        return Err(AppError::bad_request("session_id is required"));
    }

    let scraped_at = local_stamp();
    let mut data = state.data.lock().await;
    let imported = apply_import(&mut data, &payload, &scraped_at);
    data.config.insert("last_sync".to_string(), scraped_at);
    persist_data(&state.data_path, &data).await?;
    let session_title = data
        .sessions
        .get(&session_id)
        .and_then(|record| record.session_title.clone());
    drop(data);

    state.cache.lock().await.invalidate();
    info!(%session_id, imported, "imported session rows");

    Ok(Json(ImportResponse {
        success: true,
        session_id,
        session_title,
        imported,
    }))
}

pub async fn archive_now(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ArchiveResponse>, AppError> {
    let response = run_archive(&state, query.session_id.trim()).await?;
    Ok(Json(response))
}

pub async fn cache_status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    let ttl = state.cache.lock().await.ttl().as_secs();
    let data = state.data.lock().await;
    let live_count: usize = data.sessions.values().map(|s| s.items.len()).sum();
    let snapshot_count: usize = data.history.values().map(Vec::len).sum();

    Json(CacheStatusResponse {
        gmv: CacheStatusEntry {
            count: live_count,
            last_update: data.config.get("last_sync").cloned(),
            ttl: Some(ttl),
        },
        archive: CacheStatusEntry {
            count: snapshot_count,
            last_update: data.config.get("last_archive").cloned(),
            ttl: None,
        },
    })
}

/// Non-archived sessions, most recently imported first.
fn active_sessions(data: &AppData) -> Vec<SessionSummary> {
    let mut sessions: Vec<SessionSummary> = data
        .sessions
        .iter()
        .filter(|(_, record)| !record.is_archived)
        .map(|(session_id, record)| SessionSummary {
            session_id: session_id.clone(),
            session_title: Some(crate::models::session_label(
                session_id,
                record.session_title.as_deref(),
            )),
            item_count: record.items.len(),
            last_scraped: Some(record.scraped_at.clone()),
        })
        .collect();
    sessions.sort_by(|a, b| b.last_scraped.cmp(&a.last_scraped));
    sessions
}

fn live_rows(data: &AppData, session_id: &str) -> Vec<ProductRow> {
    data.sessions
        .iter()
        .filter(|(id, _)| session_id.is_empty() || id.as_str() == session_id)
        .flat_map(|(_, record)| record.items.values())
        .map(|row| enrich(row, &data.deals))
        .collect()
}

fn sort_rows(rows: &mut [ProductRow], sort_by: &str, sort_dir: &str) {
    let column = |row: &ProductRow| match sort_by {
        "revenue" => row.revenue,
        "clicks" => row.clicks,
        "add_to_cart" => row.add_to_cart,
        "orders" => row.orders,
        "confirmed_revenue" => row.confirmed_revenue,
        "items_sold" => row.items_sold,
        _ => 0,
    };
    if sort_by.is_empty() {
        return;
    }
    if sort_dir == "asc" {
        rows.sort_by_key(column);
    } else {
        rows.sort_by_key(|row| std::cmp::Reverse(column(row)));
    }
}
