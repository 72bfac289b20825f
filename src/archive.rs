//! Timeslot snapshots: copying live session rows into history, and reading them back.

use crate::errors::AppError;
use crate::import::enrich;
use crate::models::{
    AppData, ArchiveResponse, ArchivedSessionSummary, ProductRow, Snapshot, Timeslot,
};
use crate::state::AppState;
use crate::storage::persist_data;
use chrono::{FixedOffset, NaiveDateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// Asia/Ho_Chi_Minh, no DST.
const LOCAL_OFFSET_SECS: i32 = 7 * 3600;

/// Wall-clock time in the dashboard's timezone.
pub fn local_now() -> NaiveDateTime {
    let now = Utc::now();
    match FixedOffset::east_opt(LOCAL_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => now.naive_utc(),
    }
}

pub fn local_stamp() -> String {
    local_now().format(STAMP_FORMAT).to_string()
}

/// Copies a session's live rows into a snapshot stamped `archived_at`.
/// Live rows stay in place. An existing snapshot with the same stamp is replaced.
pub fn archive_session(data: &mut AppData, session_id: &str, archived_at: &str) -> usize {
    let Some(record) = data.sessions.get(session_id) else {
        return 0;
    };
    if record.items.is_empty() {
        return 0;
    }

    let items: Vec<ProductRow> = record
        .items
        .values()
        .map(|row| enrich(row, &data.deals))
        .collect();
    let count = items.len();
    let snapshot = Snapshot {
        archived_at: archived_at.to_string(),
        session_title: record.session_title.clone(),
        items,
    };

    let slots = data.history.entry(session_id.to_string()).or_default();
    match slots.iter_mut().find(|slot| slot.archived_at == archived_at) {
        Some(existing) => *existing = snapshot,
        None => slots.push(snapshot),
    }
    count
}

/// Archives every non-archived session. Returns the total row count written.
pub fn archive_all(data: &mut AppData, archived_at: &str) -> usize {
    let active: Vec<String> = data
        .sessions
        .iter()
        .filter(|(_, record)| !record.is_archived)
        .map(|(id, _)| id.clone())
        .collect();
    active
        .iter()
        .map(|id| archive_session(data, id, archived_at))
        .sum()
}

/// Timeslots for a session, newest first.
pub fn timeslots(data: &AppData, session_id: &str) -> Vec<Timeslot> {
    let mut slots: Vec<Timeslot> = data
        .history
        .get(session_id)
        .map(|snapshots| {
            snapshots
                .iter()
                .map(|snapshot| Timeslot {
                    archived_at: snapshot.archived_at.clone(),
                    item_count: snapshot.items.len(),
                })
                .collect()
        })
        .unwrap_or_default();
    slots.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
    slots
}

/// Rows of one snapshot, highest revenue first, re-enriched with the current deal mapping.
pub fn snapshot_rows(data: &AppData, session_id: &str, archived_at: &str) -> Vec<ProductRow> {
    let mut rows: Vec<ProductRow> = data
        .history
        .get(session_id)
        .and_then(|snapshots| snapshots.iter().find(|s| s.archived_at == archived_at))
        .map(|snapshot| {
            snapshot
                .items
                .iter()
                .map(|row| enrich(row, &data.deals))
                .collect()
        })
        .unwrap_or_default();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows
}

/// Sessions with at least one snapshot, most recently archived first.
pub fn archived_sessions(data: &AppData) -> Vec<ArchivedSessionSummary> {
    let mut sessions: Vec<ArchivedSessionSummary> = data
        .history
        .iter()
        .filter(|(_, snapshots)| !snapshots.is_empty())
        .map(|(session_id, snapshots)| {
            let mut items: Vec<&str> = snapshots
                .iter()
                .flat_map(|s| s.items.iter().map(|row| row.item_id.as_str()))
                .collect();
            items.sort_unstable();
            items.dedup();
            let latest = snapshots.iter().max_by(|a, b| a.archived_at.cmp(&b.archived_at));
            ArchivedSessionSummary {
                session_id: session_id.clone(),
                session_title: latest.and_then(|s| s.session_title.clone()),
                item_count: items.len(),
                timeslot_count: snapshots.len(),
                last_archived: latest.map(|s| s.archived_at.clone()),
            }
        })
        .collect();
    sessions.sort_by(|a, b| b.last_archived.cmp(&a.last_archived));
    sessions
}

/// Archives one session (or all active ones when `session_id` is empty) and persists.
pub async fn run_archive(state: &AppState, session_id: &str) -> Result<ArchiveResponse, AppError> {
    let archived_at = local_stamp();
    let mut data = state.data.lock().await;
    let archived = if session_id.is_empty() {
        archive_all(&mut data, &archived_at)
    } else {
        archive_session(&mut data, session_id, &archived_at)
    };
    data.config
        .insert("last_archive".to_string(), archived_at.clone());
    persist_data(&state.data_path, &data).await?;

    info!(archived, %archived_at, "archived session data");
    Ok(ArchiveResponse {
        success: true,
        archived_at,
        archived,
    })
}

pub fn spawn_archive_job(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately; skip it so boot does not archive.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = run_archive(&state, "").await {
                error!("archive job failed: {}", err.message);
            }
        }
    })
}
