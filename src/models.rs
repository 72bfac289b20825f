use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line item of a session's dataset.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProductRow {
    pub item_id: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub link_sp: Option<String>,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub ctr: String,
    #[serde(default)]
    pub orders: i64,
    #[serde(default)]
    pub items_sold: i64,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub add_to_cart: i64,
    #[serde(default)]
    pub confirmed_revenue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionRecord {
    #[serde(default)]
    pub session_title: Option<String>,
    pub scraped_at: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub items: BTreeMap<String, ProductRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Snapshot {
    pub archived_at: String,
    #[serde(default)]
    pub session_title: Option<String>,
    #[serde(default)]
    pub items: Vec<ProductRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DealEntry {
    pub item_id: String,
    pub shop_id: String,
    #[serde(default)]
    pub cluster: Option<String>,
}

/// Everything the server persists, written as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionRecord>,
    #[serde(default)]
    pub history: BTreeMap<String, Vec<Snapshot>>,
    #[serde(default)]
    pub deals: BTreeMap<String, DealEntry>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub session_title: Option<String>,
    #[serde(default)]
    pub item_count: usize,
    #[serde(default)]
    pub last_scraped: Option<String>,
}

impl SessionSummary {
    pub fn label(&self) -> String {
        session_label(&self.session_id, self.session_title.as_deref())
    }
}

/// Display label for a session, falling back to `Session {id}` when untitled.
pub fn session_label(session_id: &str, title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => format!("Session {session_id}"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedSessionSummary {
    pub session_id: String,
    pub session_title: Option<String>,
    pub item_count: usize,
    pub timeslot_count: usize,
    pub last_archived: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeslot {
    pub archived_at: String,
    #[serde(default)]
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct HistoryStats {
    pub total_gmv: i64,
    pub total_nmv: i64,
    pub gap: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct LiveStats {
    #[serde(default)]
    pub total_products: usize,
    #[serde(default)]
    pub total_revenue: i64,
    #[serde(default)]
    pub total_clicks: i64,
    #[serde(default)]
    pub total_orders: i64,
    #[serde(default)]
    pub total_items_sold: i64,
    #[serde(default)]
    pub total_confirmed_revenue: i64,
    #[serde(default)]
    pub with_link: usize,
}

impl LiveStats {
    pub fn gap(&self) -> i64 {
        self.total_revenue.saturating_sub(self.total_confirmed_revenue)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopProduct {
    pub name: String,
    pub revenue: i64,
    pub clicks: i64,
    pub add_to_cart: i64,
    pub orders: i64,
}

/// Totals for one product cluster.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CategoryShare {
    pub cluster: String,
    pub revenue: i64,
    pub clicks: i64,
    pub add_to_cart: i64,
    pub orders: i64,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub success: bool,
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchivedSessionsResponse {
    pub success: bool,
    pub sessions: Vec<ArchivedSessionSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeslotsResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub timeslots: Vec<Timeslot>,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryDataResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub archived_at: String,
    #[serde(default)]
    pub data: Vec<ProductRow>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub stats: HistoryStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllDataResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<ProductRow>,
    #[serde(default)]
    pub shop_ids: Vec<String>,
    #[serde(default)]
    pub stats: LiveStats,
    #[serde(default)]
    pub last_sync: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryDataQuery {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub archived_at: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AllDataQuery {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub sort_dir: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopProductsResponse {
    pub success: bool,
    pub metric: String,
    pub data: Vec<TopProduct>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryDistributionResponse {
    pub success: bool,
    pub metric: String,
    pub data: Vec<CategoryShare>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    pub session_id: String,
    #[serde(default)]
    pub session_title: Option<String>,
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub deals: Vec<DealEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub session_id: String,
    pub session_title: Option<String>,
    pub imported: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveResponse {
    pub success: bool,
    pub archived_at: String,
    pub archived: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatusEntry {
    pub count: usize,
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatusResponse {
    pub gmv: CacheStatusEntry,
    pub archive: CacheStatusEntry,
}
