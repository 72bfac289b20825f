//! Turns spreadsheet rows into stored product rows for one session.

use crate::models::{AppData, DealEntry, ImportRequest, ProductRow, SessionRecord};
use std::collections::BTreeMap;

const MIN_COLUMNS: usize = 8;

/// Shortens a sheet name to a session title.
///
/// `"[16.01] Internal | Vu Ngoc Anh x Phat La"` becomes `"[16.01] Vu Ngoc Anh x Phat La"`.
/// Names without a bracketed date or a `|` separator are returned as-is.
pub fn parse_sheet_title(sheet_name: &str) -> String {
    let date_part = bracketed_date(sheet_name);

    let kol_part = if let Some((_, tail)) = sheet_name.rsplit_once('|') {
        tail.trim()
    } else if date_part.is_some() {
        let end = sheet_name.find(']').map_or(0, |idx| idx + 1);
        sheet_name[end..].trim()
    } else {
        sheet_name
    };

    match (date_part, kol_part.is_empty()) {
        (Some(date), false) => format!("{date} {kol_part}"),
        (Some(date), true) => date.to_string(),
        (None, false) => kol_part.to_string(),
        (None, true) => sheet_name.to_string(),
    }
}

// First `[...]` group made only of digits and dots, brackets included.
fn bracketed_date(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(open) = text[search_from..].find('[') {
        let start = search_from + open;
        let Some(close) = text[start..].find(']') else {
            return None;
        };
        let end = start + close;
        let inner = &text[start + 1..end];
        if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Some(&text[start..=end]);
        }
        search_from = start + 1;
    }
    None
}

/// Spreadsheet integer cell: thousands separators stripped, anything unparseable is 0.
pub fn safe_int(cell: &str) -> i64 {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '.')
        .collect();
    cleaned.parse().unwrap_or(0)
}

pub fn parse_row(cells: &[String]) -> Option<ProductRow> {
    if cells.len() < MIN_COLUMNS {
        return None;
    }
    let item_id = cells[1].trim();
    if item_id.is_empty() {
        return None;
    }

    let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("");

    Some(ProductRow {
        item_id: item_id.to_string(),
        item_name: cell(2).to_string(),
        datetime: cell(0).to_string(),
        clicks: safe_int(cell(3)),
        ctr: cell(4).to_string(),
        orders: safe_int(cell(5)),
        items_sold: safe_int(cell(6)),
        revenue: safe_int(cell(7)),
        add_to_cart: safe_int(cell(9)),
        confirmed_revenue: safe_int(cell(10)),
        ..Default::default()
    })
}

/// Fills `shop_id`, `cluster` and `link_sp` from the deal mapping.
pub fn enrich(row: &ProductRow, deals: &BTreeMap<String, DealEntry>) -> ProductRow {
    let mut out = row.clone();
    if let Some(deal) = deals.get(&row.item_id) {
        if !deal.shop_id.is_empty() {
            out.shop_id = Some(deal.shop_id.clone());
        }
        if deal.cluster.is_some() {
            out.cluster = deal.cluster.clone();
        }
    }
    if let Some(shop_id) = out.shop_id.as_deref().filter(|id| !id.is_empty()) {
        out.link_sp = Some(format!("https://shopee.vn/a-i.{shop_id}.{}", out.item_id));
    }
    out
}

/// Upserts the request's rows into its session. Other sessions are left alone.
/// Returns the number of rows written.
pub fn apply_import(data: &mut AppData, request: &ImportRequest, scraped_at: &str) -> usize {
    for deal in &request.deals {
        data.deals.insert(deal.item_id.clone(), deal.clone());
    }

    let title = request
        .session_title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .or_else(|| request.sheet_name.as_deref().map(parse_sheet_title));

    let record = data
        .sessions
        .entry(request.session_id.clone())
        .or_insert_with(|| SessionRecord {
            scraped_at: scraped_at.to_string(),
            ..Default::default()
        });
    if title.is_some() {
        record.session_title = title;
    }
    record.scraped_at = scraped_at.to_string();
    record.is_archived = false;

    let mut imported = 0;
    for row in request.rows.iter().filter_map(|cells| parse_row(cells)) {
        record.items.insert(row.item_id.clone(), row);
        imported += 1;
    }
    imported
}
