use crate::models::{CategoryShare, DealEntry, HistoryStats, LiveStats, ProductRow, TopProduct};
use std::collections::BTreeMap;

pub const ANALYTICS_METRICS: [&str; 4] = ["revenue", "clicks", "add_to_cart", "orders"];
pub const TOP_PRODUCTS_LIMIT: usize = 10;
pub const UNKNOWN_CLUSTER: &str = "Không xác định";

pub fn history_stats(rows: &[ProductRow]) -> HistoryStats {
    let (total_gmv, total_nmv) = rows.iter().fold((0i64, 0i64), |(gmv, nmv), row| {
        (
            gmv.saturating_add(row.revenue),
            nmv.saturating_add(row.confirmed_revenue),
        )
    });
    HistoryStats {
        total_gmv,
        total_nmv,
        gap: total_gmv.saturating_sub(total_nmv),
    }
}

/// Unknown metrics fall back to `revenue`.
pub fn analytics_metric(requested: &str) -> &'static str {
    ANALYTICS_METRICS
        .iter()
        .copied()
        .find(|metric| *metric == requested.trim())
        .unwrap_or("revenue")
}

fn metric_value(row: &ProductRow, metric: &str) -> i64 {
    match metric {
        "clicks" => row.clicks,
        "add_to_cart" => row.add_to_cart,
        "orders" => row.orders,
        _ => row.revenue,
    }
}

/// The [`TOP_PRODUCTS_LIMIT`] rows with the highest `metric`.
pub fn top_products(rows: &[ProductRow], metric: &str) -> Vec<TopProduct> {
    let mut ranked: Vec<&ProductRow> = rows.iter().collect();
    ranked.sort_by_key(|row| std::cmp::Reverse(metric_value(row, metric)));
    ranked
        .into_iter()
        .take(TOP_PRODUCTS_LIMIT)
        .map(|row| TopProduct {
            name: row.item_name.clone(),
            revenue: row.revenue,
            clicks: row.clicks,
            add_to_cart: row.add_to_cart,
            orders: row.orders,
        })
        .collect()
}

/// Per-cluster totals, largest `metric` first.
///
/// A row's cluster comes from its deal entry, then from the row itself, then
/// [`UNKNOWN_CLUSTER`].
pub fn category_distribution(
    rows: &[ProductRow],
    deals: &BTreeMap<String, DealEntry>,
    metric: &str,
) -> Vec<CategoryShare> {
    let mut groups: BTreeMap<String, CategoryShare> = BTreeMap::new();
    for row in rows {
        let cluster = deals
            .get(&row.item_id)
            .and_then(|deal| deal.cluster.clone())
            .or_else(|| row.cluster.clone())
            .filter(|cluster| !cluster.is_empty())
            .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string());
        let share = groups.entry(cluster.clone()).or_insert_with(|| CategoryShare {
            cluster,
            ..Default::default()
        });
        share.revenue = share.revenue.saturating_add(row.revenue);
        share.clicks = share.clicks.saturating_add(row.clicks);
        share.add_to_cart = share.add_to_cart.saturating_add(row.add_to_cart);
        share.orders = share.orders.saturating_add(row.orders);
        share.count += 1;
    }

    let mut shares: Vec<CategoryShare> = groups.into_values().collect();
    shares.sort_by_key(|share| {
        std::cmp::Reverse(match metric {
            "clicks" => share.clicks,
            "add_to_cart" => share.add_to_cart,
            "orders" => share.orders,
            _ => share.revenue,
        })
    });
    shares
}

pub fn live_stats(rows: &[ProductRow]) -> LiveStats {
    let mut stats = LiveStats {
        total_products: rows.len(),
        ..LiveStats::default()
    };

    for row in rows {
        stats.total_revenue = stats.total_revenue.saturating_add(row.revenue);
        stats.total_clicks = stats.total_clicks.saturating_add(row.clicks);
        stats.total_orders = stats.total_orders.saturating_add(row.orders);
        stats.total_items_sold = stats.total_items_sold.saturating_add(row.items_sold);
        stats.total_confirmed_revenue = stats
            .total_confirmed_revenue
            .saturating_add(row.confirmed_revenue);
        if row.link_sp.as_deref().is_some_and(|link| !link.is_empty()) {
            stats.with_link += 1;
        }
    }

    stats
}

/// Distinct, sorted, non-empty shop ids.
pub fn shop_ids(rows: &[ProductRow]) -> Vec<String> {
    let mut ids: Vec<String> = rows
        .iter()
        .filter_map(|row| row.shop_id.clone())
        .filter(|id| !id.is_empty())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
