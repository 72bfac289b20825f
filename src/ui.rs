use crate::models::{LiveStats, ProductRow, SessionSummary};
use crate::util::{escape_html, format_currency};

const TABLE_ROW_LIMIT: usize = 200;

pub struct DashboardPage<'a> {
    pub sessions: &'a [SessionSummary],
    pub selected: Option<&'a str>,
    pub rows: &'a [ProductRow],
    pub stats: &'a LiveStats,
}

pub fn render_dashboard(page: &DashboardPage<'_>) -> String {
    let selected_label = page
        .sessions
        .iter()
        .find(|s| Some(s.session_id.as_str()) == page.selected)
        .map(SessionSummary::label)
        .unwrap_or_default();

    let values = [
        ("SESSION_OPTIONS", session_options(page.sessions, page.selected)),
        ("SESSION_TITLE", escape_html(&selected_label)),
        ("TOTAL_GMV", format_currency(page.stats.total_revenue as f64)),
        (
            "TOTAL_NMV",
            format_currency(page.stats.total_confirmed_revenue as f64),
        ),
        ("GAP", format_currency(page.stats.gap() as f64)),
        ("COUNT", page.stats.total_products.to_string()),
        ("TABLE", product_table(page.rows)),
    ];
    fill_template(INDEX_HTML, &values)
}

/// Replaces each `{{NAME}}` in one pass, so substituted text is never rescanned.
/// Unknown placeholders are left as they are.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 4096);
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn session_options(sessions: &[SessionSummary], selected: Option<&str>) -> String {
    sessions
        .iter()
        .map(|session| {
            let marker = if Some(session.session_id.as_str()) == selected {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{marker}>{}</option>"#,
                escape_html(&session.session_id),
                escape_html(&session.label())
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ")
}

fn product_table(rows: &[ProductRow]) -> String {
    if rows.is_empty() {
        return r#"<p class="empty">No products for this session yet.</p>"#.to_string();
    }

    let body: String = rows
        .iter()
        .take(TABLE_ROW_LIMIT)
        .enumerate()
        .map(|(idx, row)| {
            let name = escape_html(&row.item_name);
            let name_cell = match row.link_sp.as_deref().filter(|link| !link.is_empty()) {
                Some(link) => format!(
                    r#"<a href="{}" target="_blank" rel="noopener">{name}</a>"#,
                    escape_html(link)
                ),
                None => name,
            };
            format!(
                "<tr><td>{}</td><td>{name_cell}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                idx + 1,
                format_currency(row.revenue as f64),
                format_currency(row.confirmed_revenue as f64),
                row.clicks,
                row.add_to_cart,
                row.orders,
            )
        })
        .collect();

    format!(
        "<table><thead><tr><th>#</th><th>Product</th><th>GMV</th><th>NMV</th><th>Clicks</th><th>Add to cart</th><th>Orders</th></tr></thead><tbody>{body}</tbody></table>"
    )
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="vi">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>GMV Dashboard</title>
  <style>
    :root {
      --bg: #f4f6fb;
      --ink: #1f2430;
      --accent: #ee4d2d;
      --card: #ffffff;
      --muted: #6b7280;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
      display: flex;
    }

    #sidebar {
      width: 220px;
      min-height: 100vh;
      background: #1f2430;
      color: #fff;
      padding: 24px 16px;
    }

    #sidebar.collapsed {
      width: 64px;
    }

    #mainContent {
      flex: 1;
      padding: 28px;
      display: grid;
      gap: 20px;
    }

    .filters {
      display: flex;
      gap: 12px;
      align-items: center;
      flex-wrap: wrap;
    }

    #sessionInfoBadge {
      background: rgba(238, 77, 45, 0.1);
      color: var(--accent);
      border-radius: 999px;
      padding: 4px 12px;
    }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .card {
      background: var(--card);
      border-radius: 14px;
      padding: 16px;
    }

    .card .label {
      color: var(--muted);
      font-size: 0.85rem;
    }

    .card .value {
      font-size: 1.5rem;
      font-weight: 600;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      background: var(--card);
    }

    th, td {
      padding: 8px 10px;
      border-bottom: 1px solid #eceff5;
      text-align: left;
    }

    #toast {
      position: fixed;
      bottom: 24px;
      right: 24px;
      background: #1f2430;
      color: #fff;
      padding: 10px 16px;
      border-radius: 10px;
      display: none;
    }

    #toast.show {
      display: block;
    }

    #copyModal {
      position: fixed;
      inset: 0;
      background: rgba(0, 0, 0, 0.4);
      display: none;
      place-items: center;
    }

    #copyModal.show {
      display: grid;
    }
  </style>
</head>
<body>
  <nav id="sidebar">
    <h2>GMV</h2>
    <p><a href="/" style="color:#fff">Dashboard</a></p>
  </nav>
  <main id="mainContent">
    <section class="filters">
      <form method="get" action="/">
        <select id="sessionFilter" name="session_id" onchange="this.form.submit()">
          {{SESSION_OPTIONS}}
        </select>
      </form>
      <select id="historySlotFilter">
        <option value="">Live now</option>
      </select>
      <span id="sessionInfoBadge">Session: <strong id="currentSessionTitle">{{SESSION_TITLE}}</strong></span>
    </section>

    <section class="cards">
      <div class="card"><span class="label">GMV</span><div class="value" id="totalRevenue">{{TOTAL_GMV}}</div></div>
      <div class="card"><span class="label">NMV</span><div class="value" id="totalConfirmedRevenue">{{TOTAL_NMV}}</div></div>
      <div class="card"><span class="label">Gap</span><div class="value" id="gapRevenue">{{GAP}}</div></div>
      <div class="card"><span class="label">Products</span><div class="value" id="currentProductCount">{{COUNT}}</div></div>
    </section>

    <section id="tableWrapper">
      {{TABLE}}
    </section>
  </main>

  <div id="toast"><span id="toastMessage"></span></div>
  <div id="copyModal">
    <div class="card">
      <p>Copy the link below:</p>
      <input id="copyModalInput" type="text" readonly />
    </div>
  </div>
</body>
</html>
"#;
