//! Pure formatting helpers shared by the rendered page and the sync layer.

/// Compact VND amount: `"2.5M đ"`, `"3.2B đ"`, `"2K đ"`, `"950 đ"`.
pub fn format_currency(value: f64) -> String {
    if value == 0.0 || value.is_nan() {
        return "0đ".to_string();
    }

    if value >= 1e9 {
        format!("{}B đ", to_fixed(value / 1e9, 1))
    } else if value >= 1e6 {
        format!("{}M đ", to_fixed(value / 1e6, 1))
    } else if value >= 1e3 {
        format!("{}K đ", to_fixed(value / 1e3, 0))
    } else {
        format!("{} đ", group_thousands(value.round() as i64))
    }
}

/// Escapes `&`, `<`, `>` and `"`. `&` goes first so produced entities stay intact.
pub fn escape_html(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Rounds half away from zero before printing, so 1.5 -> "2".
fn to_fixed(value: f64, digits: usize) -> String {
    let factor = 10f64.powi(digits as i32);
    let rounded = (value * factor).round() / factor;
    format!("{rounded:.digits$}")
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
