use crate::store::{MetricRecord, MetricsStore};

/// Fixed CSV column order, shared with the JSON field names.
pub const CSV_HEADER: &str = "Timestamp,RequestPath,HTTPMethod,StatusCode,TotalTimeMs,CPUTimeMs";

/// All retained rows, oldest first.
pub fn export_rows(store: &MetricsStore) -> Vec<MetricRecord> {
    store.snapshot()
}

/// Renders the retained rows as CSV text.
///
/// The header line is always present, even for an empty store. Timestamps
/// are `YYYY-MM-DD HH:MM:SS`; times are decimal milliseconds. Fields that
/// contain separators are quoted.
pub fn to_csv(store: &MetricsStore) -> String {
    let rows = store.snapshot();
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + rows.len() * 80);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for row in rows {
        out.push_str(&csv_field(&row.timestamp_text()));
        out.push(',');
        out.push_str(&csv_field(&row.request_path));
        out.push(',');
        out.push_str(&csv_field(&row.http_method));
        out.push(',');
        out.push_str(&format!(
            "{},{},{}\n",
            row.status_code, row.total_time_ms, row.cpu_time_ms
        ));
    }
    out
}

/// Delegates to the store; kept here so the HTTP surface only talks to
/// the export layer.
pub fn clear(store: &MetricsStore) {
    store.clear();
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_owned()
    }
}
