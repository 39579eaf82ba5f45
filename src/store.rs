use std::collections::VecDeque;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};

use crate::error::{ProfilerError, Result};

/// Render used for export and the dashboard: `YYYY-MM-DD HH:MM:SS`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Record ──────────────────────────────────────────────────────

/// A single profiled request. Immutable once constructed.
///
/// Serializes with the same field names the CSV export uses, so JSON and
/// SSE consumers see identical column labels.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
    pub request_path: String,
    #[serde(rename = "HTTPMethod")]
    pub http_method: String,
    pub status_code: u16,
    pub total_time_ms: f64,
    #[serde(rename = "CPUTimeMs")]
    pub cpu_time_ms: f64,
}

impl MetricRecord {
    /// Second-resolution timestamp text, local time.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<Local>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
}

// ─── Store ───────────────────────────────────────────────────────

/// Bounded, insertion-ordered retention of profiled requests.
///
/// The middleware calls `insert()`, the exporter and dashboard call
/// `snapshot()` / `clear()`. One mutex serializes every mutation, so no
/// reader ever observes more than `max_retained` records and racing
/// inserts cannot skip an eviction.
pub struct MetricsStore {
    max_retained: usize,
    records: Mutex<VecDeque<MetricRecord>>,
}

impl MetricsStore {
    /// Builds a store retaining at most `max_retained` records.
    /// A zero bound is a configuration error.
    pub fn new(max_retained: usize) -> Result<Self> {
        if max_retained == 0 {
            return Err(ProfilerError::config(
                "max_retained_requests must be at least 1",
            ));
        }
        // Pre-size small bounds; large ones grow on demand.
        let cap = max_retained.saturating_add(1).min(1024);
        Ok(Self {
            max_retained,
            records: Mutex::new(VecDeque::with_capacity(cap)),
        })
    }

    /// Appends one record, evicting oldest-first until the bound holds.
    /// Append and eviction happen under a single lock acquisition.
    pub fn insert(&self, record: MetricRecord) {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.max_retained {
            records.pop_front();
        }
    }

    /// Point-in-time copy of the retained records, oldest first.
    pub fn snapshot(&self) -> Vec<MetricRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Drops every retained record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Current record count.
    pub fn size(&self) -> usize {
        self.records.lock().len()
    }

    /// The configured retention bound.
    pub fn max_retained(&self) -> usize {
        self.max_retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(path: &str) -> MetricRecord {
        MetricRecord {
            timestamp: Local::now(),
            request_path: path.into(),
            http_method: "GET".into(),
            status_code: 200,
            total_time_ms: 1.25,
            cpu_time_ms: 0.5,
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            MetricsStore::new(0),
            Err(ProfilerError::Config(_))
        ));
    }

    #[test]
    fn retains_the_newest_records_in_order() {
        let store = MetricsStore::new(3).unwrap();
        for path in ["/a", "/b", "/c", "/d"] {
            store.insert(record(path));
        }

        let paths: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|r| r.request_path)
            .collect();
        assert_eq!(paths, ["/b", "/c", "/d"]);
        assert_eq!(store.size(), 3);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = MetricsStore::new(5).unwrap();
        store.insert(record("/a"));
        store.insert(record("/b"));
        store.clear();
        assert_eq!(store.size(), 0);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn size_never_exceeds_the_bound_under_contention() {
        let store = Arc::new(MetricsStore::new(10).unwrap());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    store.insert(record(&format!("/w{worker}/{i}")));
                    // Interleave readers with writers.
                    assert!(store.snapshot().len() <= 10);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.size(), 10);
    }

    #[test]
    fn record_serializes_with_export_column_names() {
        let json = serde_json::to_value(record("/a")).unwrap();
        for key in [
            "Timestamp",
            "RequestPath",
            "HTTPMethod",
            "StatusCode",
            "TotalTimeMs",
            "CPUTimeMs",
        ] {
            assert!(json.get(key).is_some(), "missing column {key}");
        }
    }
}
