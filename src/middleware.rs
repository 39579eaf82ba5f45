use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Local;
use futures::FutureExt;
use tracing::debug;

use crate::decision::should_profile;
use crate::store::MetricRecord;
use crate::timing::TimingHandle;
use crate::ProfilerState;

/// Status recorded when the downstream handler panics before producing
/// a response.
const STATUS_PANICKED: u16 = 500;

/// Status recorded when the request future is dropped mid-flight
/// (client disconnect, timeout).
const STATUS_CANCELLED: u16 = 499;

/// Profiles a request around the downstream handler.
///
/// Unprofiled requests pass straight through: no timing window, no record,
/// no store access. Profiled requests are measured whether the handler
/// completes, panics, or is cancelled; exactly one record is inserted and
/// the downstream outcome is never altered.
pub async fn profiler_middleware(
    State(state): State<ProfilerState>,
    req: Request,
    next: Next,
) -> Response {
    let query = parse_query(req.uri().query());
    if !should_profile(&state.config, &query) {
        return next.run(req).await;
    }

    let method = req.method().as_str().to_uppercase();
    // Prefer the route template so path cardinality stays bounded across
    // records with the same shape.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let handle = state.timing.start();
    let mut guard = RecordGuard::open(state, method, path, handle);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            guard.complete(response.status().as_u16());
            response
        }
        Err(panic) => {
            guard.complete(STATUS_PANICKED);
            std::panic::resume_unwind(panic);
        }
    }
}

// ─── Record guard ────────────────────────────────────────────────

/// Closes the timing window and inserts exactly one record, even when the
/// request future is dropped before the handler finishes.
struct RecordGuard {
    state: ProfilerState,
    method: String,
    path: String,
    handle: TimingHandle,
    done: bool,
}

impl RecordGuard {
    fn open(state: ProfilerState, method: String, path: String, handle: TimingHandle) -> Self {
        Self {
            state,
            method,
            path,
            handle,
            done: false,
        }
    }

    fn complete(&mut self, status_code: u16) {
        self.done = true;
        self.record(status_code);
    }

    fn record(&self, status_code: u16) {
        let (total_ms, cpu_ms) = self.state.timing.stop(self.handle);
        let record = MetricRecord {
            timestamp: Local::now(),
            request_path: self.path.clone(),
            http_method: self.method.clone(),
            status_code,
            total_time_ms: round_ms(total_ms),
            cpu_time_ms: round_ms(cpu_ms),
        };
        debug!(
            path = %record.request_path,
            method = %record.http_method,
            status = status_code,
            total_ms = record.total_time_ms,
            cpu_ms = record.cpu_time_ms,
            "request profiled"
        );
        self.state.store.insert(record);
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        if !self.done {
            self.record(STATUS_CANCELLED);
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Millisecond values carry three decimal places.
fn round_ms(ms: f64) -> f64 {
    (ms * 1000.0).round() / 1000.0
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    match query {
        Some(q) => url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parsing_handles_absent_and_encoded_input() {
        assert!(parse_query(None).is_empty());

        let q = parse_query(Some("profile=true&name=a%20b"));
        assert_eq!(q.get("profile").map(String::as_str), Some("true"));
        assert_eq!(q.get("name").map(String::as_str), Some("a b"));

        // A bare key parses to an empty value.
        let q = parse_query(Some("profile"));
        assert_eq!(q.get("profile").map(String::as_str), Some(""));
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        assert_eq!(round_ms(1.23456), 1.235);
        assert_eq!(round_ms(0.0), 0.0);
        assert_eq!(round_ms(10.0004), 10.0);
    }
}
