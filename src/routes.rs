use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    middleware as axum_mw,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json,
    },
    routing::get,
    Router,
};
use tokio_stream::{wrappers::IntervalStream, StreamExt};

use crate::export;
use crate::middleware::profiler_middleware;
use crate::ProfilerState;

/// How often the SSE feed pushes a fresh snapshot to the dashboard.
const STREAM_INTERVAL: Duration = Duration::from_secs(2);

/// Builds the profiler's own endpoints.
///
/// Mount this next to the application routes (or use [`attach`]):
///
///   GET /profiler/dashboard    HTML table of retained records
///   GET /profiler/metrics.csv  CSV download (attachment)
///   GET /profiler/clear        empties the store
///   GET /profiler/rows         records as JSON
///   GET /profiler/stream       SSE feed of records
pub fn profiler_router(state: ProfilerState) -> Router {
    Router::new()
        .route("/profiler/dashboard", get(dashboard))
        .route("/profiler/metrics.csv", get(metrics_csv))
        .route("/profiler/clear", get(clear))
        .route("/profiler/rows", get(rows))
        .route("/profiler/stream", get(rows_stream))
        .with_state(state)
}

/// Merges the profiler endpoints into `app` and layers the profiling
/// middleware over the combined router.
pub fn attach(app: Router, state: ProfilerState) -> Router {
    app.merge(profiler_router(state.clone()))
        .layer(axum_mw::from_fn_with_state(state, profiler_middleware))
}

// ─── GET /profiler/rows ──────────────────────────────────────────

async fn rows(State(state): State<ProfilerState>) -> impl IntoResponse {
    Json(export::export_rows(&state.store))
}

// ─── GET /profiler/metrics.csv ───────────────────────────────────

async fn metrics_csv(State(state): State<ProfilerState>) -> impl IntoResponse {
    let body = export::to_csv(&state.store);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=request_profile_metrics.csv",
            ),
        ],
        body,
    )
}

// ─── GET /profiler/clear ─────────────────────────────────────────

async fn clear(State(state): State<ProfilerState>) -> impl IntoResponse {
    export::clear(&state.store);
    Json(serde_json::json!({ "message": "Profiler data cleared." }))
}

// ─── GET /profiler/stream ────────────────────────────────────────

/// Server-Sent Events feed. Pushes the full row set as JSON on every tick
/// so the dashboard can refresh without polling.
async fn rows_stream(
    State(state): State<ProfilerState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(STREAM_INTERVAL);

    let stream = IntervalStream::new(interval).map(move |_| {
        let rows = export::export_rows(&state.store);
        let json = serde_json::to_string(&rows).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// ─── GET /profiler/dashboard ─────────────────────────────────────

async fn dashboard(State(state): State<ProfilerState>) -> Html<String> {
    let rows = export::export_rows(&state.store);

    let body = if rows.is_empty() {
        format!(
            "<p class=\"empty\">No profiling data collected yet. Make some requests with \
             <code>?{}=true</code> or set <code>{}=true</code>.</p>",
            html_escape(&state.config.profile_query_param),
            crate::config::ENV_SWITCH,
        )
    } else {
        let mut table = String::from(
            "<table><thead><tr>\
             <th>Timestamp</th><th>RequestPath</th><th>HTTPMethod</th>\
             <th>StatusCode</th><th>TotalTimeMs</th><th>CPUTimeMs</th>\
             </tr></thead><tbody>",
        );
        for row in &rows {
            table.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.timestamp_text(),
                html_escape(&row.request_path),
                html_escape(&row.http_method),
                row.status_code,
                row.total_time_ms,
                row.cpu_time_ms,
            ));
        }
        table.push_str("</tbody></table>");
        table
    };

    Html(format!(
        "<!DOCTYPE html>\
         <html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>Request Profiler Dashboard</title>\
         <style>\
         body {{ font-family: sans-serif; margin: 2rem; color: #1f2937; }}\
         table {{ border-collapse: collapse; margin-top: 1rem; }}\
         th, td {{ border: 1px solid #d1d5db; padding: 0.4rem 0.8rem; text-align: left; }}\
         th {{ background: #f3f4f6; }}\
         tr:nth-child(even) {{ background: #f9fafb; }}\
         .empty {{ color: #6b7280; }}\
         .actions a {{ margin-right: 1rem; }}\
         </style></head><body>\
         <h1>Request Profiler Dashboard</h1>\
         {body}\
         <p class=\"actions\">\
         <a href=\"/profiler/clear\">Clear data</a>\
         <a href=\"/profiler/metrics.csv\">Export CSV</a>\
         </p>\
         </body></html>"
    ))
}

/// Paths come from the network; keep them inert in the markup.
fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            html_escape("/a<script>&b"),
            "/a&lt;script&gt;&amp;b"
        );
        assert_eq!(html_escape("/plain"), "/plain");
    }
}
