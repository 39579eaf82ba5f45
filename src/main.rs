use std::time::Duration;

use axum::{extract::Path, routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use request_profiler::{routes, ProfilerConfig, ProfilerState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,request_profiler=debug".into()),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   ⏱   REQUEST PROFILER DEMO                      ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Build profiler state ──────────────────────────────────
    let config = ProfilerConfig::from_env().max_retained_requests(500);
    let state = ProfilerState::new(config).expect("profiler configuration");

    // Start from a clean slate on every boot.
    state.store.clear();

    // ── 2. Build the demo router with the profiler attached ─────
    let app = Router::new()
        .route("/", get(read_root))
        .route("/items/:item_id", get(read_item))
        .route("/cpu-intensive", get(cpu_intensive))
        .route("/slow-endpoint", get(slow_endpoint));

    let app = routes::attach(app, state).layer(CorsLayer::permissive());

    // ── 3. Bind & serve ──────────────────────────────────────────
    let addr = "0.0.0.0:8000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to port 8000 — is it already in use?");

    info!("server listening on http://localhost:8000");
    info!("dashboard   → http://localhost:8000/profiler/dashboard");
    info!("csv export  → http://localhost:8000/profiler/metrics.csv");
    info!("try         → curl 'http://localhost:8000/?profile=true'");

    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}

// ─── Demo endpoints ──────────────────────────────────────────────

/// Small async I/O delay — shows wall time with near-zero CPU time.
async fn read_root() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    Json(serde_json::json!({ "message": "Hello World" }))
}

/// Even ids simulate longer I/O; odd ids burn CPU on a blocking thread.
async fn read_item(Path(item_id): Path<u64>) -> Json<serde_json::Value> {
    if item_id % 2 == 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    } else {
        tokio::task::spawn_blocking(|| burn_cpu(5_000_000))
            .await
            .expect("CPU task panicked");
    }
    Json(serde_json::json!({ "item_id": item_id, "message": "Item processed" }))
}

/// Heavy synchronous computation — shows CPUTimeMs tracking TotalTimeMs.
async fn cpu_intensive() -> Json<serde_json::Value> {
    let result = tokio::task::spawn_blocking(|| burn_cpu(20_000_000))
        .await
        .expect("CPU task panicked");
    Json(serde_json::json!({
        "message": "CPU intensive task completed",
        "result_dummy": result % 100,
    }))
}

/// Long async delay — large TotalTimeMs, negligible CPUTimeMs.
async fn slow_endpoint() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(serde_json::json!({ "message": "This was a slow request!" }))
}

fn burn_cpu(iterations: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = acc.wrapping_add(std::hint::black_box(i).wrapping_mul(i % 50));
    }
    acc
}
