//! Request-profiling middleware for axum applications.
//!
//! Measures wall-clock and CPU time per HTTP request, conditionally
//! activated by a query flag, a construction-time default, or the
//! `REQUEST_PROFILER_ENABLED` environment switch. Records live in a
//! bounded in-memory store (oldest evicted first) and are served back as
//! an HTML dashboard, JSON rows, an SSE feed, or a CSV download.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use request_profiler::{routes, ProfilerConfig, ProfilerState};
//!
//! # fn build() -> request_profiler::Result<Router> {
//! let state = ProfilerState::new(ProfilerConfig::from_env())?;
//! let app = Router::new().route("/", get(|| async { "hello" }));
//! Ok(routes::attach(app, state))
//! # }
//! ```

use std::sync::Arc;

pub mod config;
pub mod decision;
pub mod error;
pub mod export;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod timing;

pub use config::ProfilerConfig;
pub use error::{ProfilerError, Result};
pub use routes::{attach, profiler_router};
pub use store::{MetricRecord, MetricsStore};
pub use timing::TimingSource;

/// Shared profiler wiring, handed to the middleware and every profiler
/// endpoint via `State<ProfilerState>`. Owned by the hosting application —
/// there is no hidden global instance.
#[derive(Clone)]
pub struct ProfilerState {
    /// Immutable activation and retention settings.
    pub config: Arc<ProfilerConfig>,

    /// Central record store — the middleware inserts, endpoints read.
    pub store: Arc<MetricsStore>,

    /// Wall/CPU clock, capability probed once at startup.
    pub timing: Arc<TimingSource>,
}

impl ProfilerState {
    /// Validates the retention bound and builds the store and timing source.
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        let store = MetricsStore::new(config.max_retained_requests)?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            timing: Arc::new(TimingSource::new()),
        })
    }
}
