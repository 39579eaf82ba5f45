use thiserror::Error;

/// Errors the profiler can surface at setup time.
///
/// Runtime instrumentation never fails: a degraded CPU clock falls back to
/// wall time, store contention is absorbed by its lock, and downstream
/// failures are recorded and re-propagated untouched.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProfilerError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for profiler operations.
pub type Result<T> = std::result::Result<T, ProfilerError>;
