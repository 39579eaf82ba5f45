/// Environment switch that forces profiling on for every request,
/// regardless of how the middleware was constructed. Value is compared
/// case-insensitively against `"true"`.
pub const ENV_SWITCH: &str = "REQUEST_PROFILER_ENABLED";

/// Activation and retention settings, fixed at construction time.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Profile every request without requiring the query flag.
    pub enable_by_default: bool,

    /// Query parameter that turns profiling on for a single request,
    /// e.g. `?profile=true`.
    pub profile_query_param: String,

    /// Upper bound on how many records the store retains.
    pub max_retained_requests: usize,

    /// Snapshot of the `REQUEST_PROFILER_ENABLED` switch, read once when
    /// the config was built. Overrides `enable_by_default` when true.
    pub env_override: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enable_by_default: false,
            profile_query_param: "profile".into(),
            max_retained_requests: 1000,
            env_override: false,
        }
    }
}

impl ProfilerConfig {
    /// Defaults with the environment switch ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus a one-time read of the process environment.
    /// The switch is frozen here; later changes to the environment do not
    /// affect a running profiler.
    pub fn from_env() -> Self {
        let env_override = std::env::var(ENV_SWITCH)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            env_override,
            ..Self::default()
        }
    }

    pub fn enable_by_default(mut self, on: bool) -> Self {
        self.enable_by_default = on;
        self
    }

    pub fn profile_query_param<S: Into<String>>(mut self, name: S) -> Self {
        self.profile_query_param = name.into();
        self
    }

    pub fn max_retained_requests(mut self, n: usize) -> Self {
        self.max_retained_requests = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = ProfilerConfig::new();
        assert!(!config.enable_by_default);
        assert_eq!(config.profile_query_param, "profile");
        assert_eq!(config.max_retained_requests, 1000);
        assert!(!config.env_override);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ProfilerConfig::new()
            .enable_by_default(true)
            .profile_query_param("trace")
            .max_retained_requests(50);
        assert!(config.enable_by_default);
        assert_eq!(config.profile_query_param, "trace");
        assert_eq!(config.max_retained_requests, 50);
    }

    #[test]
    fn env_switch_is_read_once() {
        std::env::set_var(ENV_SWITCH, "TrUe");
        let armed = ProfilerConfig::from_env();
        std::env::set_var(ENV_SWITCH, "false");
        let disarmed = ProfilerConfig::from_env();
        std::env::remove_var(ENV_SWITCH);

        // The first snapshot is unaffected by the later change.
        assert!(armed.env_override);
        assert!(!disarmed.env_override);
    }
}
