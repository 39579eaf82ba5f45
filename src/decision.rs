use std::collections::HashMap;

use crate::config::ProfilerConfig;

/// Decides whether a request should be profiled.
///
/// Precedence: the frozen environment switch, then the construction-time
/// default, then an explicit `?profile=true` on the request (parameter name
/// per config, value compared case-insensitively). The query flag only ever
/// turns profiling on — a bare `?profile` or `?profile=false` never
/// deactivates a default that is already on.
///
/// Pure over its inputs: no clocks, no environment reads, no state.
pub fn should_profile(config: &ProfilerConfig, query: &HashMap<String, String>) -> bool {
    if config.env_override || config.enable_by_default {
        return true;
    }
    query
        .get(&config.profile_query_param)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
