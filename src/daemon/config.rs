use crate::core::config::Settings;

/// Watcher knobs flattened out of `Settings`, with times as signed ms so
/// the decision functions can do plain clock arithmetic.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub persistence_ms: i64,
    pub launch_cooldown_ms: i64,
    pub lookback_ms: i64,
    pub no_usage_timeout_ms: i64,
    /// Lowercased target-name predicate.
    pub match_substring: String,
    pub fallback_guess: String,
    pub redirect_package: String,
    pub ignore_packages: Vec<String>,
}

impl WatcherConfig {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            persistence_ms: s.daemon.persistence_ms as i64,
            launch_cooldown_ms: s.daemon.launch_cooldown_ms as i64,
            lookback_ms: s.daemon.lookback_ms as i64,
            no_usage_timeout_ms: s.daemon.no_usage_timeout_ms as i64,
            match_substring: s.target.match_substring.to_lowercase(),
            fallback_guess: s.target.fallback_guess.clone(),
            redirect_package: s.target.redirect_package.clone(),
            ignore_packages: s.target.ignore_packages.clone(),
        }
    }
}
