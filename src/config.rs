use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::persist::default_cache_dir;
use crate::state::DEFAULT_MIN_PCT;

pub const DEFAULT_ENDPOINT: &str = "https://tempest-attendance.onrender.com/api/attendance/refresh";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub cache_dir: Option<PathBuf>,
    pub min_pct: u8,
    pub log_filter: String,
}

impl AppConfig {
    /// Reads `ATTEND_*` variables. Anything missing or unparseable falls
    /// back to its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };

        let endpoint = var("ATTEND_BACKEND").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout_secs = var("ATTEND_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 300);
        let cache_dir = var("ATTEND_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(default_cache_dir);
        let min_pct = var("ATTEND_MIN_PCT")
            .and_then(|val| val.parse::<u32>().ok())
            .map_or(DEFAULT_MIN_PCT, |pct| pct.min(100) as u8);
        let log_filter = var("ATTEND_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            cache_dir,
            min_pct,
            log_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{AppConfig, DEFAULT_ENDPOINT};

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[("ATTEND_CACHE_DIR", "/tmp/att")]);
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.timeout, Duration::from_secs(20));
        assert_eq!(cfg.min_pct, 75);
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.cache_dir, Some(PathBuf::from("/tmp/att")));
    }

    #[test]
    fn out_of_range_values_clamp() {
        let cfg = config(&[("ATTEND_MIN_PCT", "300"), ("ATTEND_TIMEOUT_SECS", "0")]);
        assert_eq!(cfg.min_pct, 100);
        assert_eq!(cfg.timeout, Duration::from_secs(1));

        let cfg = config(&[("ATTEND_TIMEOUT_SECS", "9000")]);
        assert_eq!(cfg.timeout, Duration::from_secs(300));
    }

    #[test]
    fn garbage_and_blank_values_fall_back() {
        let cfg = config(&[
            ("ATTEND_MIN_PCT", "lots"),
            ("ATTEND_TIMEOUT_SECS", "-5"),
            ("ATTEND_BACKEND", "   "),
            ("ATTEND_LOG", " debug "),
        ]);
        assert_eq!(cfg.min_pct, 75);
        assert_eq!(cfg.timeout, Duration::from_secs(20));
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.log_filter, "debug");
    }
}
