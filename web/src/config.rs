use std::env;
use std::path::PathBuf;

use db::locator::DEFAULT_BASE_DIR;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Server configuration read from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_address: String,
    pub sentry_dsn: Option<String>,
    pub workers: usize,
    pub watermark: Option<String>,
    pub normalize_datasets: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        Self {
            db_path: set("BIBLE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR)),
            bind_address: set("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            sentry_dsn: set("SENTRY_DSN"),
            workers: set("WORKERS")
                .and_then(|w| w.trim().parse().ok())
                .filter(|w| *w > 0)
                .unwrap_or_else(num_cpus::get),
            watermark: set("CARD_WATERMARK"),
            normalize_datasets: set("NORMALIZE_DATASETS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.db_path, PathBuf::from("bible_databases/formats/sqlite"));
        assert_eq!(config.bind_address, "0.0.0.0:8000");
        assert_eq!(config.sentry_dsn, None);
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.watermark, None);
        assert!(!config.normalize_datasets);
    }

    #[test]
    fn from_vars() {
        let config = from_pairs(&[
            ("BIBLE_DB_PATH", "/srv/bibles"),
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("WORKERS", "3"),
            ("CARD_WATERMARK", "example.org"),
            ("NORMALIZE_DATASETS", "True"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/srv/bibles"));
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert!(config.sentry_dsn.is_some());
        assert_eq!(config.workers, 3);
        assert_eq!(config.watermark.as_deref(), Some("example.org"));
        assert!(config.normalize_datasets);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = from_pairs(&[("WORKERS", "many"), ("SENTRY_DSN", " ")]);
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.sentry_dsn, None);

        assert_eq!(from_pairs(&[("WORKERS", "0")]).workers, num_cpus::get());
        assert!(!from_pairs(&[("NORMALIZE_DATASETS", "no")]).normalize_datasets);
    }
}
