use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::toast::DEFAULT_TOAST_DURATION;

const CONFIG_FILE: &str = "chatlist_config.json";
const TOAST_MS_ENV: &str = "PIKA_CHATLIST_TOAST_MS";
const PERSIST_ENV: &str = "PIKA_CHATLIST_PERSIST";

/// On-disk app config. Every field is optional so older files keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub toast_duration_ms: Option<u64>,
    pub persist_stores: Option<bool>,
}

impl AppConfig {
    pub fn toast_duration(&self) -> Duration {
        self.toast_duration_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TOAST_DURATION)
    }

    pub fn persist_stores(&self) -> bool {
        self.persist_stores.unwrap_or(true)
    }

    /// Overlay `PIKA_CHATLIST_*` overrides; `lookup` is `std::env::var` outside tests.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(TOAST_MS_ENV) {
            match v.trim().parse::<u64>() {
                Ok(ms) => self.toast_duration_ms = Some(ms),
                Err(e) => tracing::warn!(%e, var = TOAST_MS_ENV, value = %v, "ignoring env override"),
            }
        }
        if let Some(v) = lookup(PERSIST_ENV) {
            let v = v.trim();
            let off = ["0", "false", "no"]
                .iter()
                .any(|word| v.eq_ignore_ascii_case(word));
            self.persist_stores = Some(!off);
        }
    }
}

pub fn load_app_config(data_dir: &str) -> AppConfig {
    let mut config = read_config_file(data_dir);
    config.apply_env(|key| std::env::var(key).ok());
    tracing::info!(
        toast_ms = config.toast_duration().as_millis() as u64,
        persist = config.persist_stores(),
        "config loaded"
    );
    config
}

fn read_config_file(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(_) => return AppConfig::default(),
    };
    match serde_json::from_str::<AppConfig>(&data) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(%e, path = %path.display(), "malformed config, using defaults");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_file(&dir.path().to_string_lossy());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.toast_duration(), Duration::from_millis(2200));
        assert!(config.persist_stores());
    }

    #[test]
    fn reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"toast_duration_ms": 150, "unknown_key": 1}"#,
        )
        .unwrap();
        let config = read_config_file(&dir.path().to_string_lossy());
        assert_eq!(config.toast_duration(), Duration::from_millis(150));
        assert!(config.persist_stores());
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();
        let config = read_config_file(&dir.path().to_string_lossy());
        assert_eq!(config, AppConfig::default());
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig {
            toast_duration_ms: Some(150),
            persist_stores: Some(true),
        };
        config.apply_env(env(&[(TOAST_MS_ENV, " 75 "), (PERSIST_ENV, "0")]));
        assert_eq!(config.toast_duration(), Duration::from_millis(75));
        assert!(!config.persist_stores());
    }

    #[test]
    fn unparsable_toast_override_is_ignored() {
        let mut config = AppConfig {
            toast_duration_ms: Some(150),
            persist_stores: None,
        };
        config.apply_env(env(&[(TOAST_MS_ENV, "soon")]));
        assert_eq!(config.toast_duration(), Duration::from_millis(150));
        assert!(config.persist_stores());
    }

    #[test]
    fn persist_override_ignores_case() {
        for off in ["false", "FALSE", "No", "0"] {
            let mut config = AppConfig::default();
            config.apply_env(env(&[(PERSIST_ENV, off)]));
            assert!(!config.persist_stores(), "{off}");
        }
        for on in ["1", "true", "yes"] {
            let mut config = AppConfig {
                toast_duration_ms: None,
                persist_stores: Some(false),
            };
            config.apply_env(env(&[(PERSIST_ENV, on)]));
            assert!(config.persist_stores(), "{on}");
        }
    }

    #[test]
    fn no_overrides_keep_file_values() {
        let mut config = AppConfig {
            toast_duration_ms: Some(10),
            persist_stores: Some(false),
        };
        config.apply_env(env(&[]));
        assert_eq!(config.toast_duration(), Duration::from_millis(10));
        assert!(!config.persist_stores());
    }
}
