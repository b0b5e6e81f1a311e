use std::{fs, path::PathBuf, sync::Mutex, time::Duration};

use serde::{Deserialize, Serialize};

use crate::utils;

pub const DEFAULT_API_URL: &str = "https://api.amrum-urlaub.de";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::at(utils::data_root().join("config.json"))
    }

    /// Backed by an arbitrary file, used by tests.
    pub fn at(path: PathBuf) -> Self {
        let data = read_config(&path).unwrap_or_default();
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        self.data.lock().expect("config mutex poisoned").clone()
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| "config mutex poisoned".to_string())?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &PathBuf) -> Result<AppConfig, String> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}

fn write_config(path: &PathBuf, config: &AppConfig) -> Result<(), String> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}

/// Resolved settings for the HTTP gateway. Environment variables win over the
/// persisted config, which wins over the built-in defaults.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        let mut resolved = Self::default();
        if let Some(url) = &config.api_base_url {
            resolved.base_url = url.clone();
        }
        if let Some(secs) = config.request_timeout_secs {
            resolved.timeout = Duration::from_secs(secs);
        }
        resolved.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("AMRUM_API_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Some(secs) = std::env::var("AMRUM_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.timeout = Duration::from_secs(secs);
        }
        self
    }
}

/// Serializes tests that touch the AMRUM_* environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_store_round_trips_through_the_file() {
        let dir = std::env::temp_dir().join(format!("amrum-cfg-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let store = ConfigStore::at(path.clone());
        assert!(store.read().api_base_url.is_none());

        let updated = store
            .update(|config| {
                config.api_base_url = Some("https://stage.amrum-urlaub.de".to_string());
                config.request_timeout_secs = Some(30);
            })
            .expect("update persists");
        assert_eq!(
            updated.api_base_url.as_deref(),
            Some("https://stage.amrum-urlaub.de")
        );

        // A fresh store sees the persisted values.
        let reloaded = ConfigStore::at(path);
        assert_eq!(
            reloaded.read().api_base_url.as_deref(),
            Some("https://stage.amrum-urlaub.de")
        );
        assert_eq!(reloaded.read().request_timeout_secs, Some(30));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_config_file_reads_as_defaults() {
        let dir = std::env::temp_dir().join(format!("amrum-cfg-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.json");
        std::fs::write(&path, "{not json").expect("write corrupt file");

        let store = ConfigStore::at(path);
        assert!(store.read().api_base_url.is_none());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn gateway_config_resolution_env_over_persisted_over_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("AMRUM_API_URL");
        std::env::remove_var("AMRUM_API_TIMEOUT_SECS");

        // Defaults when nothing is set anywhere.
        let resolved = GatewayConfig::from_env();
        assert_eq!(resolved.base_url, DEFAULT_API_URL);
        assert_eq!(resolved.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        // Persisted values win over defaults.
        let persisted = AppConfig {
            api_base_url: Some("https://stage.amrum-urlaub.de".to_string()),
            request_timeout_secs: Some(30),
        };
        let resolved = GatewayConfig::from_app_config(&persisted);
        assert_eq!(resolved.base_url, "https://stage.amrum-urlaub.de");
        assert_eq!(resolved.timeout, Duration::from_secs(30));

        // Environment wins over persisted values.
        std::env::set_var("AMRUM_API_URL", "https://env.amrum-urlaub.de");
        std::env::set_var("AMRUM_API_TIMEOUT_SECS", "7");
        let resolved = GatewayConfig::from_app_config(&persisted);
        assert_eq!(resolved.base_url, "https://env.amrum-urlaub.de");
        assert_eq!(resolved.timeout, Duration::from_secs(7));

        // Blank or unparseable values fall through to the next layer.
        std::env::set_var("AMRUM_API_URL", "  ");
        std::env::set_var("AMRUM_API_TIMEOUT_SECS", "bald");
        let resolved = GatewayConfig::from_app_config(&persisted);
        assert_eq!(resolved.base_url, "https://stage.amrum-urlaub.de");
        assert_eq!(resolved.timeout, Duration::from_secs(30));

        std::env::remove_var("AMRUM_API_URL");
        std::env::remove_var("AMRUM_API_TIMEOUT_SECS");
    }
}
