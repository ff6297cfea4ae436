use pkgdeck_core::progress::DEFAULT_STATUS_LOG_CAPACITY;
use pkgdeck_platform::AppPaths;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_status_log_capacity")]
    pub status_log_capacity: usize,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub default_cancelable: bool,
}

fn default_status_log_capacity() -> usize {
    DEFAULT_STATUS_LOG_CAPACITY
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_command_timeout() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            status_log_capacity: default_status_log_capacity(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            command_timeout_secs: default_command_timeout(),
            default_cancelable: true,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &AppPaths) -> Self {
        let settings_path = paths.settings_file();
        if !settings_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&settings_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "Ignoring unreadable settings at {}: {e}",
                    settings_path.display()
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let paths = AppPaths::new().map_err(|e| AppError::settings_save_failed(e.to_string()))?;
        self.save_to(&paths)
    }

    pub fn save_to(&self, paths: &AppPaths) -> Result<(), AppError> {
        paths.ensure_dirs().map_err(AppError::settings_save_failed)?;

        let content = serde_json::to_string_pretty(self).map_err(AppError::settings_save_failed)?;
        std::fs::write(paths.settings_file(), content).map_err(AppError::settings_save_failed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pkgdeck_platform::AppPaths;
    use serde_json::json;

    use super::AppSettings;

    fn temp_paths(root: &std::path::Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    #[test]
    fn defaults_match_expected_values() {
        let settings = AppSettings::default();

        assert_eq!(settings.status_log_capacity, 100);
        assert!(!settings.debug_logging);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.command_timeout_secs, 3600);
        assert!(settings.default_cancelable);
    }

    #[test]
    fn partial_json_fills_missing_fields_with_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({
            "status_log_capacity": 25,
            "debug_logging": true
        }))
        .expect("partial settings should deserialize");

        assert_eq!(settings.status_log_capacity, 25);
        assert!(settings.debug_logging);
        assert_eq!(settings.command_timeout_secs, 3600);
        assert!(settings.default_cancelable);
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = temp_paths(temp_dir.path());
        let settings = AppSettings {
            command_timeout_secs: 90,
            default_cancelable: false,
            ..AppSettings::default()
        };

        settings.save_to(&paths).expect("settings should save");
        let loaded = AppSettings::load_from(&paths);

        assert_eq!(loaded.command_timeout_secs, 90);
        assert!(!loaded.default_cancelable);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = temp_paths(temp_dir.path());
        paths.ensure_dirs().expect("dirs should be created");
        std::fs::write(paths.settings_file(), "{ not json").expect("write corrupt settings");

        let loaded = AppSettings::load_from(&paths);

        assert_eq!(loaded.status_log_capacity, 100);
    }
}
