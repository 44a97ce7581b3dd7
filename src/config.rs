use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Namespace under which all room documents live
    pub app_id: String,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Where to persist the store between restarts (disabled when unset)
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            snapshot_path: None,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

/// Trimmed value of an env var; unset and blank are both `None`
pub(crate) fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = match non_empty_var("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let snapshot_interval = non_empty_var("SNAPSHOT_INTERVAL")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.snapshot_interval);

        Self {
            app_id: non_empty_var("APP_ID").unwrap_or(defaults.app_id),
            port,
            static_dir: non_empty_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            snapshot_path: non_empty_var("SNAPSHOT_PATH").map(PathBuf::from),
            snapshot_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "APP_ID",
            "PORT",
            "STATIC_DIR",
            "SNAPSHOT_PATH",
            "SNAPSHOT_INTERVAL",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = AppConfig::from_env();
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.snapshot_interval, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("APP_ID", " my-game ");
        std::env::set_var("PORT", "9000");
        std::env::set_var("SNAPSHOT_PATH", "/tmp/rooms.json");
        std::env::set_var("SNAPSHOT_INTERVAL", "5");

        let config = AppConfig::from_env();
        assert_eq!(config.app_id, "my-game");
        assert_eq!(config.port, 9000);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/rooms.json")));
        assert_eq!(config.snapshot_interval, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_bad_values_fall_back() {
        clear_env();
        std::env::set_var("APP_ID", "   ");
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("SNAPSHOT_INTERVAL", "0");

        let config = AppConfig::from_env();
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.snapshot_interval, DEFAULT_SNAPSHOT_INTERVAL);
        clear_env();
    }
}
