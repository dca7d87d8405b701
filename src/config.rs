//! Configuration management
//!
//! Loads and validates TOML configuration, falling back to defaults that
//! match the reference deployment when no file is present.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Portal account username
    #[serde(default)]
    pub username: String,

    /// Portal account password
    #[serde(default)]
    pub password: String,

    /// Seconds between connectivity checks in daemon mode
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Whether to keep the append-only audit log
    #[serde(default = "default_enable_logging")]
    pub enable_logging: bool,

    /// Audit log path
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// URL probed to decide whether the network is up
    #[serde(default = "default_test_url")]
    pub test_url: String,

    /// SSID to (re)join before logging in; empty disables WiFi control
    #[serde(default = "default_wifi_ssid")]
    pub wifi_ssid: String,

    /// Portal base URL; challenge and login endpoints live under
    /// `/cgi-bin/` on it
    #[serde(default = "default_portal_base")]
    pub portal_base: String,

    /// IP used when neither discovery nor the challenge supplies one
    #[serde(default = "default_fallback_ip")]
    pub fallback_ip: String,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level for diagnostics (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_check_interval() -> u64 {
    300
}

fn default_enable_logging() -> bool {
    true
}

fn default_log_file() -> String {
    "auto_login.log".to_string()
}

fn default_test_url() -> String {
    "http://www.baidu.com".to_string()
}

fn default_wifi_ssid() -> String {
    "BUAA-WiFi".to_string()
}

fn default_portal_base() -> String {
    "https://gw.buaa.edu.cn".to_string()
}

fn default_fallback_ip() -> String {
    "10.34.0.142".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from an explicit path, or search the usual
    /// locations, or use defaults if nothing is found.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            return toml::from_str(&contents).context("failed to parse config file");
        }

        let config_paths = vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/srunkeep/config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".config/srunkeep/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                return toml::from_str(&contents).context("failed to parse config file");
            }
        }

        Ok(Self::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            check_interval: default_check_interval(),
            enable_logging: default_enable_logging(),
            log_file: default_log_file(),
            test_url: default_test_url(),
            wifi_ssid: default_wifi_ssid(),
            portal_base: default_portal_base(),
            fallback_ip: default_fallback_ip(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.check_interval, 300);
        assert!(cfg.enable_logging);
        assert_eq!(cfg.log_file, "auto_login.log");
        assert_eq!(cfg.test_url, "http://www.baidu.com");
        assert_eq!(cfg.wifi_ssid, "BUAA-WiFi");
        assert_eq!(cfg.portal_base, "https://gw.buaa.edu.cn");
        assert_eq!(cfg.fallback_ip, "10.34.0.142");
        assert_eq!(cfg.http.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
                username = "student01"
                password = "hunter2"
                check_interval = 60

                [logging]
                level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.username, "student01");
        assert_eq!(cfg.check_interval, 60);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.wifi_ssid, "BUAA-WiFi");
        assert_eq!(cfg.http.connect_timeout, 5);
    }
}
