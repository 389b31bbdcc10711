//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILPDF_CONFIG` (environment variable)
//! 2. `~/.config/mailpdf/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailpdf\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// How output folder and file names are derived.
    pub naming: NamingConfig,
    /// Document conversion settings.
    pub converter: ConverterConfig,
    /// Mail store settings.
    pub store: StoreConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs and scratch files.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Naming rules for output folders and files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Maximum length, in characters, of a sanitized name.
    pub max_name_length: usize,
    /// Name used when sanitizing leaves nothing.
    pub untitled: String,
    /// Subject used in folder names for messages without one.
    pub empty_subject: String,
    /// `strftime` format of the timestamp prefix of message folders.
    pub folder_date_format: String,
    /// File name of the rendered message body inside each message folder.
    pub body_file_name: String,
}

/// Document conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Attempts per conversion before giving up.
    pub max_attempts: u32,
    /// Fixed pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// LibreOffice executable used by the office backend.
    pub office_binary: PathBuf,
    /// Kill a single backend call after this many seconds.
    pub timeout_secs: u64,
}

/// Mail store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Pause after attaching an archive so the store can index it, in milliseconds.
    pub attach_wait_ms: u64,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_name_length: 150,
            untitled: "Untitled".to_string(),
            empty_subject: "No Subject".to_string(),
            folder_date_format: "%Y-%m-%d_%H%M%S".to_string(),
            body_file_name: "Email.pdf".to_string(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2000,
            office_binary: PathBuf::from("soffice"),
            timeout_secs: 120,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { attach_wait_ms: 1000 }
    }
}

impl ConverterConfig {
    /// Pause between two conversion attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Upper bound for one backend call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StoreConfig {
    /// Pause after attaching an archive.
    pub fn attach_wait(&self) -> Duration {
        Duration::from_millis(self.attach_wait_ms)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILPDF_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailpdf").join("config.toml"))
}

/// Return the cache directory for logs and backend scratch space.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpdf")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailpdf.log")
}
