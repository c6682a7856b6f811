//! TOML-based configuration system.
//!
//! Loads settings from a `config.toml` file, falling back to defaults that
//! match the stock behaviour. Every struct implements `Default` so a missing
//! or partial config file behaves like no file at all.
//!
//! ## Config file search order
//!
//! 1. `LIGHTBROWSER_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\LightBrowser\config.toml` on Windows)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::{DEFAULT_MEDIA_EXTENSIONS, RequestClassifier, UnknownResourcePolicy};
use crate::preferences::DEFAULT_HOMEPAGE;

/// File name of the preferences store inside the platform directory.
const PREFERENCES_FILE: &str = "browser_prefs.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub blocking: BlockingConfig,
    pub placeholder: PlaceholderConfig,
    pub storage: StorageConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Homepage used until the user saves one.
    pub homepage: String,
    /// Prefix for search queries typed in the URL bar.
    pub search_engine_url: String,
}

/// Media request blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Initial state when no preference has been saved yet.
    pub enabled_by_default: bool,
    /// Path suffixes treated as media, case-insensitive.
    pub media_extensions: Vec<String>,
    /// Decision for requests with neither a usable `Accept` header nor an
    /// extension.
    pub unknown_resources: UnknownResourcePolicy,
}

/// Placeholder appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub background: String,
    pub border: String,
    /// CSS pixels.
    pub min_width: u32,
    pub min_height: u32,
}

/// Where user preferences and bookmarks are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Empty = `<platform config dir>/browser_prefs.toml`.
    pub preferences_path: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            homepage: DEFAULT_HOMEPAGE.to_string(),
            search_engine_url: "https://lite.duckduckgo.com/lite/?q=".to_string(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            media_extensions: DEFAULT_MEDIA_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            unknown_resources: UnknownResourcePolicy::Allow,
        }
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            background: "#f0f0f0".to_string(),
            border: "1px solid #ccc".to_string(),
            min_width: 50,
            min_height: 50,
        }
    }
}

impl BlockingConfig {
    pub fn classifier(&self) -> RequestClassifier {
        RequestClassifier::new(&self.media_extensions, self.unknown_resources)
    }
}

impl StorageConfig {
    /// Resolved location of the preferences file.
    pub fn preferences_path(&self) -> PathBuf {
        if self.preferences_path.trim().is_empty() {
            platform_config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(PREFERENCES_FILE)
        } else {
            PathBuf::from(&self.preferences_path)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading and saving
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from a TOML file. Never panics: returns defaults
    /// if no file is found or if parsing fails.
    pub fn load() -> Self {
        match find_config_path() {
            Some(path) => match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        info!(path = %path.display(), "Configuration loaded");
                        config
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                        Config::default()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                    Config::default()
                }
            },
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    /// Saves configuration to the platform config directory.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = save_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific save path for the config file.
fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("LIGHTBROWSER_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

/// Returns the platform config directory without adding a dependency.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("LightBrowser"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("lightbrowser"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ResourceRequest;

    #[test]
    fn test_default_values() {
        let c = Config::default();
        assert_eq!(c.general.homepage, "https://lite.duckduckgo.com");
        assert!(c.blocking.enabled_by_default);
        assert_eq!(c.blocking.media_extensions.len(), 9);
        assert_eq!(c.blocking.unknown_resources, UnknownResourcePolicy::Allow);
        assert_eq!(c.placeholder.background, "#f0f0f0");
        assert_eq!(c.placeholder.border, "1px solid #ccc");
        assert_eq!(c.placeholder.min_width, 50);
        assert!(c.storage.preferences_path.is_empty());
    }

    #[test]
    fn test_empty_toml_returns_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.blocking.enabled_by_default);
        assert_eq!(config.placeholder.min_height, 50);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
[blocking]
unknown_resources = "block"

[placeholder]
min_width = 80
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.blocking.unknown_resources, UnknownResourcePolicy::Block);
        assert!(config.blocking.enabled_by_default); // default
        assert_eq!(config.placeholder.min_width, 80);
        assert_eq!(config.placeholder.min_height, 50); // default
    }

    #[test]
    fn test_unknown_policy_rejects_garbage() {
        let toml = r#"
[blocking]
unknown_resources = "maybe"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_custom_extensions_feed_classifier() {
        let toml = r#"
[blocking]
media_extensions = ["avif", ".HEIC"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let classifier = config.blocking.classifier();
        assert!(classifier.is_media_request(&ResourceRequest::new("https://x.org/p.heic")));
        assert!(!classifier.is_media_request(&ResourceRequest::new("https://x.org/p.png")));
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.general.homepage, config.general.homepage);
        assert_eq!(deserialized.blocking.media_extensions, config.blocking.media_extensions);
        assert_eq!(deserialized.blocking.unknown_resources, config.blocking.unknown_resources);
    }

    #[test]
    fn test_save_to_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.placeholder.min_width = 72;
        config.save_to(&path).unwrap();

        let loaded: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.placeholder.min_width, 72);
    }

    #[test]
    fn test_save_path_not_empty() {
        assert!(save_path().ends_with("config.toml"));
    }

    #[test]
    fn test_explicit_preferences_path() {
        let storage = StorageConfig {
            preferences_path: "/tmp/prefs.toml".to_string(),
        };
        assert_eq!(storage.preferences_path(), PathBuf::from("/tmp/prefs.toml"));
    }

    #[test]
    fn test_default_preferences_path_file_name() {
        let path = StorageConfig::default().preferences_path();
        assert!(path.ends_with("browser_prefs.toml"));
    }
}
