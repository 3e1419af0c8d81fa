//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rsprefs/rsprefs.toml`
//! 3. Environment variables: `RSPREFS_*` prefix

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

pub const DEFAULT_APP_NAME: &str = "rsprefs";
pub const DEFAULT_MANAGER_FACTORY: &str = "default";
pub const DEFAULT_PERSISTOR_FACTORY: &str = "json";

/// Raw settings for intermediate parsing; `None` means "not specified".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub app_name: Option<String>,
    pub location: Option<PathBuf>,
    pub manager_factory: Option<String>,
    pub persistor_factory: Option<String>,
}

impl RawSettings {
    /// Values set in `overlay` win.
    fn overlay(self, overlay: RawSettings) -> Self {
        Self {
            app_name: overlay.app_name.or(self.app_name),
            location: overlay.location.or(self.location),
            manager_factory: overlay.manager_factory.or(self.manager_factory),
            persistor_factory: overlay.persistor_factory.or(self.persistor_factory),
        }
    }
}

/// Unified configuration for rsprefs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Application name, used for the default backing store location
    pub app_name: String,
    /// Backing store file (default: ~/.<app_name>/preferences/default.json)
    pub location: PathBuf,
    /// Name of the preferences manager factory
    pub manager_factory: String,
    /// Name of the persistor factory
    pub persistor_factory: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            location: default_location(DEFAULT_APP_NAME),
            manager_factory: DEFAULT_MANAGER_FACTORY.to_string(),
            persistor_factory: DEFAULT_PERSISTOR_FACTORY.to_string(),
        }
    }
}

/// Default backing store for an application (`~/.<app>/preferences/default.json`).
pub fn default_location(app_name: &str) -> PathBuf {
    let relative = Path::new(&format!(".{app_name}"))
        .join("preferences")
        .join("default.json");
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(&relative))
        .unwrap_or_else(|| Path::new("~").join(relative))
}

/// Get the XDG config directory for rsprefs.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", DEFAULT_APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rsprefs.toml"))
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables are left as written.
fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| shellexpand::tilde(value).into_owned())
}

impl Settings {
    /// Load settings from the global config file and the environment.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Load settings with an explicit global config file.
    ///
    /// A missing file is skipped; environment variables still apply.
    pub fn load_from(global_path: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut raw = RawSettings::default();

        if let Some(path) = global_path {
            if path.exists() {
                raw = raw.overlay(load_raw_settings(path)?);
            }
        }

        raw = raw.overlay(Self::env_overrides()?);

        Ok(Self::resolve(raw))
    }

    /// Fill unspecified values from defaults and expand the location.
    pub fn resolve(raw: RawSettings) -> Self {
        let app_name = raw
            .app_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let location = raw
            .location
            .unwrap_or_else(|| default_location(&app_name));
        let mut settings = Self {
            location,
            app_name,
            manager_factory: raw
                .manager_factory
                .unwrap_or_else(|| DEFAULT_MANAGER_FACTORY.to_string()),
            persistor_factory: raw
                .persistor_factory
                .unwrap_or_else(|| DEFAULT_PERSISTOR_FACTORY.to_string()),
        };
        settings.expand_paths();
        settings
    }

    fn expand_paths(&mut self) {
        self.location = PathBuf::from(expand(&self.location.to_string_lossy()));
    }

    /// RSPREFS_* environment variables as explicit overrides.
    fn env_overrides() -> Result<RawSettings, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("RSPREFS").separator("__"))
            .build()
            .map_err(config_err)?;

        Ok(RawSettings {
            app_name: config.get_string("app_name").ok(),
            location: config.get_string("location").ok().map(PathBuf::from),
            manager_factory: config.get_string("manager_factory").ok(),
            persistor_factory: config.get_string("persistor_factory").ok(),
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# rsprefs configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/rsprefs/rsprefs.toml
#   Env:    RSPREFS_* environment variables (explicit overrides)

# Application name; determines the default backing store location
# app_name = "rsprefs"

# Backing store file (~ and $VAR are expanded)
# location = "~/.rsprefs/preferences/default.json"

# Preferences manager implementation
# manager_factory = "default"

# Persistence implementation
# persistor_factory = "json"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_resolving_then_uses_defaults() {
        let settings = Settings::resolve(RawSettings::default());
        assert_eq!(settings.app_name, "rsprefs");
        assert!(settings
            .location
            .ends_with(Path::new(".rsprefs/preferences/default.json")));
        assert_eq!(settings.manager_factory, "default");
        assert_eq!(settings.persistor_factory, "json");
    }

    #[test]
    fn given_app_name_when_resolving_then_location_follows_it() {
        let settings = Settings::resolve(RawSettings {
            app_name: Some("editor".into()),
            ..Default::default()
        });
        assert!(settings
            .location
            .ends_with(Path::new(".editor/preferences/default.json")));
    }

    #[test]
    fn given_tilde_in_location_when_resolving_then_expands_to_home() {
        let settings = Settings::resolve(RawSettings {
            location: Some(PathBuf::from("~/prefs.json")),
            ..Default::default()
        });

        let home = std::env::var("HOME").expect("HOME should be set");
        let location = settings.location.to_string_lossy();
        assert!(location.starts_with(&home), "location: {location}");
        assert!(!location.contains('~'));
    }

    #[test]
    fn given_overlay_when_merging_then_specified_values_win() {
        let base = RawSettings {
            app_name: Some("base".into()),
            manager_factory: Some("default".into()),
            ..Default::default()
        };
        let overlay = RawSettings {
            app_name: Some("top".into()),
            ..Default::default()
        };
        let merged = base.overlay(overlay);
        assert_eq!(merged.app_name.as_deref(), Some("top"));
        assert_eq!(merged.manager_factory.as_deref(), Some("default"));
    }

    #[test]
    fn given_settings_when_rendering_toml_then_contains_all_fields() {
        let toml = Settings::default().to_toml().unwrap();
        for field in ["app_name", "location", "manager_factory", "persistor_factory"] {
            assert!(toml.contains(field), "{field} missing from {toml}");
        }
    }
}
