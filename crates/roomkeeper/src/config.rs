//! Bot configuration, loaded from a TOML file.
//!
//! ```toml
//! prefix = "!"
//! room_name_template = "Room {name}"
//! platform_timeout_secs = 10
//!
//! [categories.gaming]
//! category_name = "Gaming"
//! creation_channel_name = "Create-Talk"
//! default_capacity = 5
//! ```
//!
//! The token is read from `ROOMKEEPER_TOKEN` when set, falling back to an
//! optional `token` key in the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roomkeeper_protocol::{Capacity, CategoryKind, DEFAULT_PREFIX};
use roomkeeper_room::{CategorySettings, SettingsStore};
use serde::{Deserialize, Serialize};

/// Environment variable that carries the bot token.
pub const TOKEN_ENV: &str = "ROOMKEEPER_TOKEN";

/// Placeholder in [`BotConfig::room_name_template`] replaced by the
/// owner's display name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no bot token: set ROOMKEEPER_TOKEN or `token` in the config file")]
    MissingToken,

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix, e.g. `!` for `!set-private`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Name given to new rooms. `{name}` becomes the owner's display name.
    #[serde(default = "default_room_name_template")]
    pub room_name_template: String,

    /// Upper bound on any single platform call.
    #[serde(default = "default_platform_timeout_secs")]
    pub platform_timeout_secs: u64,

    /// Bot token. Prefer the environment variable.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Seed values for the settings store, keyed by kind.
    pub categories: BTreeMap<CategoryKind, CategorySettings>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_room_name_template() -> String {
    format!("Room {NAME_PLACEHOLDER}")
}

fn default_platform_timeout_secs() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            CategoryKind::new("gaming"),
            CategorySettings {
                category_name: "Gaming".to_string(),
                creation_channel_name: "Create-Talk".to_string(),
                default_capacity: Capacity::new(5).unwrap_or_default(),
            },
        );
        Self {
            prefix: default_prefix(),
            room_name_template: default_room_name_template(),
            platform_timeout_secs: default_platform_timeout_secs(),
            token: None,
            categories,
        }
    }
}

impl BotConfig {
    /// Reads, parses, and validates a config file, then applies
    /// [`TOKEN_ENV`] over the file's token.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config = Self::from_toml_str(&text)?;
        config.override_token(std::env::var(TOKEN_ENV).ok());
        tracing::debug!(
            path = %path.display(),
            kinds = config.categories.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the token when `token` is set and non-empty.
    pub fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    /// Returns the token, or [`ConfigError::MissingToken`].
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("prefix must not be empty".into()));
        }
        if self.room_name_template.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "room_name_template must not be empty".into(),
            ));
        }
        if self.platform_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "platform_timeout_secs must be at least 1".into(),
            ));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [categories.<kind>] table is required".into(),
            ));
        }
        for (kind, settings) in &self.categories {
            if kind.as_str().is_empty() {
                return Err(ConfigError::Invalid("empty category kind".into()));
            }
            if settings.category_name.trim().is_empty()
                || settings.creation_channel_name.trim().is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "category `{kind}` needs a category_name and a creation_channel_name"
                )));
            }
        }
        Ok(())
    }

    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.platform_timeout_secs)
    }

    /// A settings store seeded from `categories`.
    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(self.categories.clone())
    }
}
