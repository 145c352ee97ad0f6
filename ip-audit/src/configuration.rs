use config::{Config, ConfigError, FileFormat};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;
use tracing::info;

/// How stamped addresses are stored in the record.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "String")]
pub enum Format {
    /// 4 or 16 raw bytes.
    #[default]
    Binary,
    /// Canonical textual form, up to 45 characters.
    Text,
}

impl TryFrom<String> for Format {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "binary" | "blob" => Ok(Self::Binary),
            "text" | "string" => Ok(Self::Text),
            other => Err(format!(
                "{other} is not a supported format. Use either `binary` or `text`"
            )),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// File/env representation of a stamping setup. Functions and actor sources can't be
/// expressed here; attach them to the [`StampConfig`](crate::StampConfig) built from it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StampSettings {
    #[serde(default = "default_created_from")]
    pub created_from_attribute: String,
    #[serde(default = "default_updated_from")]
    pub updated_from_attribute: String,
    pub value: Option<String>,
    pub default_value: Option<String>,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub preserve_non_empty_values: bool,
}

fn default_created_from() -> String {
    "created_from".into()
}

fn default_updated_from() -> String {
    "updated_from".into()
}

impl Default for StampSettings {
    fn default() -> Self {
        Self {
            created_from_attribute: default_created_from(),
            updated_from_attribute: default_updated_from(),
            value: None,
            default_value: None,
            format: Format::default(),
            preserve_non_empty_values: false,
        }
    }
}

impl StampSettings {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

/// Loads `.env`, then `configuration/ip_audit.toml` if present, then `IP_AUDIT_*` variables.
pub fn get_settings() -> Result<StampSettings, ConfigError> {
    dotenv::dotenv().ok();

    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {e}")))?;
    let config_file = base_path.join("configuration").join("ip_audit.toml");
    info!("Reading stamp settings from {}", config_file.display());

    Config::builder()
        .add_source(config::File::from(config_file).required(false))
        .add_source(
            config::Environment::with_prefix("IP_AUDIT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}
