use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(
        "No subscription IDs configured. Set SUBSCRIPTION_IDS (comma-separated) \
         or add them under [report] in the config file."
    )]
    NoSubscriptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Label appended to amounts in console output and the email summary.
    /// Purely cosmetic; no conversion is performed.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Directory the CSV report is written into. Defaults to the working
    /// directory.
    pub output_dir: Option<String>,
}

fn default_currency() -> String {
    "INR".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            color: default_color(),
            output_dir: None,
        }
    }
}

/// Non-secret report inputs that may live in the config file. The
/// environment always wins; secrets never live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportDefaults {
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub report: ReportDefaults,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("azcost").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).expect("Failed to serialize config");
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if self.settings.currency.trim().is_empty() {
            issues.push("Currency label must not be blank".to_string());
        }
        for id in &self.report.subscriptions {
            if id.trim().is_empty() {
                issues.push("Blank subscription ID in [report] subscriptions".to_string());
            }
        }
        issues
    }
}

/// The resolved inputs for one run: the subscriptions to report on.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub subscription_ids: Vec<String>,
}

impl RunConfig {
    /// SUBSCRIPTION_IDS from the environment (comma-separated, blanks
    /// dropped), falling back to the config file list. An empty result is
    /// fatal before any network call is made.
    pub fn resolve(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::resolve_from(config, std::env::var("SUBSCRIPTION_IDS").ok())
    }

    fn resolve_from(config: &AppConfig, env_value: Option<String>) -> Result<Self, ConfigError> {
        let subscription_ids: Vec<String> = match env_value {
            Some(raw) => split_list(&raw),
            None => config
                .report
                .subscriptions
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };
        if subscription_ids.is_empty() {
            return Err(ConfigError::NoSubscriptions);
        }
        Ok(Self { subscription_ids })
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_currency_is_inr() {
        assert_eq!(Settings::default().currency, "INR");
    }

    #[test]
    fn validate_catches_invalid_color() {
        let mut config = AppConfig::default();
        config.settings.color = "blue".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("color")));
    }

    #[test]
    fn validate_catches_blank_subscription() {
        let mut config = AppConfig::default();
        config.report.subscriptions.push("  ".to_string());
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("Blank subscription")));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[settings]
currency = "USD"
color = "never"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.currency, "USD");
        assert_eq!(config.settings.color, "never");
        assert!(config.report.subscriptions.is_empty());
    }

    #[test]
    fn parse_report_section() {
        let toml = r#"
[report]
subscriptions = ["00000000-1111-2222-3333-444444444444"]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.report.subscriptions.len(), 1);
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.currency, "INR");
        assert_eq!(config.settings.color, "auto");
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list("a, b ,,  ,c"), vec!["a", "b", "c"]);
        assert!(split_list("  ,  ").is_empty());
        assert!(split_list("").is_empty());
    }

    #[test]
    fn resolve_prefers_env_over_file() {
        let mut config = AppConfig::default();
        config.report.subscriptions.push("from-file".to_string());
        let run = RunConfig::resolve_from(&config, Some("from-env-1, from-env-2".into())).unwrap();
        assert_eq!(run.subscription_ids, vec!["from-env-1", "from-env-2"]);
    }

    #[test]
    fn resolve_falls_back_to_file() {
        let mut config = AppConfig::default();
        config.report.subscriptions.push("from-file".to_string());
        let run = RunConfig::resolve_from(&config, None).unwrap();
        assert_eq!(run.subscription_ids, vec!["from-file"]);
    }

    #[test]
    fn resolve_empty_everywhere_is_a_config_error() {
        let config = AppConfig::default();
        let err = RunConfig::resolve_from(&config, Some(" , ".into())).unwrap_err();
        assert!(matches!(err, ConfigError::NoSubscriptions));
    }
}
