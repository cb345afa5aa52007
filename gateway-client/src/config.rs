use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::ambiance::{self, Ambiance};
use crate::error::{GatewayError, Result};
use crate::profile::ProviderProfile;
use crate::providers::{ProviderKind, build_profile};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Profile used when no kind-specific default is set
    #[serde(default = "default_profile")]
    pub default_profile: String,

    /// Per-kind default profiles (request kind -> profile name)
    #[serde(default)]
    pub defaults: HashMap<String, String>,

    /// Provider-specific configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Additional or overriding ambiances (id -> ambiance)
    #[serde(default)]
    pub ambiances: BTreeMap<String, Ambiance>,
}

fn default_profile() -> String {
    "suno".to_string()
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Generation call timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Status call timeout (asynchronous providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_timeout_secs: Option<u64>,

    /// Webhook the provider notifies on completion (Suno requires one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| GatewayError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/cli-programs/gen-ambiance.toml"))
    }

    /// Get the default profile name for a request kind
    ///
    /// Falls back to `default_profile` if no kind-specific default is set.
    pub fn get_default_for_kind(&self, kind: &str) -> &str {
        self.defaults
            .get(kind)
            .map(String::as_str)
            .unwrap_or(&self.default_profile)
    }

    /// Get provider config by profile name
    pub fn get_provider_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Mutable provider config, created on first use
    pub fn provider_config_mut(&mut self, name: &str) -> Result<&mut ProviderConfig> {
        let kind = ProviderKind::from_str(name)?;
        Ok(self.providers.entry(kind.name().to_string()).or_default())
    }

    /// Ambiances defined in the config file, ids filled from their table keys
    pub fn custom_ambiances(&self) -> Vec<Ambiance> {
        self.ambiances
            .iter()
            .map(|(id, entry)| {
                let mut entry = entry.clone();
                entry.id = id.clone();
                entry
            })
            .collect()
    }

    /// Built-in ambiances followed by new configured ones; a configured id
    /// overrides the built-in field by field
    pub fn all_ambiances(&self) -> Vec<Ambiance> {
        let custom = self.custom_ambiances();
        let mut all: Vec<Ambiance> = ambiance::builtin()
            .iter()
            .map(|builtin| match custom.iter().find(|c| c.id == builtin.id) {
                Some(entry) => entry.over(builtin),
                None => builtin.clone(),
            })
            .collect();
        all.extend(
            custom
                .into_iter()
                .filter(|c| !ambiance::builtin().iter().any(|b| b.id == c.id))
                .map(|mut c| {
                    if c.name.is_empty() {
                        c.name = c.id.clone();
                    }
                    c
                }),
        );
        all
    }

    /// Build the named provider profile with this config's overrides
    pub fn profile(&self, name: &str) -> Result<ProviderProfile> {
        let kind = ProviderKind::from_str(name)?;
        build_profile(
            kind,
            self.get_provider_config(kind.name()),
            &self.custom_ambiances(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert("music".to_string(), "suno".to_string());
        defaults.insert("sound".to_string(), "stability".to_string());

        Self {
            default_profile: default_profile(),
            defaults,
            providers: HashMap::new(),
            ambiances: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_profile, "suno");
        assert_eq!(config.get_default_for_kind("music"), "suno");
        assert_eq!(config.get_default_for_kind("sound"), "stability");
        assert_eq!(config.get_default_for_kind("document"), "suno");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.provider_config_mut("suno").unwrap().api_key = Some("abc".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_profile, config.default_profile);
        assert_eq!(
            parsed.get_provider_config("suno").unwrap().api_key.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path().unwrap();
        assert!(path.ends_with(".config/cli-programs/gen-ambiance.toml"));
    }

    #[test]
    fn test_parse_config_file() {
        let toml_str = r#"
default_profile = "musicgen"

[defaults]
sound = "stability"

[providers.stability]
api_key = "sk-test"
timeout_secs = 90

[ambiances.rainy-library]
name = "Rainy Library"
style_label = "Ambient, Calm"
prompt = "Rain against tall windows"

[ambiances.cafe-jazz]
prompt = "Smoky late-night jazz trio"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.get_default_for_kind("music"), "musicgen");

        let stability = config.profile("stability").unwrap();
        assert_eq!(stability.credential.as_deref(), Some("sk-test"));
        assert_eq!(stability.timeout.as_secs(), 90);

        let all = config.all_ambiances();
        assert_eq!(all.len(), 9);
        let jazz = all.iter().find(|a| a.id == "cafe-jazz").unwrap();
        assert_eq!(jazz.prompt.as_deref(), Some("Smoky late-night jazz trio"));
        assert_eq!(jazz.name, "Café Jazz");
        assert_eq!(jazz.style.as_deref(), Some("Jazz, Relaxing"));
        assert_eq!(jazz.title.as_deref(), Some("Cafe Jazz Lounge"));
    }

    #[test]
    fn test_unknown_profile() {
        let config = Config::default();
        assert!(matches!(
            config.profile("udio"),
            Err(GatewayError::UnknownProfile(_))
        ));
        let mut config = config;
        assert!(config.provider_config_mut("udio").is_err());
    }
}
