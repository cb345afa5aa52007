//! Built-in provider profiles

pub mod musicgen;
pub mod stability;
pub mod suno;

use std::time::Duration;

use crate::ambiance::Ambiance;
use crate::config::ProviderConfig;
use crate::error::{GatewayError, Result};
use crate::profile::{ProviderProfile, ResponseShape, Template};

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Suno,
    Stability,
    MusicGen,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Suno, Self::Stability, Self::MusicGen];

    /// Parse provider kind from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "suno" => Ok(Self::Suno),
            "stability" | "stable-audio" | "stable_audio" => Ok(Self::Stability),
            "musicgen" | "music-gen" | "local" => Ok(Self::MusicGen),
            _ => Err(GatewayError::UnknownProfile(s.to_string())),
        }
    }

    /// Profile name used in config and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Suno => "suno",
            Self::Stability => "stability",
            Self::MusicGen => "musicgen",
        }
    }

    /// Request kind the profile serves
    pub fn request_kind(&self) -> &'static str {
        match self {
            Self::Suno | Self::MusicGen => "music",
            Self::Stability => "sound",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::Suno => Some("SUNO_API_KEY"),
            Self::Stability => Some("STABILITY_API_KEY"),
            Self::MusicGen => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Suno => suno::SUNO_API_URL,
            Self::Stability => stability::STABILITY_API_URL,
            Self::MusicGen => musicgen::MUSICGEN_URL,
        }
    }

    /// Whether a profile can be built without further setup
    pub fn is_available(&self, config: Option<&ProviderConfig>) -> bool {
        match self.env_var() {
            None => true,
            Some(env_var) => get_api_key(config, env_var, self.name()).is_ok(),
        }
    }
}

/// Create a profile from its kind, optional overrides and extra ambiances
pub fn build_profile(
    kind: ProviderKind,
    provider_config: Option<&ProviderConfig>,
    extra_ambiances: &[Ambiance],
) -> Result<ProviderProfile> {
    let base_url = provider_config
        .and_then(|c| c.base_url.as_deref())
        .unwrap_or(kind.default_base_url());

    let mut profile = match kind {
        ProviderKind::Suno => {
            let api_key = get_api_key(provider_config, "SUNO_API_KEY", "Suno")?;
            let callback_url = provider_config
                .and_then(|c| c.callback_url.as_deref())
                .unwrap_or(suno::DEFAULT_CALLBACK_URL);
            suno::profile(base_url, api_key, callback_url)
        }
        ProviderKind::Stability => {
            let api_key = get_api_key(provider_config, "STABILITY_API_KEY", "Stability")?;
            stability::profile(base_url, api_key)
        }
        ProviderKind::MusicGen => musicgen::profile(base_url),
    };

    if let Some(config) = provider_config {
        if let Some(secs) = config.timeout_secs {
            profile.timeout = Duration::from_secs(secs);
        }
        if let (Some(secs), ResponseShape::Async { status, .. }) =
            (config.status_timeout_secs, &mut profile.response)
        {
            status.timeout = Duration::from_secs(secs);
        }
    }

    // Only profiles that already use templates pick up configured ambiances
    if !profile.templates.is_empty() {
        for extra in extra_ambiances {
            let template = match kind {
                ProviderKind::MusicGen => Template {
                    description: extra.description.clone().or_else(|| extra.prompt.clone()),
                    ..Template::default()
                },
                _ => extra.template(),
            };
            let layered = match profile.templates.get(&extra.id) {
                Some(builtin) => template.over(builtin),
                None => template,
            };
            profile.templates.insert(extra.id.clone(), layered);
        }
    }

    Ok(profile)
}

/// Get API key from config or environment variable
fn get_api_key(
    config: Option<&ProviderConfig>,
    env_var: &str,
    provider_name: &str,
) -> Result<String> {
    // Check config first
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    // Fall back to environment variable
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| GatewayError::MissingApiKey {
            provider: provider_name.to_string(),
            env_var: env_var.to_string(),
        })
}
