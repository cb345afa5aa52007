//! Gateway wrapper for gen-ambiance
//!
//! Resolves the provider profile from config and owns the gateway instance.

use anyhow::{Context, Result};
use gateway_client::{
    Ambiance, Config, Gateway, Generation, GenerationRequest, PollableTask, ProviderKind,
    ProviderProfile, ReqwestTransport,
};
use log::debug;

pub struct AmbianceClient {
    gateway: Gateway<ReqwestTransport>,
    profile: ProviderProfile,
    ambiances: Vec<Ambiance>,
}

impl AmbianceClient {
    /// Create a client for the named profile
    ///
    /// If profile_name is None, uses the default profile for `kind` from config.
    pub fn new(profile_name: Option<&str>, kind: &str) -> Result<Self> {
        let config = Config::load().context("Failed to load gen-ambiance configuration")?;
        let profile_name = profile_name.unwrap_or_else(|| config.get_default_for_kind(kind));

        // Validate the name first so a typo is reported as such, not as a missing key
        let provider = ProviderKind::from_str(profile_name)
            .context(format!("Unknown profile: {}", profile_name))?;
        let profile = config
            .profile(provider.name())
            .context(format!("Failed to initialize profile '{}'", provider.name()))?;

        let transport = ReqwestTransport::new().context("Failed to create HTTP client")?;

        debug!(
            "Using profile: {} ({}, {})",
            profile.name,
            profile.base_url,
            if profile.is_async() { "async" } else { "sync" }
        );

        Ok(Self {
            gateway: Gateway::new(transport),
            profile,
            ambiances: config.all_ambiances(),
        })
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn gateway(&self) -> &Gateway<ReqwestTransport> {
        &self.gateway
    }

    /// Catalogue entry by id, configured ambiances included
    pub fn ambiance(&self, id: &str) -> Option<&Ambiance> {
        self.ambiances.iter().find(|a| a.id == id)
    }

    /// Dispatch one generation request with the selected profile
    pub async fn generate(&self, request: &GenerationRequest) -> gateway_client::Result<Generation> {
        self.gateway.generate(request, &self.profile).await
    }

    /// Register a task issued by an earlier run so it can be polled
    pub fn resume(&self, task_id: &str) -> Result<PollableTask> {
        self.gateway
            .track(task_id, &self.profile)
            .context(format!("Cannot check task {} with '{}'", task_id, self.profile.name))
    }
}
