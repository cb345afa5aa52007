//! Local MusicGen server (synchronous)
//!
//! The server renders the track before answering and serves it from
//! `/api/audio/{generation_id}`.

use std::time::Duration;

use crate::ambiance;
use crate::profile::{ArtifactSpec, Envelope, ProviderProfile, ResponseShape, Template};
use crate::request::param;

pub const MUSICGEN_URL: &str = "http://localhost:5001";

// Rendering happens inside the request
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Build the MusicGen profile
pub fn profile(base_url: &str) -> ProviderProfile {
    let base_url = base_url.trim_end_matches('/');
    let mut profile = ProviderProfile::new(
        "musicgen",
        "music",
        base_url,
        "/api/generate",
        ResponseShape::Sync(ArtifactSpec::UrlTemplate {
            pointer: "/data/generation_id".to_string(),
            template: format!("{}/api/audio/{{id}}", base_url),
        }),
    )
    .with_timeout(GENERATE_TIMEOUT)
    .with_required(&[param::AMBIANCE])
    .with_field(param::AMBIANCE, "ambiance")
    .with_field(param::DESCRIPTION, "customDescription")
    .with_field(param::PROMPT, "customDescription")
    .with_field(param::DURATION, "duration");

    // Unknown ambiances are described by their own id
    profile.unknown_ambiance_param = Some(param::DESCRIPTION.to_string());
    for entry in ambiance::builtin() {
        profile.templates.insert(
            entry.id.clone(),
            Template {
                description: entry.description.clone(),
                ..Template::default()
            },
        );
    }

    profile.envelope = Some(Envelope::Flag {
        pointer: "/success".to_string(),
    });
    profile.error_pointers = vec!["/error".to_string()];
    profile
}
