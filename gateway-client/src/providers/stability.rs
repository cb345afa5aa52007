//! Stability AI text-to-audio (synchronous)
//!
//! Multipart request; with `Accept: application/json` the finished track comes
//! back base64-encoded in the `audio` field.

use std::time::Duration;

use crate::profile::{ArtifactSpec, BodyEncoding, ProviderProfile, ResponseShape};
use crate::request::param;

pub const STABILITY_API_URL: &str = "https://api.stability.ai";

const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the Stability profile
pub fn profile(base_url: &str, api_key: String) -> ProviderProfile {
    let mut profile = ProviderProfile::new(
        "stability",
        "sound",
        base_url,
        "/v2beta/audio/stable-audio-2/text-to-audio",
        ResponseShape::Sync(ArtifactSpec::InlineBase64 {
            pointer: "/audio".to_string(),
        }),
    )
    .with_credential(api_key)
    .with_timeout(GENERATE_TIMEOUT)
    .with_required(&[param::PROMPT])
    .with_fields(&[param::PROMPT, param::DURATION, param::OUTPUT_FORMAT])
    .with_default("model", "stable-audio-2")
    .with_default("duration", 60)
    .with_default("output_format", "mp3");

    profile.body = BodyEncoding::Multipart;
    profile.accept = Some("application/json".to_string());
    profile.error_pointers = vec![
        "/errors".to_string(),
        "/message".to_string(),
        "/name".to_string(),
    ];
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::build_body;
    use crate::request::GenerationRequest;
    use crate::transport::{FormPart, RequestBody};

    #[test]
    fn test_multipart_fields() {
        let profile = profile(STABILITY_API_URL, "key".to_string());
        let request = GenerationRequest::new("sound")
            .with_param(param::PROMPT, "Rain on a tin roof")
            .with_param(param::DURATION, 20u32)
            .with_param(param::STYLE, "ignored");

        let RequestBody::Multipart(parts) = build_body(&profile, &request) else {
            panic!("stability uses multipart");
        };
        let text = |name: &str| {
            parts.iter().find_map(|part| match part {
                FormPart::Text { name: n, value } if n == name => Some(value.clone()),
                _ => None,
            })
        };

        assert_eq!(text("prompt").as_deref(), Some("Rain on a tin roof"));
        assert_eq!(text("duration").as_deref(), Some("20"));
        assert_eq!(text("model").as_deref(), Some("stable-audio-2"));
        assert_eq!(text("output_format").as_deref(), Some("mp3"));
        assert!(text("style").is_none());
    }
}
