//! Suno music generation (asynchronous)
//!
//! `POST /api/v1/generate` answers with a task id; the track is fetched later
//! from `GET /api/v1/generate/record-info`.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::ambiance;
use crate::profile::{
    ArtifactSpec, Envelope, ProviderProfile, ResponseShape, StatusSpec, Template,
};
use crate::request::param;
use crate::result::TaskStatus;

pub const SUNO_API_URL: &str = "https://api.sunoapi.org";
pub const DEFAULT_CALLBACK_URL: &str = "https://webhook.site/gen-ambiance";

const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WEIGHT: f64 = 0.65;

/// Suno's task vocabulary
fn status_table() -> BTreeMap<String, TaskStatus> {
    [
        ("PENDING", TaskStatus::Queued),
        ("TEXT_SUCCESS", TaskStatus::Processing),
        ("FIRST_SUCCESS", TaskStatus::Processing),
        ("SUCCESS", TaskStatus::Succeeded),
        ("CREATE_TASK_FAILED", TaskStatus::Failed),
        ("GENERATE_AUDIO_FAILED", TaskStatus::Failed),
        ("CALLBACK_EXCEPTION", TaskStatus::Failed),
        ("SENSITIVE_WORD_ERROR", TaskStatus::Failed),
    ]
    .into_iter()
    .map(|(raw, status)| (raw.to_string(), status))
    .collect()
}

/// Build the Suno profile
pub fn profile(base_url: &str, api_key: String, callback_url: &str) -> ProviderProfile {
    let status = StatusSpec {
        path: "/api/v1/generate/record-info?taskId={task_id}".to_string(),
        timeout: STATUS_TIMEOUT,
        status_pointer: "/data/status".to_string(),
        table: status_table(),
        artifact: ArtifactSpec::Url {
            pointer: "/data/response/sunoData/0/audioUrl".to_string(),
        },
        failure_pointer: Some("/data/errorMessage".to_string()),
    };

    let mut profile = ProviderProfile::new(
        "suno",
        "music",
        base_url,
        "/api/v1/generate",
        ResponseShape::Async {
            task_id_pointer: "/data/taskId".to_string(),
            status,
        },
    )
    .with_credential(api_key)
    .with_timeout(GENERATE_TIMEOUT)
    .with_required(&[param::AMBIANCE])
    .with_fields(&[param::PROMPT, param::STYLE, param::TITLE])
    .with_field(param::NEGATIVE_TAGS, "negativeTags")
    .with_field(param::STYLE_WEIGHT, "styleWeight")
    .with_field(param::WEIRDNESS_CONSTRAINT, "weirdnessConstraint")
    .with_field(param::AUDIO_WEIGHT, "audioWeight")
    .with_default("customMode", true)
    .with_default("instrumental", true)
    .with_default("model", "V3_5")
    .with_default("styleWeight", DEFAULT_WEIGHT)
    .with_default("weirdnessConstraint", DEFAULT_WEIGHT)
    .with_default("audioWeight", DEFAULT_WEIGHT)
    .with_default("callBackUrl", callback_url);

    profile.fallback = Template {
        prompt: Some("Calm and relaxing instrumental music".to_string()),
        style: Some("Ambient".to_string()),
        title: Some("Custom Ambience".to_string()),
        negative_tags: Some("Vocals".to_string()),
        description: None,
    };
    for entry in ambiance::builtin() {
        profile.templates.insert(entry.id.clone(), entry.template());
    }

    profile.envelope = Some(Envelope::Code {
        pointer: "/code".to_string(),
        ok: 200,
    });
    profile.error_pointers = vec!["/msg".to_string(), "/error".to_string()];
    profile
}
