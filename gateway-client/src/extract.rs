//! Provider response interpretation
//!
//! Every lookup goes through the explicit pointers carried by the profile.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::profile::{ArtifactSpec, Envelope, ProviderProfile, ResponseShape, StatusSpec};
use crate::result::{Artifact, Generation, PollableTask, StatusObservation, TaskStatus};
use crate::transport::HttpResponse;

/// Longest provider body quoted verbatim in an error message
const MAX_QUOTED_BODY: usize = 500;

/// Interpret the response to a generation call
pub fn interpret_generation(profile: &ProviderProfile, response: &HttpResponse) -> Result<Generation> {
    if !response.is_success() {
        return Err(provider_error(profile, response));
    }

    match &profile.response {
        ResponseShape::Sync(ArtifactSpec::RawBody) => {
            raw_artifact(profile, response).map(Generation::Completed)
        }
        ResponseShape::Sync(spec) => {
            let body = parse_json(profile, response)?;
            check_envelope(profile, &body)?;
            extract_artifact(profile, spec, &body).map(Generation::Completed)
        }
        ResponseShape::Async {
            task_id_pointer, ..
        } => {
            let body = parse_json(profile, response)?;
            check_envelope(profile, &body)?;
            let task_id = scalar_text(&body, task_id_pointer).ok_or_else(|| {
                GatewayError::malformed(format!(
                    "{} response has no task id at {}",
                    profile.name, task_id_pointer
                ))
            })?;
            Ok(Generation::Pending(PollableTask::queued(task_id)))
        }
    }
}

/// Interpret the response to a status check
pub fn interpret_status(
    profile: &ProviderProfile,
    spec: &StatusSpec,
    task_id: &str,
    response: &HttpResponse,
) -> Result<StatusObservation> {
    if response.status == 404 {
        return Err(GatewayError::NotFound(format!(
            "{} does not know task {}",
            profile.name, task_id
        )));
    }
    if !response.is_success() {
        return Err(provider_error(profile, response));
    }

    let body = parse_json(profile, response)?;
    check_envelope(profile, &body)?;

    let raw = scalar_text(&body, &spec.status_pointer).unwrap_or_default();
    let status = spec.map_status(&raw);

    let observation = match status {
        TaskStatus::Succeeded => StatusObservation {
            status,
            artifact: Some(extract_artifact(profile, &spec.artifact, &body)?),
            message: None,
        },
        TaskStatus::Failed => StatusObservation {
            status,
            artifact: None,
            message: Some(
                spec.failure_pointer
                    .as_deref()
                    .and_then(|p| scalar_text(&body, p))
                    .unwrap_or_else(|| {
                        format!("{} reported task {} as {}", profile.name, task_id, raw)
                    }),
            ),
        },
        TaskStatus::Queued | TaskStatus::Processing => StatusObservation {
            status,
            artifact: None,
            message: None,
        },
    };
    Ok(observation)
}

/// Build a provider error from a non-2xx response; the message is never empty
pub fn provider_error(profile: &ProviderProfile, response: &HttpResponse) -> GatewayError {
    let from_json = response.json().and_then(|body| {
        profile
            .error_pointers
            .iter()
            .find_map(|pointer| scalar_text(&body, pointer))
    });

    let message = from_json
        .or_else(|| {
            let text = response.text();
            (!text.is_empty()).then(|| truncate(&text))
        })
        .unwrap_or_else(|| {
            format!(
                "{} returned HTTP {} without details",
                profile.name, response.status
            )
        });

    GatewayError::ProviderError {
        message,
        status_code: Some(response.status),
    }
}

fn parse_json(profile: &ProviderProfile, response: &HttpResponse) -> Result<Value> {
    response.json().ok_or_else(|| {
        GatewayError::malformed(format!("{} returned a body that is not JSON", profile.name))
    })
}

fn check_envelope(profile: &ProviderProfile, body: &Value) -> Result<()> {
    let ok = match &profile.envelope {
        None => true,
        Some(Envelope::Flag { pointer }) => body.pointer(pointer).and_then(Value::as_bool) == Some(true),
        Some(Envelope::Code { pointer, ok }) => body.pointer(pointer).and_then(Value::as_i64) == Some(*ok),
    };
    if ok {
        return Ok(());
    }

    let message = profile
        .error_pointers
        .iter()
        .find_map(|pointer| scalar_text(body, pointer))
        .unwrap_or_else(|| format!("{} reported an unsuccessful generation", profile.name));
    Err(GatewayError::malformed(message))
}

fn extract_artifact(profile: &ProviderProfile, spec: &ArtifactSpec, body: &Value) -> Result<Artifact> {
    let missing = |pointer: &str| {
        GatewayError::malformed(format!(
            "{} response has no artifact at {}",
            profile.name, pointer
        ))
    };

    match spec {
        ArtifactSpec::InlineBase64 { pointer } => {
            let encoded = scalar_text(body, pointer).ok_or_else(|| missing(pointer.as_str()))?;
            let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                GatewayError::malformed(format!("{} returned invalid base64: {}", profile.name, e))
            })?;
            if bytes.is_empty() {
                return Err(missing(pointer.as_str()));
            }
            Ok(Artifact::Inline {
                bytes,
                content_type: None,
            })
        }
        ArtifactSpec::Url { pointer } => scalar_text(body, pointer)
            .map(Artifact::Url)
            .ok_or_else(|| missing(pointer.as_str())),
        ArtifactSpec::UrlTemplate { pointer, template } => scalar_text(body, pointer)
            .map(|id| Artifact::Url(template.replace("{id}", &id)))
            .ok_or_else(|| missing(pointer.as_str())),
        ArtifactSpec::RawBody => Err(GatewayError::malformed(format!(
            "{} cannot read a raw body from a JSON document",
            profile.name
        ))),
    }
}

fn raw_artifact(profile: &ProviderProfile, response: &HttpResponse) -> Result<Artifact> {
    if response.body.is_empty() {
        return Err(GatewayError::malformed(format!(
            "{} returned an empty body",
            profile.name
        )));
    }
    Ok(Artifact::Inline {
        bytes: response.body.clone(),
        content_type: response.content_type.clone(),
    })
}

/// Non-empty string or number at a pointer, as text
fn scalar_text(body: &Value, pointer: &str) -> Option<String> {
    match body.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .find(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_QUOTED_BODY {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_QUOTED_BODY).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn json_response(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string().into_bytes(),
        }
    }

    fn sync_profile(spec: ArtifactSpec) -> ProviderProfile {
        let mut profile = ProviderProfile::new(
            "sync",
            "music",
            "https://sync.example",
            "/gen",
            ResponseShape::Sync(spec),
        );
        profile.error_pointers = vec!["/error/message".into(), "/errors".into()];
        profile
    }

    fn status_spec() -> StatusSpec {
        let mut table = BTreeMap::new();
        table.insert("PENDING".to_string(), TaskStatus::Queued);
        table.insert("SUCCESS".to_string(), TaskStatus::Succeeded);
        table.insert("FAILED".to_string(), TaskStatus::Failed);
        StatusSpec {
            path: "/status/{task_id}".into(),
            timeout: Duration::from_secs(10),
            status_pointer: "/status".into(),
            table,
            artifact: ArtifactSpec::Url {
                pointer: "/sunoData/0/audioUrl".into(),
            },
            failure_pointer: Some("/errorMessage".into()),
        }
    }

    #[test]
    fn test_inline_base64_artifact() {
        let profile = sync_profile(ArtifactSpec::InlineBase64 {
            pointer: "/audio_base64".into(),
        });
        let generation =
            interpret_generation(&profile, &json_response(200, json!({"audio_base64": "Zm9v"})))
                .unwrap();
        let Generation::Completed(artifact) = generation else {
            panic!("expected completed generation");
        };
        assert_eq!(artifact.bytes(), Some(b"foo".as_slice()));
    }

    #[test]
    fn test_url_template_artifact() {
        let profile = sync_profile(ArtifactSpec::UrlTemplate {
            pointer: "/data/generation_id".into(),
            template: "http://localhost:5001/api/audio/{id}".into(),
        });
        let generation = interpret_generation(
            &profile,
            &json_response(200, json!({"data": {"generation_id": "g-42"}})),
        )
        .unwrap();
        assert_eq!(
            generation,
            Generation::Completed(Artifact::Url("http://localhost:5001/api/audio/g-42".into()))
        );
    }

    #[test]
    fn test_raw_body_artifact() {
        let profile = sync_profile(ArtifactSpec::RawBody);
        let response = HttpResponse {
            status: 200,
            content_type: Some("audio/mpeg".into()),
            body: vec![0xff, 0xfb, 0x90],
        };
        let Generation::Completed(artifact) = interpret_generation(&profile, &response).unwrap()
        else {
            panic!("expected completed generation");
        };
        assert_eq!(
            artifact,
            Artifact::Inline {
                bytes: vec![0xff, 0xfb, 0x90],
                content_type: Some("audio/mpeg".into()),
            }
        );
    }

    #[test]
    fn test_error_status_regardless_of_body() {
        let profile = sync_profile(ArtifactSpec::Url {
            pointer: "/url".into(),
        });
        let bodies = [
            json_response(400, json!({"error": {"message": "prompt too long"}})),
            json_response(500, json!({"url": "https://x/y.mp3"})),
            HttpResponse {
                status: 502,
                content_type: None,
                body: Vec::new(),
            },
        ];

        for response in bodies {
            let err = interpret_generation(&profile, &response).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ProviderError);
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_message_sources() {
        let profile = sync_profile(ArtifactSpec::RawBody);

        let err = provider_error(
            &profile,
            &json_response(400, json!({"errors": ["duration must be <= 190"]})),
        );
        assert_eq!(
            err.to_string(),
            "Provider error (HTTP 400): duration must be <= 190"
        );

        let err = provider_error(
            &profile,
            &HttpResponse {
                status: 503,
                content_type: None,
                body: b"Service Unavailable".to_vec(),
            },
        );
        assert!(err.to_string().ends_with("Service Unavailable"));

        let err = provider_error(
            &profile,
            &HttpResponse {
                status: 500,
                content_type: None,
                body: Vec::new(),
            },
        );
        assert!(err.to_string().contains("returned HTTP 500 without details"));
    }

    #[test]
    fn test_malformed_success_body() {
        let profile = sync_profile(ArtifactSpec::InlineBase64 {
            pointer: "/audio".into(),
        });
        let cases = [
            json_response(200, json!({"audio": ""})),
            json_response(200, json!({"other": "Zm9v"})),
            json_response(200, json!({"audio": "***"})),
            HttpResponse {
                status: 200,
                content_type: None,
                body: b"not json".to_vec(),
            },
        ];
        for response in cases {
            let err = interpret_generation(&profile, &response).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ProviderError);
        }
    }

    #[test]
    fn test_envelope_flag() {
        let mut profile = sync_profile(ArtifactSpec::Url {
            pointer: "/data/url".into(),
        });
        profile.envelope = Some(Envelope::Flag {
            pointer: "/success".into(),
        });
        profile.error_pointers = vec!["/error".into()];

        let err = interpret_generation(
            &profile,
            &json_response(200, json!({"success": false, "error": "model not loaded"})),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Provider error: model not loaded");

        assert!(
            interpret_generation(
                &profile,
                &json_response(200, json!({"success": true, "data": {"url": "u"}})),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_async_task_id() {
        let profile = ProviderProfile::new(
            "async",
            "music",
            "https://async.example",
            "/gen",
            ResponseShape::Async {
                task_id_pointer: "/taskId".into(),
                status: status_spec(),
            },
        );

        let generation =
            interpret_generation(&profile, &json_response(200, json!({"taskId": "abc123"})))
                .unwrap();
        let Generation::Pending(task) = generation else {
            panic!("expected pending generation");
        };
        assert_eq!(task.task_id, "abc123");
        assert_eq!(task.status, TaskStatus::Queued);

        let err = interpret_generation(&profile, &json_response(200, json!({"id": "x"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError);
    }

    #[test]
    fn test_status_observations() {
        let profile = sync_profile(ArtifactSpec::RawBody);
        let spec = status_spec();

        let obs = interpret_status(
            &profile,
            &spec,
            "abc123",
            &json_response(
                200,
                json!({"status": "SUCCESS", "sunoData": [{"audioUrl": "https://x/y.mp3"}]}),
            ),
        )
        .unwrap();
        assert_eq!(obs.status, TaskStatus::Succeeded);
        assert_eq!(obs.artifact, Some(Artifact::Url("https://x/y.mp3".into())));

        let obs = interpret_status(
            &profile,
            &spec,
            "abc123",
            &json_response(200, json!({"status": "FAILED"})),
        )
        .unwrap();
        assert_eq!(obs.status, TaskStatus::Failed);
        assert_eq!(
            obs.message.as_deref(),
            Some("sync reported task abc123 as FAILED")
        );

        let obs = interpret_status(
            &profile,
            &spec,
            "abc123",
            &json_response(200, json!({"status": "MIXING_STEMS"})),
        )
        .unwrap();
        assert_eq!(obs.status, TaskStatus::Processing);
    }

    #[test]
    fn test_status_not_found() {
        let profile = sync_profile(ArtifactSpec::RawBody);
        let err = interpret_status(
            &profile,
            &status_spec(),
            "gone",
            &json_response(404, json!({})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
