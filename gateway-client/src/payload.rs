//! Request validation and provider payload mapping

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::profile::{BodyEncoding, ProviderProfile};
use crate::request::{GenerationRequest, OutputFormat, param};
use crate::transport::{FormPart, RequestBody};

/// Reject anything the provider call would not accept, before touching the network
pub fn validate(profile: &ProviderProfile, request: &GenerationRequest) -> Result<()> {
    if request.kind() != profile.kind {
        return Err(GatewayError::InvalidRequest(format!(
            "Profile '{}' serves '{}' requests, got '{}'",
            profile.name,
            profile.kind,
            request.kind()
        )));
    }

    for name in &profile.required {
        if request.param(name).is_none() {
            return Err(GatewayError::InvalidRequest(format!(
                "Missing required parameter '{}' for profile '{}'",
                name, profile.name
            )));
        }
    }

    for name in param::WEIGHTS {
        if let Some(value) = request.param(name) {
            match value.as_f64() {
                Some(w) if (0.0..=1.0).contains(&w) => {}
                _ => {
                    return Err(GatewayError::InvalidRequest(format!(
                        "Parameter '{}' must be a number between 0 and 1",
                        name
                    )));
                }
            }
        }
    }

    if let Some(value) = request.param(param::DURATION) {
        match value.as_f64() {
            Some(d) if d > 0.0 && d.fract() == 0.0 => {}
            _ => {
                return Err(GatewayError::InvalidRequest(
                    "Parameter 'duration' must be a positive whole number of seconds".to_string(),
                ));
            }
        }
    }

    if let Some(value) = request.param(param::OUTPUT_FORMAT) {
        let format = value.as_str().ok_or_else(|| {
            GatewayError::InvalidRequest("Parameter 'output_format' must be text".to_string())
        })?;
        format.parse::<OutputFormat>()?;
    }

    if request.file().is_some() && profile.body != BodyEncoding::Multipart {
        return Err(GatewayError::InvalidRequest(format!(
            "Profile '{}' does not accept file uploads",
            profile.name
        )));
    }

    Ok(())
}

/// Wire-level fields: profile defaults, then the matching template, then the caller's values
pub fn merge_fields(profile: &ProviderProfile, request: &GenerationRequest) -> Map<String, Value> {
    let mut fields = profile.defaults.clone();

    let template = profile.template_for(request.text(param::AMBIANCE));

    for (name, value) in template.params() {
        if let Some(wire) = profile.field_map.get(name) {
            fields.insert(wire.clone(), Value::String(value.to_string()));
        }
    }

    for (name, value) in request.params() {
        if value.is_blank() {
            continue;
        }
        if let Some(wire) = profile.field_map.get(name) {
            fields.insert(wire.clone(), value.to_json());
        }
    }

    fields
}

/// Encode the merged fields the way the provider expects
pub fn build_body(profile: &ProviderProfile, request: &GenerationRequest) -> RequestBody {
    let fields = merge_fields(profile, request);

    match profile.body {
        BodyEncoding::Json => RequestBody::Json(Value::Object(fields)),
        BodyEncoding::Multipart => {
            let mut parts: Vec<FormPart> = fields
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| FormPart::Text {
                    name,
                    value: match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                })
                .collect();

            if let Some(file) = request.file() {
                parts.push(FormPart::File {
                    name: file.field.clone(),
                    file_name: file.file_name.clone(),
                    content_type: file.content_type.clone(),
                    bytes: file.bytes.clone(),
                });
            }
            RequestBody::Multipart(parts)
        }
    }
}
