use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::GatewayError;

/// Canonical parameter names understood by every profile
pub mod param {
    pub const AMBIANCE: &str = "ambiance";
    pub const PROMPT: &str = "prompt";
    pub const STYLE: &str = "style";
    pub const TITLE: &str = "title";
    pub const NEGATIVE_TAGS: &str = "negative_tags";
    pub const DESCRIPTION: &str = "description";
    pub const STYLE_WEIGHT: &str = "style_weight";
    pub const WEIRDNESS_CONSTRAINT: &str = "weirdness_constraint";
    pub const AUDIO_WEIGHT: &str = "audio_weight";
    pub const DURATION: &str = "duration";
    pub const OUTPUT_FORMAT: &str = "output_format";

    /// Parameters constrained to the closed range [0, 1]
    pub const WEIGHTS: [&str; 3] = [STYLE_WEIGHT, WEIRDNESS_CONSTRAINT, AUDIO_WEIGHT];
}

/// A single named request parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Blank strings are treated as if the parameter had not been supplied
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Flag(_) => None,
        }
    }

    /// JSON representation for JSON-bodied providers
    pub fn to_json(&self) -> Value {
        match self {
            Self::Flag(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Number(n) => serde_json::json!(n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// File uploaded alongside a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    /// Form field name the provider expects
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Normalized generation request.
///
/// Built once with the `with_*` methods; the gateway only ever borrows it, so a
/// dispatched request cannot change.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    kind: String,
    client_id: String,
    params: BTreeMap<String, ParamValue>,
    file: Option<FileBlob>,
}

impl GenerationRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            client_id: "anonymous".to_string(),
            params: BTreeMap::new(),
            file: None,
        }
    }

    /// Identifier used only in log lines
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, file: FileBlob) -> Self {
        self.file = Some(file);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    /// A supplied, non-blank parameter
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name).filter(|v| !v.is_blank())
    }

    /// A supplied, non-blank text parameter
    pub fn text(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(ParamValue::as_str)
    }

    pub fn file(&self) -> Option<&FileBlob> {
        self.file.as_ref()
    }
}

/// Audio container requested from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    Wav,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            other => Err(GatewayError::InvalidRequest(format!(
                "Unsupported output format '{}' (expected mp3 or wav)",
                other
            ))),
        }
    }
}

/// The options a UI or CLI caller can set.
///
/// Deserializing from a loose JSON object ignores keys that are not listed here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default, alias = "ambiance", alias = "docType")]
    pub ambiance_or_doc_type: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub negative_tags: Option<String>,
    #[serde(default)]
    pub style_weight: Option<f64>,
    #[serde(default)]
    pub weirdness_constraint: Option<f64>,
    #[serde(default)]
    pub audio_weight: Option<f64>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
}

impl GenerationOptions {
    pub fn new(ambiance_or_doc_type: impl Into<String>) -> Self {
        Self {
            ambiance_or_doc_type: ambiance_or_doc_type.into(),
            ..Self::default()
        }
    }

    /// Convert into a request of the given kind under canonical parameter names
    pub fn into_request(self, kind: impl Into<String>) -> GenerationRequest {
        let mut request = GenerationRequest::new(kind)
            .with_param(param::AMBIANCE, self.ambiance_or_doc_type);

        let texts = [
            (param::PROMPT, self.prompt),
            (param::STYLE, self.style),
            (param::TITLE, self.title),
            (param::NEGATIVE_TAGS, self.negative_tags),
        ];
        for (name, value) in texts {
            if let Some(value) = value {
                request = request.with_param(name, value);
            }
        }

        let weights = [
            (param::STYLE_WEIGHT, self.style_weight),
            (param::WEIRDNESS_CONSTRAINT, self.weirdness_constraint),
            (param::AUDIO_WEIGHT, self.audio_weight),
        ];
        for (name, value) in weights {
            if let Some(value) = value {
                request = request.with_param(name, value);
            }
        }

        if let Some(duration) = self.duration {
            request = request.with_param(param::DURATION, duration);
        }
        if let Some(format) = self.output_format {
            request = request.with_param(param::OUTPUT_FORMAT, format.as_str());
        }

        request
    }
}
