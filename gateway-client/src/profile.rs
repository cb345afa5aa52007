//! Static description of how to talk to one provider
//!
//! Everything provider-specific lives here as data: endpoints, credential,
//! defaults, the canonical-to-wire field map, and explicit JSON-pointer
//! extractors for the response. The gateway itself has no provider knowledge.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::form_urlencoded;
use std::time::Duration;

use crate::result::TaskStatus;

/// How the outbound body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Multipart,
}

/// Where the artifact sits in a provider response
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactSpec {
    /// Base64 string at a JSON pointer
    InlineBase64 { pointer: String },
    /// Download URL at a JSON pointer
    Url { pointer: String },
    /// Identifier at a JSON pointer, substituted into `template` at `{id}`
    UrlTemplate { pointer: String, template: String },
    /// The whole response body is the asset
    RawBody,
}

/// In-body success marker on a 2xx response
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Boolean at `pointer` must be true
    Flag { pointer: String },
    /// Integer at `pointer` must equal `ok`
    Code { pointer: String, ok: i64 },
}

/// Status endpoint description for asynchronous providers
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSpec {
    /// Path appended to the base URL; `{task_id}` is substituted
    pub path: String,
    pub timeout: Duration,
    /// Pointer to the provider's status string
    pub status_pointer: String,
    /// Provider vocabulary to canonical state; unlisted strings mean `Processing`
    pub table: BTreeMap<String, TaskStatus>,
    pub artifact: ArtifactSpec,
    /// Pointer to the failure reason reported with a failed task
    pub failure_pointer: Option<String>,
}

impl StatusSpec {
    /// Canonical state for a provider status string
    pub fn map_status(&self, raw: &str) -> TaskStatus {
        self.table
            .get(raw.trim())
            .copied()
            .unwrap_or(TaskStatus::Processing)
    }
}

/// Synchronous vs asynchronous provider behaviour
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    Sync(ArtifactSpec),
    Async {
        /// Pointer to the task id in the generation response
        task_id_pointer: String,
        status: StatusSpec,
    },
}

/// Default parameters attached to a named ambiance (or document type)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub prompt: Option<String>,
    pub style: Option<String>,
    pub title: Option<String>,
    pub negative_tags: Option<String>,
    pub description: Option<String>,
}

impl Template {
    /// Canonical parameters this template supplies
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        use crate::request::param;

        [
            (param::PROMPT, &self.prompt),
            (param::STYLE, &self.style),
            (param::TITLE, &self.title),
            (param::NEGATIVE_TAGS, &self.negative_tags),
            (param::DESCRIPTION, &self.description),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Fields set here win; gaps are filled from `base`
    pub fn over(&self, base: &Template) -> Template {
        Template {
            prompt: self.prompt.clone().or_else(|| base.prompt.clone()),
            style: self.style.clone().or_else(|| base.style.clone()),
            title: self.title.clone().or_else(|| base.title.clone()),
            negative_tags: self.negative_tags.clone().or_else(|| base.negative_tags.clone()),
            description: self.description.clone().or_else(|| base.description.clone()),
        }
    }

    /// Set one canonical parameter; names a template does not carry are ignored
    pub fn set(&mut self, name: &str, value: &str) {
        use crate::request::param;

        let slot = match name {
            param::PROMPT => &mut self.prompt,
            param::STYLE => &mut self.style,
            param::TITLE => &mut self.title,
            param::NEGATIVE_TAGS => &mut self.negative_tags,
            param::DESCRIPTION => &mut self.description,
            _ => return,
        };
        *slot = Some(value.to_string());
    }
}

/// Everything the gateway needs to call one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    /// Profile name used in logs and config
    pub name: String,
    /// Request kind this profile serves
    pub kind: String,
    pub base_url: String,
    /// Bearer token, if the provider needs one
    pub credential: Option<String>,
    pub generate_path: String,
    pub timeout: Duration,
    pub body: BodyEncoding,
    pub accept: Option<String>,
    /// Canonical parameters that must be supplied by the caller
    pub required: Vec<String>,
    /// Wire-level defaults, lowest precedence
    pub defaults: Map<String, Value>,
    /// Defaults used when the request names no known template
    pub fallback: Template,
    /// Named templates (ambiance id -> defaults), layered over `fallback`
    pub templates: BTreeMap<String, Template>,
    /// Canonical parameter that receives the ambiance id itself when no template matches
    pub unknown_ambiance_param: Option<String>,
    /// Canonical parameter name -> wire field name; unmapped parameters are dropped
    pub field_map: BTreeMap<String, String>,
    pub envelope: Option<Envelope>,
    /// Pointers tried in order for a provider error message
    pub error_pointers: Vec<String>,
    pub response: ResponseShape,
}

impl ProviderProfile {
    /// Minimal synchronous JSON profile; built-in providers refine it
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        base_url: impl Into<String>,
        generate_path: impl Into<String>,
        response: ResponseShape,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: None,
            generate_path: generate_path.into(),
            timeout: Duration::from_secs(30),
            body: BodyEncoding::Json,
            accept: None,
            required: Vec::new(),
            defaults: Map::new(),
            fallback: Template::default(),
            templates: BTreeMap::new(),
            unknown_ambiance_param: None,
            field_map: BTreeMap::new(),
            envelope: None,
            error_pointers: Vec::new(),
            response,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Map canonical names to identical wire names
    pub fn with_fields(mut self, names: &[&str]) -> Self {
        for name in names {
            self.field_map.insert(name.to_string(), name.to_string());
        }
        self
    }

    pub fn with_field(mut self, canonical: &str, wire: &str) -> Self {
        self.field_map.insert(canonical.to_string(), wire.to_string());
        self
    }

    pub fn with_default(mut self, wire: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(wire.to_string(), value.into());
        self
    }

    pub fn with_template(mut self, id: impl Into<String>, template: Template) -> Self {
        self.templates.insert(id.into(), template);
        self
    }

    pub fn is_async(&self) -> bool {
        matches!(self.response, ResponseShape::Async { .. })
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, self.generate_path)
    }

    /// Defaults for an ambiance id: its template over the fallback, or the
    /// fallback alone for ids this profile does not know
    pub fn template_for(&self, ambiance: Option<&str>) -> Template {
        match ambiance {
            Some(id) => match self.templates.get(id) {
                Some(template) => template.over(&self.fallback),
                None => {
                    let mut template = self.fallback.clone();
                    if let Some(name) = &self.unknown_ambiance_param {
                        template.set(name, id);
                    }
                    template
                }
            },
            None => self.fallback.clone(),
        }
    }

    /// Status URL for a task, if this profile polls; the id is percent-encoded
    pub fn status_url(&self, task_id: &str) -> Option<String> {
        match &self.response {
            ResponseShape::Async { status, .. } => {
                let encoded: String = form_urlencoded::byte_serialize(task_id.as_bytes()).collect();
                Some(format!(
                    "{}{}",
                    self.base_url,
                    status.path.replace("{task_id}", &encoded)
                ))
            }
            ResponseShape::Sync(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn async_profile() -> ProviderProfile {
        let mut table = BTreeMap::new();
        table.insert("done".to_string(), TaskStatus::Succeeded);
        ProviderProfile::new(
            "test",
            "music",
            "https://api.example.com/",
            "/generate",
            ResponseShape::Async {
                task_id_pointer: "/id".into(),
                status: StatusSpec {
                    path: "/tasks/{task_id}".into(),
                    timeout: Duration::from_secs(10),
                    status_pointer: "/status".into(),
                    table,
                    artifact: ArtifactSpec::Url {
                        pointer: "/url".into(),
                    },
                    failure_pointer: None,
                },
            },
        )
    }

    #[test]
    fn test_urls() {
        let profile = async_profile();
        assert_eq!(profile.generate_url(), "https://api.example.com/generate");
        assert_eq!(
            profile.status_url("abc").as_deref(),
            Some("https://api.example.com/tasks/abc")
        );
        assert!(profile.is_async());
    }

    #[test]
    fn test_status_url_escapes_task_id() {
        let profile = async_profile();
        assert_eq!(
            profile.status_url("abc&taskId=other").as_deref(),
            Some("https://api.example.com/tasks/abc%26taskId%3Dother")
        );
        assert_eq!(
            profile.status_url("a b#c").as_deref(),
            Some("https://api.example.com/tasks/a+b%23c")
        );
    }

    #[test]
    fn test_template_layers() {
        let mut profile = async_profile();
        profile.fallback = Template {
            prompt: Some("Calm music".into()),
            style: Some("Ambient".into()),
            title: Some("Custom Ambience".into()),
            ..Template::default()
        };
        profile.templates.insert(
            "rain".into(),
            Template {
                prompt: Some("Rain on glass".into()),
                ..Template::default()
            },
        );

        let rain = profile.template_for(Some("rain"));
        assert_eq!(rain.prompt.as_deref(), Some("Rain on glass"));
        assert_eq!(rain.title.as_deref(), Some("Custom Ambience"));

        let unknown = profile.template_for(Some("lofi-rooftop"));
        assert_eq!(unknown.prompt.as_deref(), Some("Calm music"));
        assert!(unknown.description.is_none());

        profile.unknown_ambiance_param = Some("description".into());
        let echoed = profile.template_for(Some("lofi-rooftop"));
        assert_eq!(echoed.description.as_deref(), Some("lofi-rooftop"));
        assert_eq!(profile.template_for(Some("rain")).description, None);
    }

    #[test]
    fn test_unmapped_status_is_processing() {
        let ResponseShape::Async { status, .. } = async_profile().response else {
            panic!("expected async profile");
        };
        assert_eq!(status.map_status("done"), TaskStatus::Succeeded);
        assert_eq!(status.map_status("WARMING_UP"), TaskStatus::Processing);
    }

    #[test]
    fn test_template_params_skip_missing() {
        let template = Template {
            prompt: Some("Rain".into()),
            style: Some("Ambient".into()),
            ..Template::default()
        };
        assert_eq!(
            template.params(),
            vec![("prompt", "Rain"), ("style", "Ambient")]
        );
    }
}
