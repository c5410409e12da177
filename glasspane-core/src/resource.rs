use serde::{Deserialize, Serialize};

/// Content mode tag of a [`UiResource`]. `Unknown` catches tags this build
/// does not support; the classifier turns it into a fallback display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Markup,
    ExternalReference,
    ScriptedProgram,
    Unknown,
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "markup" => ContentType::Markup,
            "external_reference" => ContentType::ExternalReference,
            "scripted_program" => ContentType::ScriptedProgram,
            _ => ContentType::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Provider-supplied interactive content, immutable once delivered to a
/// rendering session. `capabilities` lists the host operations the
/// provider declared for this resource; the guard copies the set at
/// session start and never reads it again from provider-influenced state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiResource {
    pub uri: String,
    pub content_type: ContentType,
    pub payload: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_hints: Option<RenderHints>,
}

impl UiResource {
    pub fn new(uri: impl Into<String>, content_type: ContentType, payload: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content_type,
            payload: payload.into(),
            capabilities: Vec::new(),
            render_hints: None,
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }
}

/// Extract `scheme://host[:port]` from a URL, without trailing path.
/// Used to scope an external-reference surface to its own origin only.
pub fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let scheme = &url[..scheme_end];
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
        return None;
    }
    let rest = &url[scheme_end + 3..];
    let host = rest.split(['/', '?', '#']).next()?;
    if host.is_empty() {
        return None;
    }
    Some(format!("{}://{}", scheme, host))
}
