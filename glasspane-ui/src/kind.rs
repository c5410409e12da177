use crate::error::{UiError, UiResult};
use serde::{Deserialize, Serialize};

/// The closed set of element kinds provider content may create.
///
/// Anything not listed here (`script`, `iframe`, `object`, ...) is simply
/// not representable: requests for unknown tags are dropped before an
/// element ever enters a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    // Containers
    Div,
    Span,
    Section,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tr,
    Td,
    Th,
    Blockquote,
    // Text
    P,
    H1,
    H2,
    H3,
    H4,
    Pre,
    Code,
    Em,
    Strong,
    Label,
    A,
    // Interactive controls
    Button,
    Input,
    Textarea,
    Select,
    Option,
    Checkbox,
    Progress,
    // Media and separators
    Img,
    Hr,
    Br,
}

/// Every whitelisted kind, for exhaustive checks.
pub const ALL_KINDS: &[ElementKind] = &[
    ElementKind::Div,
    ElementKind::Span,
    ElementKind::Section,
    ElementKind::Ul,
    ElementKind::Ol,
    ElementKind::Li,
    ElementKind::Table,
    ElementKind::Thead,
    ElementKind::Tbody,
    ElementKind::Tr,
    ElementKind::Td,
    ElementKind::Th,
    ElementKind::Blockquote,
    ElementKind::P,
    ElementKind::H1,
    ElementKind::H2,
    ElementKind::H3,
    ElementKind::H4,
    ElementKind::Pre,
    ElementKind::Code,
    ElementKind::Em,
    ElementKind::Strong,
    ElementKind::Label,
    ElementKind::A,
    ElementKind::Button,
    ElementKind::Input,
    ElementKind::Textarea,
    ElementKind::Select,
    ElementKind::Option,
    ElementKind::Checkbox,
    ElementKind::Progress,
    ElementKind::Img,
    ElementKind::Hr,
    ElementKind::Br,
];

impl ElementKind {
    /// Look up a tag name against the whitelist. `None` for anything unknown.
    pub fn from_tag(tag: &str) -> Option<ElementKind> {
        match tag {
            "div" => Some(ElementKind::Div),
            "span" => Some(ElementKind::Span),
            "section" => Some(ElementKind::Section),
            "ul" => Some(ElementKind::Ul),
            "ol" => Some(ElementKind::Ol),
            "li" => Some(ElementKind::Li),
            "table" => Some(ElementKind::Table),
            "thead" => Some(ElementKind::Thead),
            "tbody" => Some(ElementKind::Tbody),
            "tr" => Some(ElementKind::Tr),
            "td" => Some(ElementKind::Td),
            "th" => Some(ElementKind::Th),
            "blockquote" => Some(ElementKind::Blockquote),
            "p" => Some(ElementKind::P),
            "h1" => Some(ElementKind::H1),
            "h2" => Some(ElementKind::H2),
            "h3" => Some(ElementKind::H3),
            "h4" => Some(ElementKind::H4),
            "pre" => Some(ElementKind::Pre),
            "code" => Some(ElementKind::Code),
            "em" => Some(ElementKind::Em),
            "strong" => Some(ElementKind::Strong),
            "label" => Some(ElementKind::Label),
            "a" => Some(ElementKind::A),
            "button" => Some(ElementKind::Button),
            "input" => Some(ElementKind::Input),
            "textarea" => Some(ElementKind::Textarea),
            "select" => Some(ElementKind::Select),
            "option" => Some(ElementKind::Option),
            "checkbox" => Some(ElementKind::Checkbox),
            "progress" => Some(ElementKind::Progress),
            "img" => Some(ElementKind::Img),
            "hr" => Some(ElementKind::Hr),
            "br" => Some(ElementKind::Br),
            _ => None,
        }
    }

    /// Strict variant of [`from_tag`](ElementKind::from_tag).
    pub fn parse(tag: &str) -> UiResult<ElementKind> {
        ElementKind::from_tag(tag).ok_or_else(|| UiError::UnknownKind {
            kind: tag.to_string(),
        })
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ElementKind::Div => "div",
            ElementKind::Span => "span",
            ElementKind::Section => "section",
            ElementKind::Ul => "ul",
            ElementKind::Ol => "ol",
            ElementKind::Li => "li",
            ElementKind::Table => "table",
            ElementKind::Thead => "thead",
            ElementKind::Tbody => "tbody",
            ElementKind::Tr => "tr",
            ElementKind::Td => "td",
            ElementKind::Th => "th",
            ElementKind::Blockquote => "blockquote",
            ElementKind::P => "p",
            ElementKind::H1 => "h1",
            ElementKind::H2 => "h2",
            ElementKind::H3 => "h3",
            ElementKind::H4 => "h4",
            ElementKind::Pre => "pre",
            ElementKind::Code => "code",
            ElementKind::Em => "em",
            ElementKind::Strong => "strong",
            ElementKind::Label => "label",
            ElementKind::A => "a",
            ElementKind::Button => "button",
            ElementKind::Input => "input",
            ElementKind::Textarea => "textarea",
            ElementKind::Select => "select",
            ElementKind::Option => "option",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Progress => "progress",
            ElementKind::Img => "img",
            ElementKind::Hr => "hr",
            ElementKind::Br => "br",
        }
    }

}
