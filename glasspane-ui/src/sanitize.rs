//! Property sanitizer: strips prototype-pollution keys, event-handler
//! attributes, executable-looking values, and non-finite numbers, and maps
//! a small set of camelCase style names to their native equivalents.
//!
//! Runs twice per element: at registry entry and again at the render
//! boundary.

use crate::element::Props;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

/// Maximum depth for nested property values. Cyclic structures cannot be
/// expressed in JSON, but converted provider payloads are cut here anyway.
pub const MAX_VALUE_DEPTH: usize = 20;

/// Maximum element tree depth at projection time.
pub const MAX_NESTING_DEPTH: usize = 20;

/// Keys dropped unconditionally, at every nesting level.
const FORBIDDEN_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Inline event-handler attributes: any `on`-prefixed name (`onclick`,
/// `onpointerdown`, `onanimationend`, ...). Events go through the
/// handler-id bridge instead; these never reach a native node. Matched by
/// prefix because renderers keep growing the event vocabulary.
fn is_event_handler_key(lower: &str) -> bool {
    let mut chars = lower.chars();
    chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn executable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(javascript|vbscript)\s*:|<\s*script").expect("static regex")
    })
}

/// True when a string value must not reach a native node.
pub fn is_executable_like(value: &str) -> bool {
    executable_re().is_match(value)
}

/// Map a provider attribute name to its native equivalent. Unknown names
/// pass through unchanged; extending the mapping is a code change.
fn map_attr_name(name: &str) -> &str {
    match name {
        "className" => "class",
        "backgroundColor" => "background-color",
        "fontSize" => "font-size",
        "fontWeight" => "font-weight",
        "fontFamily" => "font-family",
        "textAlign" => "text-align",
        "borderRadius" => "border-radius",
        "borderColor" => "border-color",
        "maxLength" => "maxlength",
        "readOnly" => "readonly",
        other => other,
    }
}

/// Sanitize a single value. `None` means the value is dropped entirely.
pub fn sanitize_value(value: &Value, depth: usize) -> Option<Value> {
    if depth > MAX_VALUE_DEPTH {
        return None;
    }
    match value {
        Value::Null | Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => {
            // serde_json cannot hold NaN/inf, but converted payloads are
            // checked again here.
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return None;
                }
            }
            Some(value.clone())
        }
        Value::String(s) => {
            if is_executable_like(s) {
                None
            } else {
                Some(value.clone())
            }
        }
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|v| sanitize_value(v, depth + 1))
                .collect(),
        )),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                if FORBIDDEN_KEYS.contains(&k.as_str()) {
                    warn!(key = %k, "dropping forbidden property key");
                    continue;
                }
                if let Some(clean) = sanitize_value(v, depth + 1) {
                    out.insert(k.clone(), clean);
                }
            }
            Some(Value::Object(out))
        }
    }
}

/// Sanitize a full property map: forbidden keys, event-handler attributes,
/// executable values, and depth overflows are dropped; surviving names are
/// mapped to their native spelling.
pub fn sanitize_props(props: &Props) -> Props {
    let mut out = Props::new();
    for (key, value) in props {
        let lower = key.to_ascii_lowercase();
        if FORBIDDEN_KEYS.contains(&lower.as_str()) {
            warn!(key = %key, "dropping forbidden property key");
            continue;
        }
        if is_event_handler_key(&lower) {
            warn!(key = %key, "dropping inline event handler attribute");
            continue;
        }
        match sanitize_value(value, 0) {
            Some(clean) => {
                out.insert(map_attr_name(key).to_string(), clean);
            }
            None => warn!(key = %key, "dropping non-representable property value"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props_from(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_proto_keys_dropped_recursively() {
        let props = props_from(json!({
            "title": "ok",
            "__proto__": {"polluted": true},
            "nested": {"constructor": 1, "keep": "yes"}
        }));
        let clean = sanitize_props(&props);
        assert!(clean.contains_key("title"));
        assert!(!clean.contains_key("__proto__"));
        assert_eq!(clean["nested"], json!({"keep": "yes"}));
    }

    #[test]
    fn test_event_handler_attributes_dropped() {
        let props = props_from(json!({"onclick": "steal()", "class": "card"}));
        let clean = sanitize_props(&props);
        assert!(!clean.contains_key("onclick"));
        assert!(clean.contains_key("class"));
    }

    #[test]
    fn test_any_on_prefixed_handler_attribute_dropped() {
        let props = props_from(json!({
            "onpointerdown": "stealData()",
            "ontouchstart": "stealData()",
            "onanimationend": "stealData()",
            "onwheel": "stealData()",
            "ONLOAD": "stealData()"
        }));
        let clean = sanitize_props(&props);
        assert!(clean.is_empty(), "inline handlers survived: {:?}", clean);
    }

    #[test]
    fn test_executable_values_dropped() {
        let props = props_from(json!({
            "href": "javascript:alert(1)",
            "src": "  JavaScript:void(0)",
            "body": "<script>boom()</script>",
            "label": "harmless"
        }));
        let clean = sanitize_props(&props);
        assert!(!clean.contains_key("href"));
        assert!(!clean.contains_key("src"));
        assert!(!clean.contains_key("body"));
        assert_eq!(clean["label"], json!("harmless"));
    }

    #[test]
    fn test_attr_names_mapped_to_native() {
        let props = props_from(json!({"className": "panel", "backgroundColor": "#111"}));
        let clean = sanitize_props(&props);
        assert_eq!(clean["class"], json!("panel"));
        assert_eq!(clean["background-color"], json!("#111"));
    }

    #[test]
    fn test_depth_overflow_dropped() {
        let mut value = json!("leaf");
        for _ in 0..(MAX_VALUE_DEPTH + 2) {
            value = json!({ "inner": value });
        }
        let props = props_from(json!({"deep": value, "flat": 1}));
        let clean = sanitize_props(&props);
        assert!(clean.contains_key("flat"));
        // The deep chain survives only down to the cutoff.
        let mut cursor = &clean["deep"];
        let mut depth = 0;
        while let Some(inner) = cursor.get("inner") {
            cursor = inner;
            depth += 1;
        }
        assert!(depth <= MAX_VALUE_DEPTH);
    }

    #[test]
    fn test_plain_values_pass_through() {
        let props = props_from(json!({"width": 320, "visible": true, "tags": ["a", "b"]}));
        let clean = sanitize_props(&props);
        assert_eq!(clean["width"], json!(320));
        assert_eq!(clean["visible"], json!(true));
        assert_eq!(clean["tags"], json!(["a", "b"]));
    }
}
