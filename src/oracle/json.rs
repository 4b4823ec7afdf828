//! JSON extraction from adversarial oracle output.
//!
//! Model responses that should be JSON routinely arrive wrapped in markdown
//! fences, prefixed with prose, or malformed. Extraction runs in three
//! stages: strict parse, first brace/bracket match, quoted-string scrape
//! (arrays only).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*").expect("valid regex"))
}

fn object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

fn array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*?\]").expect("valid regex"))
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("valid regex"))
}

/// Strips markdown code fences from a response.
fn strip_fences(text: &str) -> String {
    fence_re().replace_all(text, "").to_string()
}

/// Extracts a JSON object from oracle output.
///
/// Tries a strict parse of the fence-stripped text, then the first
/// `{...}` span. Returns `None` when no object can be recovered; callers
/// substitute their stage's typed default.
#[must_use]
pub fn extract_object(text: &str) -> Option<Value> {
    let cleaned = strip_fences(text);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(m) = object_re().find(&cleaned) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}

/// Extracts a JSON array of strings from oracle output.
///
/// Tries a strict parse, then the first `[...]` span, then falls back to
/// scraping all quoted strings. Non-string array entries are dropped.
/// Returns an empty vector when nothing can be recovered.
#[must_use]
pub fn extract_string_array(text: &str) -> Vec<String> {
    let cleaned = strip_fences(text);

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(cleaned.trim()) {
        return strings_of(items);
    }

    if let Some(m) = array_re().find(&cleaned) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(m.as_str()) {
            return strings_of(items);
        }
    }

    quoted_re()
        .captures_iter(&cleaned)
        .map(|c| c[1].to_string())
        .collect()
}

fn strings_of(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_object() {
        let value = extract_object(r#"{"is_grounded": true, "follow_up_queries": []}"#).unwrap();
        assert_eq!(value["is_grounded"], true);
    }

    #[test]
    fn test_object_in_markdown_fence() {
        let text = "```json\n{\"reasoning\": \"check auth\"}\n```";
        let value = extract_object(text).unwrap();
        assert_eq!(value["reasoning"], "check auth");
    }

    #[test]
    fn test_object_with_surrounding_prose() {
        let text = "Here is my plan:\n{\"search_queries\": [\"login handler\"]}\nHope that helps!";
        let value = extract_object(text).unwrap();
        assert_eq!(value["search_queries"][0], "login handler");
    }

    #[test]
    fn test_unparseable_object_is_none() {
        assert!(extract_object("not json").is_none());
        assert!(extract_object("").is_none());
        assert!(extract_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_strict_array() {
        let items = extract_string_array(r#"["query one", "query two"]"#);
        assert_eq!(items, vec!["query one", "query two"]);
    }

    #[test]
    fn test_array_in_fence_with_prose() {
        let text = "Sure!\n```json\n[\"auth middleware\", \"token check\"]\n```";
        let items = extract_string_array(text);
        assert_eq!(items, vec!["auth middleware", "token check"]);
    }

    #[test]
    fn test_array_scrapes_quoted_strings_as_last_resort() {
        let text = r#"The queries are "session setup" and "cookie parsing"."#;
        let items = extract_string_array(text);
        assert_eq!(items, vec!["session setup", "cookie parsing"]);
    }

    #[test]
    fn test_array_drops_non_strings() {
        let items = extract_string_array(r#"["keep", 42, null, "this"]"#);
        assert_eq!(items, vec!["keep", "this"]);
    }

    #[test]
    fn test_array_empty_on_garbage() {
        assert!(extract_string_array("no arrays here").is_empty());
    }
}
