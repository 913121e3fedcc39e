#![deny(missing_docs)]

//! # JSON Pointer Utilities
//!
//! Builds, splits and follows the `/`-delimited pointers used both as `$ref`
//! targets and as the identity of every resolved schema node.
//!
//! Pointers may carry a leading `#` (fragment form). Helpers that derive a new
//! pointer from an existing one keep whatever prefix the input had.
//!
//! These utilities never fetch external documents, but allow absolute or
//! relative references to be treated as local when the document part matches
//! the current document's `$self` URI.

use crate::error::{AppError, AppResult};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;
use std::fmt::Display;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

const NAMED_DEFINITION_PATTERN: &str = r"^#/components/schemas/[^/]+$";

/// Escapes a single segment (`~` → `~0`, `/` → `~1`).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decodes a JSON Pointer segment: percent-encoding first, then `~1` and `~0`.
pub fn decode_pointer_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8_lossy()
        .replace("~1", "/")
        .replace("~0", "~")
}

/// Splits a pointer into its decoded segments. `""` and `"#"` address the root.
pub fn parse(pointer: &str) -> Vec<String> {
    let body = pointer.strip_prefix('#').unwrap_or(pointer);
    if body.is_empty() {
        return Vec::new();
    }
    body.strip_prefix('/')
        .unwrap_or(body)
        .split('/')
        .map(decode_pointer_segment)
        .collect()
}

/// Joins segments into a pointer (`/a/b`), escaping each one.
pub fn compile<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Display,
{
    segments
        .into_iter()
        .map(|s| format!("/{}", escape_segment(&s.to_string())))
        .collect()
}

/// Appends segments to an existing pointer.
pub fn join<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Display,
{
    let mut tokens = parse(base);
    tokens.extend(segments.into_iter().map(|s| s.to_string()));
    with_prefix_of(base, compile(tokens))
}

/// Returns the `from_end`-th segment counted from the end (1 = last).
pub fn base_name(pointer: &str, from_end: usize) -> Option<String> {
    let mut tokens = parse(pointer);
    let idx = tokens.len().checked_sub(from_end)?;
    if idx >= tokens.len() {
        return None;
    }
    Some(tokens.swap_remove(idx))
}

/// Strips the last `levels` segments.
pub fn dir_name(pointer: &str, levels: usize) -> String {
    let tokens = parse(pointer);
    let keep = tokens.len().saturating_sub(levels);
    with_prefix_of(pointer, compile(&tokens[..keep]))
}

/// Follows `pointer` from `document`.
///
/// Sequences are indexed by decimal segments. Any missing step fails with
/// [`AppError::PointerNotFound`].
pub fn get<'a>(document: &'a Value, pointer: &str) -> AppResult<&'a Value> {
    let mut current = document;
    for segment in parse(pointer) {
        let next = match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| AppError::PointerNotFound(pointer.to_string()))?;
    }
    Ok(current)
}

/// Whether the pointer denotes a named definition (`#/components/schemas/{name}`)
/// rather than an inline location.
pub fn is_named_definition(pointer: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(NAMED_DEFINITION_PATTERN).ok())
        .as_ref()
        .map(|re| re.is_match(pointer))
        .unwrap_or(false)
}

/// Normalizes a `$ref` to a local pointer (e.g. `#/components/...`) if it targets the
/// current document as identified by `$self`.
///
/// Returns `None` if the reference is external or lacks a fragment.
pub(crate) fn normalize_ref_to_local(ref_str: &str, self_uri: Option<&str>) -> Option<String> {
    if ref_str.starts_with('#') {
        return Some(ref_str.to_string());
    }
    if ref_str.starts_with('/') {
        return Some(format!("#{}", ref_str));
    }

    let (document, fragment) = ref_str.split_once('#')?;
    if document.is_empty() {
        return Some(format!("#{}", fragment));
    }
    let self_uri = self_uri?;
    if ref_doc_matches_self(document, self_uri) {
        return Some(format!("#{}", fragment));
    }
    None
}

fn with_prefix_of(original: &str, body: String) -> String {
    if original.starts_with('#') {
        format!("#{}", body)
    } else {
        body
    }
}

fn ref_doc_matches_self(ref_doc: &str, self_uri: &str) -> bool {
    if ref_doc == self_uri {
        return true;
    }

    if let (Ok(ref_url), Ok(self_url)) = (Url::parse(ref_doc), Url::parse(self_uri)) {
        return ref_url.scheme() == self_url.scheme()
            && ref_url.host() == self_url.host()
            && ref_url.port() == self_url.port()
            && ref_url.path() == self_url.path();
    }

    // If `$self` is an absolute-path reference (e.g. "/api/openapi"), compare path.
    if self_uri.starts_with('/') {
        if let Ok(ref_url) = Url::parse(ref_doc) {
            return ref_url.path() == self_uri;
        }
    }

    if !self_uri.contains("://") && !ref_doc.contains("://") {
        return Path::new(ref_doc) == Path::new(self_uri);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_escapes_and_parse_round_trips() {
        let segments = ["a", "b~c", "d/e"];
        let pointer = compile(segments);
        assert_eq!(pointer, "/a/b~0c/d~1e");

        let back: Vec<String> = pointer
            .trim_start_matches('/')
            .split('/')
            .map(decode_pointer_segment)
            .collect();
        assert_eq!(back, vec!["a", "b~c", "d/e"]);
        assert_eq!(parse(&pointer), back);
    }

    #[test]
    fn test_percent_escapes_decode_before_tilde_escapes() {
        assert_eq!(decode_pointer_segment("a%7E1b"), "a/b");
        assert_eq!(decode_pointer_segment("%7E0x"), "~x");
        assert_eq!(decode_pointer_segment("with%20space"), "with space");
    }

    #[test]
    fn test_compile_accepts_indices() {
        assert_eq!(join("#/components/schemas/Pet", ["oneOf"]), "#/components/schemas/Pet/oneOf");
        assert_eq!(join("#/x/oneOf", [3]), "#/x/oneOf/3");
        assert_eq!(join("", ["properties", "a/b"]), "/properties/a~1b");
    }

    #[test]
    fn test_get_walks_maps_and_sequences() {
        let doc = json!({"a": {"b c": [10, {"d": true}]}});
        assert_eq!(get(&doc, "#/a/b%20c/1/d").unwrap(), &json!(true));
        assert_eq!(get(&doc, "/a/b c/0").unwrap(), &json!(10));
        assert_eq!(get(&doc, "#").unwrap(), &doc);
    }

    #[test]
    fn test_get_missing_segment_fails() {
        let doc = json!({"a": [1]});
        let err = get(&doc, "#/a/5").unwrap_err();
        assert!(matches!(err, AppError::PointerNotFound(p) if p == "#/a/5"));
        assert!(get(&doc, "#/a/0/deeper").is_err());
    }

    #[test]
    fn test_base_and_dir_name() {
        let p = "#/components/schemas/Pet~1Dog";
        assert_eq!(base_name(p, 1).as_deref(), Some("Pet/Dog"));
        assert_eq!(base_name(p, 2).as_deref(), Some("schemas"));
        assert_eq!(base_name(p, 9), None);
        assert_eq!(base_name(p, 0), None);
        assert_eq!(dir_name(p, 1), "#/components/schemas");
        assert_eq!(dir_name("/a/b/c", 2), "/a");
        assert_eq!(dir_name("#/a", 5), "#");
    }

    #[test]
    fn test_named_definition() {
        assert!(is_named_definition("#/components/schemas/Pet"));
        assert!(!is_named_definition("#/components/schemas/Pet/properties/id"));
        assert!(!is_named_definition("#/paths/~1pets/get"));
        assert!(!is_named_definition(""));
    }

    #[test]
    fn test_normalize_ref_local_passthrough() {
        let normalized = normalize_ref_to_local("#/components/schemas/User", None).unwrap();
        assert_eq!(normalized, "#/components/schemas/User");
    }

    #[test]
    fn test_normalize_ref_self_absolute_match() {
        let self_uri = Some("https://example.com/openapi.yaml");
        let ref_str = "https://example.com/openapi.yaml#/components/schemas/User";
        let normalized = normalize_ref_to_local(ref_str, self_uri).unwrap();
        assert_eq!(normalized, "#/components/schemas/User");
    }

    #[test]
    fn test_normalize_ref_external_is_none() {
        let self_uri = Some("https://example.com/openapi.yaml");
        assert!(normalize_ref_to_local("other.yaml#/components/schemas/User", self_uri).is_none());
        assert!(normalize_ref_to_local("other.yaml#/x", None).is_none());
    }
}
