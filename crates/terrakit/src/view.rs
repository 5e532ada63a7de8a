//! Path-addressable read view over decoded JSON output.
//!
//! terraform addresses contain dots (`module.app.local_file.foo`), so paths
//! use [`KEYPATH_SEPARATOR`] instead: `"foo¬value"` reads the `value` field
//! of the `foo` output, while a key literally named `"a.b"` stays one
//! segment. Numeric segments index into arrays.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Separator between path segments.
pub const KEYPATH_SEPARATOR: char = '¬';

/// Read-only view over a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonView {
    value: Value,
}

impl JsonView {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Decode a JSON string.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self::new)
    }

    /// Look up a value by separator-delimited path. The empty path is the root.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.value);
        }
        path.split(KEYPATH_SEPARATOR)
            .try_fold(&self.value, |node, segment| step(node, segment))
    }

    /// Look up a value by pre-split segments.
    pub fn get_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        segments
            .iter()
            .try_fold(&self.value, |node, segment| step(node, segment.as_ref()))
    }

    /// Sub-view rooted at `path`.
    pub fn child(&self, path: &str) -> Option<JsonView> {
        self.get(path).cloned().map(Self::new)
    }

    /// Element `index` of a root array.
    pub fn at(&self, index: usize) -> Option<JsonView> {
        self.value.get(index).cloned().map(Self::new)
    }

    /// Whether `path` resolves.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// String at `path`.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Boolean at `path`.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Integer at `path`.
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Array at `path`.
    pub fn get_array(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(path).and_then(Value::as_array)
    }

    /// Keys of the root object.
    pub fn keys(&self) -> Vec<&str> {
        self.value
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of entries of the root object or array.
    pub fn len(&self) -> usize {
        match &self.value {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        }
    }

    /// Whether the root holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Take the underlying value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl From<Value> for JsonView {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for JsonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.value) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> JsonView {
        JsonView::new(json!({
            "outputs": {
                "example": {"value": {"content": "foo!"}, "sensitive": true}
            },
            "resources": [
                {
                    "type": "local_file",
                    "instances": [
                        {"attributes": {"content": "foo!", "filename": "./foo.bar"}}
                    ]
                }
            ],
            "local_file.foo": {"id": "abc"}
        }))
    }

    #[test]
    fn test_nested_mapping_path() {
        let view = state();
        assert_eq!(view.get_str("outputs¬example¬value¬content"), Some("foo!"));
        assert_eq!(view.get_bool("outputs¬example¬sensitive"), Some(true));
    }

    #[test]
    fn test_array_indexing() {
        let view = state();
        assert_eq!(
            view.get_str("resources¬0¬instances¬0¬attributes¬filename"),
            Some("./foo.bar")
        );
        assert!(view.get("resources¬7").is_none());
        assert!(view.get("resources¬first").is_none());
    }

    #[test]
    fn test_dotted_key_is_one_segment() {
        let view = state();
        assert_eq!(view.get_str("local_file.foo¬id"), Some("abc"));
        assert!(view.get("local_file¬foo").is_none());
    }

    #[test]
    fn test_child_and_at() {
        let resources = state().child("resources").unwrap();
        assert_eq!(resources.len(), 1);
        let first = resources.at(0).unwrap();
        assert_eq!(first.get_str("type"), Some("local_file"));
        assert!(resources.at(1).is_none());
    }

    #[test]
    fn test_root_and_keys() {
        let view = state();
        assert_eq!(view.get(""), Some(view.as_value()));
        assert_eq!(view.keys().len(), 3);
        assert!(view.contains("outputs"));
        assert!(!view.contains("missing"));
        assert!(JsonView::new(json!({})).is_empty());
    }

    #[test]
    fn test_get_segments_matches_get() {
        let view = state();
        assert_eq!(
            view.get_segments(&["outputs", "example", "value", "content"]),
            view.get("outputs¬example¬value¬content")
        );
    }

    #[test]
    fn test_display_is_pretty_json() {
        let view = JsonView::parse(r#"{"a":1}"#).unwrap();
        assert_eq!(view.to_string(), "{\n  \"a\": 1\n}");
    }
}
