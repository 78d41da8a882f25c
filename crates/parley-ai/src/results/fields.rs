//! Required/optional field extraction from loosely typed JSON.
//!
//! Numbers may arrive as JSON numbers or numeric strings; strings are
//! trimmed and empty strings count as missing.

use serde_json::{Map, Value};

pub(crate) fn object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// First present, non-empty string among `keys`.
pub(crate) fn string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

/// First present number among `keys`.
pub(crate) fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

pub(crate) fn boolean(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

pub(crate) fn array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_skips_blank_and_wrong_types() {
        let v = json!({"a": "  ", "b": 3, "c": " Oslo "});
        let obj = object(&v).unwrap();
        assert_eq!(string(obj, &["a", "b", "c"]).as_deref(), Some("Oslo"));
        assert_eq!(string(obj, &["a", "b"]), None);
    }

    #[test]
    fn number_accepts_numeric_strings() {
        let v = json!({"int": 4, "float": 2.5, "text": "7.25", "bad": "seven", "nan": "NaN"});
        let obj = object(&v).unwrap();
        assert_eq!(number(obj, &["int"]), Some(4.0));
        assert_eq!(number(obj, &["float"]), Some(2.5));
        assert_eq!(number(obj, &["text"]), Some(7.25));
        assert_eq!(number(obj, &["bad"]), None);
        assert_eq!(number(obj, &["nan"]), None);
    }

    #[test]
    fn array_uses_first_matching_key() {
        let v = json!({"items": [1, 2], "events": "nope"});
        let obj = object(&v).unwrap();
        assert_eq!(array(obj, &["events", "items"]).map(Vec::len), Some(2));
    }
}
