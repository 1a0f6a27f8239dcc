//! Typed access to tool parameters.
//!
//! Assistants send loosely typed JSON: numbers as strings, lists as comma
//! separated text, nested JSON as strings.  [`Params`] accepts those forms
//! and reports anything else as [`AdapterError::InvalidParams`].

use serde_json::Value;

use crate::error::{AdapterError, Result};

/// Borrowed view over a tool's JSON arguments.
#[derive(Clone, Copy)]
pub struct Params<'a> {
    tool: &'a str,
    value: &'a Value,
}

impl<'a> Params<'a> {
    pub fn new(tool: &'a str, value: &'a Value) -> Self {
        Self { tool, value }
    }

    /// Build an [`AdapterError::InvalidParams`] for this tool.
    pub fn invalid(&self, reason: impl Into<String>) -> AdapterError {
        AdapterError::InvalidParams {
            tool_name: self.tool.to_string(),
            reason: reason.into(),
        }
    }

    /// The raw argument, if supplied.
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        self.value.get(field)
    }

    /// A required, non-empty string.
    pub fn required_str(&self, field: &str) -> Result<&'a str> {
        self.str(field)
            .ok_or_else(|| self.invalid(format!("missing required string field `{field}`")))
    }

    /// An optional string; empty or whitespace-only counts as absent.
    pub fn str(&self, field: &str) -> Option<&'a str> {
        self.value
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// An optional integer, accepting JSON numbers and numeric strings.
    pub fn i64(&self, field: &str) -> Result<Option<i64>> {
        match self.value.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| self.invalid(format!("`{field}` must be an integer"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("`{field}` must be an integer, got `{s}`"))),
            Some(_) => Err(self.invalid(format!("`{field}` must be an integer"))),
        }
    }

    /// A page size: `default` when absent, clamped to `1..=max`.
    pub fn limit(&self, field: &str, default: i64, max: i64) -> Result<i64> {
        Ok(self.i64(field)?.unwrap_or(default).clamp(1, max))
    }

    /// A pagination offset, never negative.
    pub fn offset(&self, field: &str) -> Result<i64> {
        Ok(self.i64(field)?.unwrap_or(0).max(0))
    }

    /// An optional flag, `false` when absent.
    pub fn flag(&self, field: &str) -> Result<bool> {
        match self.value.get(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                _ => Err(self.invalid(format!("`{field}` must be a boolean, got `{s}`"))),
            },
            Some(_) => Err(self.invalid(format!("`{field}` must be a boolean"))),
        }
    }

    /// An optional list of ids: a JSON array of strings or comma separated
    /// text.  An empty list counts as absent.
    pub fn string_list(&self, field: &str) -> Result<Option<Vec<String>>> {
        let items: Vec<String> = match self.value.get(field) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(self.invalid(format!("`{field}` must be a list of strings"))),
                })
                .collect::<Result<_>>()?,
            Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
            Some(_) => return Err(self.invalid(format!("`{field}` must be a list of strings"))),
        };
        let items: Vec<String> = items.into_iter().filter(|s| !s.is_empty()).collect();
        Ok(if items.is_empty() { None } else { Some(items) })
    }

    /// An optional JSON document, given inline or as a JSON string.
    pub fn json(&self, field: &str) -> Result<Option<Value>> {
        match self.value.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => serde_json::from_str(s)
                .map(Some)
                .map_err(|e| self.invalid(format!("invalid JSON in `{field}`: {e}"))),
            Some(other) => Ok(Some(other.clone())),
        }
    }

    /// A required JSON document.
    pub fn required_json(&self, field: &str) -> Result<Value> {
        self.json(field)?
            .ok_or_else(|| self.invalid(format!("missing required JSON field `{field}`")))
    }
}

/// Truncate `text` to at most `max` characters (no ellipsis).
pub fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn required_str_rejects_missing_and_blank() {
        let value = json!({"a": "x", "b": "  "});
        let p = Params::new("tool", &value);
        assert_eq!(p.required_str("a").unwrap(), "x");
        assert!(p.required_str("b").unwrap_err().to_string().contains("`b`"));
        assert!(p.required_str("c").is_err());
    }

    #[test]
    fn integers_accept_numbers_and_strings() {
        let value = json!({"n": 7, "s": "12", "f": 3.9, "bad": "x", "obj": {}});
        let p = Params::new("tool", &value);
        assert_eq!(p.i64("n").unwrap(), Some(7));
        assert_eq!(p.i64("s").unwrap(), Some(12));
        assert_eq!(p.i64("f").unwrap(), Some(3));
        assert_eq!(p.i64("missing").unwrap(), None);
        assert!(p.i64("bad").is_err());
        assert!(p.i64("obj").is_err());
    }

    #[test]
    fn limit_and_offset_clamp() {
        let value = json!({"big": 500, "neg": -4});
        let p = Params::new("tool", &value);
        assert_eq!(p.limit("big", 10, 50).unwrap(), 50);
        assert_eq!(p.limit("neg", 10, 50).unwrap(), 1);
        assert_eq!(p.limit("missing", 10, 50).unwrap(), 10);
        assert_eq!(p.offset("neg").unwrap(), 0);
    }

    #[test]
    fn flags_accept_bool_like_strings() {
        let value = json!({"a": true, "b": "yes", "c": "nope"});
        let p = Params::new("tool", &value);
        assert!(p.flag("a").unwrap());
        assert!(p.flag("b").unwrap());
        assert!(!p.flag("missing").unwrap());
        assert!(p.flag("c").is_err());
    }

    #[test]
    fn string_lists_from_arrays_or_csv() {
        let value = json!({"arr": ["a", " b ", ""], "csv": "x, y", "empty": [], "bad": [{}]});
        let p = Params::new("tool", &value);
        assert_eq!(p.string_list("arr").unwrap(), Some(vec!["a".into(), "b".into()]));
        assert_eq!(p.string_list("csv").unwrap(), Some(vec!["x".into(), "y".into()]));
        assert_eq!(p.string_list("empty").unwrap(), None);
        assert!(p.string_list("bad").is_err());
    }

    #[test]
    fn json_accepts_inline_or_encoded() {
        let value = json!({
            "inline": [{"address": "a@b.c"}],
            "encoded": "{\"name\":\"Jo\"}",
            "broken": "{nope"
        });
        let p = Params::new("tool", &value);
        assert_eq!(p.json("inline").unwrap().unwrap()[0]["address"], "a@b.c");
        assert_eq!(p.json("encoded").unwrap().unwrap()["name"], "Jo");
        assert!(p.json("broken").unwrap_err().to_string().contains("invalid JSON"));
        assert!(p.required_json("missing").is_err());
    }

    #[test]
    fn clip_counts_characters() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("hi", 10), "hi");
    }
}
