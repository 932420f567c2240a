//! Helpers over logical box values.
//!
//! Values are plain `serde_json::Value`s. `Null` plays the part of an
//! undefined value: an empty box, or a value rejected by a dictionary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render any value as the text a user would see in the box.
pub fn any_to_str(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Dotted-path lookup (`"a.b.0.c"`) into nested objects and arrays.
pub fn get_path<'a>(vars: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = vars;
    for seg in path.split('.').filter(|s| !s.is_empty()) {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(list) => list.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// True when the value counts as "present" for dictionary keys:
/// not null, not an empty string, not `false`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        _ => true,
    }
}

/// Trim a value. Scalars are stringified first; `Null` becomes `""`.
pub fn trim_value(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::String(s) => Value::String(s.trim().to_string()),
        v @ (Value::Bool(_) | Value::Number(_)) => Value::String(any_to_str(&v).trim().to_string()),
        other => other,
    }
}

/// Text case applied to committed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Upper,
    Lower,
    Camel,
    Snake,
    Kebab,
    /// Title Case ("Start Case")
    Start,
}

impl CaseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Camel => "camel",
            Self::Snake => "snake",
            Self::Kebab => "kebab",
            Self::Start => "start",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            "camel" => Some(Self::Camel),
            "snake" => Some(Self::Snake),
            "kebab" => Some(Self::Kebab),
            "start" => Some(Self::Start),
            _ => None,
        }
    }

    /// Apply the case to a string.
    pub fn apply_str(&self, s: &str) -> String {
        match self {
            Self::Upper => s.to_uppercase(),
            Self::Lower => s.to_lowercase(),
            Self::Camel => {
                let mut out = String::new();
                for (i, word) in split_words(s).iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
            Self::Snake => join_lower(s, "_"),
            Self::Kebab => join_lower(s, "-"),
            Self::Start => split_words(s)
                .iter()
                .map(|w| capitalize(w))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Apply the case to a value. Null, arrays and objects pass through.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply_str(&s)),
            v @ (Value::Bool(_) | Value::Number(_)) => Value::String(self.apply_str(&any_to_str(&v))),
            other => other,
        }
    }
}

fn join_lower(s: &str, sep: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split on separators and lower→upper camel boundaries.
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_any_to_str() {
        assert_eq!(any_to_str(&Value::Null), "");
        assert_eq!(any_to_str(&json!("abc")), "abc");
        assert_eq!(any_to_str(&json!(42)), "42");
        assert_eq!(any_to_str(&json!(true)), "true");
        assert_eq!(any_to_str(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_get_path() {
        let vars = json!({"a": {"b": [{"c": "deep"}]}, "k": "v"});
        assert_eq!(get_path(&vars, "k"), Some(&json!("v")));
        assert_eq!(get_path(&vars, "a.b.0.c"), Some(&json!("deep")));
        assert_eq!(get_path(&vars, "a.x"), None);
        assert_eq!(get_path(&vars, "k.z"), None);
    }

    #[test]
    fn test_trim_value() {
        assert_eq!(trim_value(json!("  hi ")), json!("hi"));
        assert_eq!(trim_value(Value::Null), json!(""));
        assert_eq!(trim_value(json!(12)), json!("12"));
        assert_eq!(trim_value(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_case_modes() {
        assert_eq!(CaseMode::Upper.apply_str("hello"), "HELLO");
        assert_eq!(CaseMode::Lower.apply_str("HeLLo"), "hello");
        assert_eq!(CaseMode::Camel.apply_str("hello big_world"), "helloBigWorld");
        assert_eq!(CaseMode::Snake.apply_str("helloBigWorld"), "hello_big_world");
        assert_eq!(CaseMode::Kebab.apply_str("Hello Big World"), "hello-big-world");
        assert_eq!(CaseMode::Start.apply_str("hello-big world"), "Hello Big World");
    }

    #[test]
    fn test_case_mode_parse() {
        assert_eq!(CaseMode::from_str("UPPER"), Some(CaseMode::Upper));
        assert_eq!(CaseMode::from_str("nope"), None);
        assert_eq!(CaseMode::Kebab.as_str(), "kebab");
    }
}
