//! Dictionaries: queryable sources of valid options for a box value.
//!
//! A [`Dict`] pairs a [`DictSource`] (where raw items come from) with an
//! [`ItemMapping`] (which fields of a raw item hold its value, text, icon
//! and tip). Dictionaries never cache; that is the source's business.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::cancel::AbortSignal;
use crate::error::ResolveError;
use crate::value::any_to_str;

pub mod registry;
#[cfg(feature = "remote")]
pub mod remote;
pub mod static_list;

pub use registry::{DictName, DictRegistry, DictSetup, DynamicFactory, OptionsSpec};
#[cfg(feature = "remote")]
pub use remote::RemoteSource;
pub use static_list::StaticOptions;

/// One normalized dictionary entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictItem {
    pub value: Value,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Field names used to read a raw item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemMapping {
    pub value: String,
    pub text: String,
    pub icon: String,
    pub tip: String,
}

impl Default for ItemMapping {
    fn default() -> Self {
        Self {
            value: "value".into(),
            text: "text".into(),
            icon: "icon".into(),
            tip: "tip".into(),
        }
    }
}

impl ItemMapping {
    /// The logical value of a raw item. Scalars are their own value.
    pub fn value_of<'a>(&self, raw: &'a Value) -> &'a Value {
        match raw {
            Value::Object(map) => map.get(&self.value).unwrap_or(&Value::Null),
            other => other,
        }
    }

    /// Display text of a raw item, falling back to its value.
    pub fn text_of(&self, raw: &Value) -> String {
        match raw {
            Value::Object(map) => match map.get(&self.text) {
                Some(text) if !text.is_null() => any_to_str(text),
                _ => any_to_str(self.value_of(raw)),
            },
            other => any_to_str(other),
        }
    }

    fn optional_str(&self, raw: &Value, key: &str) -> Option<String> {
        raw.get(key).filter(|v| !v.is_null()).map(any_to_str)
    }

    pub fn to_item(&self, raw: &Value) -> DictItem {
        DictItem {
            value: self.value_of(raw).clone(),
            text: self.text_of(raw),
            icon: self.optional_str(raw, &self.icon),
            tip: self.optional_str(raw, &self.tip),
        }
    }
}

/// Loose equality used for exact-match lookups: identical JSON, or two
/// scalars whose text forms agree (typed `"1"` matches stored `1`).
pub fn values_match(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    let scalar = |v: &Value| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_));
    scalar(a) && scalar(b) && any_to_str(a) == any_to_str(b)
}

/// Where raw dictionary items come from.
///
/// Implementations must tolerate concurrent read-only calls from many
/// boxes and should stop work once `signal` is aborted.
#[async_trait]
pub trait DictSource: Send + Sync {
    /// Exact lookup. `Ok(None)` means "not found", not a failure.
    async fn get_item(
        &self,
        value: &Value,
        mapping: &ItemMapping,
    ) -> Result<Option<Value>, ResolveError>;

    /// Candidate list, filtered source-side when `hint` is given.
    async fn query(
        &self,
        hint: Option<&str>,
        mapping: &ItemMapping,
        signal: &AbortSignal,
    ) -> Result<Vec<Value>, ResolveError>;
}

/// A named dictionary ready to be shared across boxes.
#[derive(Clone)]
pub struct Dict {
    name: String,
    source: Arc<dyn DictSource>,
    mapping: ItemMapping,
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dict")
            .field("name", &self.name)
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl Dict {
    pub fn new(name: impl Into<String>, source: Arc<dyn DictSource>) -> Self {
        Self {
            name: name.into(),
            source,
            mapping: ItemMapping::default(),
        }
    }

    /// Static dictionary over an in-memory option list.
    pub fn from_items(name: impl Into<String>, items: Vec<Value>) -> Self {
        Self::new(name, Arc::new(StaticOptions::new(items)))
    }

    pub fn with_mapping(mut self, mapping: ItemMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &ItemMapping {
        &self.mapping
    }

    /// Resolve a raw value to its dictionary item.
    #[instrument(level = "debug", skip(self), fields(dict = %self.name))]
    pub async fn resolve_exact(&self, value: &Value) -> Result<Option<DictItem>, ResolveError> {
        if value.is_null() {
            return Ok(None);
        }
        let raw = self.source.get_item(value, &self.mapping).await?;
        Ok(raw.map(|r| self.mapping.to_item(&r)))
    }

    /// Raw candidates for a tip list.
    #[instrument(level = "debug", skip(self, signal), fields(dict = %self.name))]
    pub async fn query_list(
        &self,
        hint: Option<&str>,
        signal: &AbortSignal,
    ) -> Result<Vec<Value>, ResolveError> {
        self.source.query(hint, &self.mapping, signal).await
    }

    pub fn to_item(&self, raw: &Value) -> DictItem {
        self.mapping.to_item(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_reads_objects_and_scalars() {
        let mapping = ItemMapping::default();
        let item = mapping.to_item(&json!({"value": "a", "text": "Alpha", "icon": "zmdi-a"}));
        assert_eq!(item.value, json!("a"));
        assert_eq!(item.text, "Alpha");
        assert_eq!(item.icon.as_deref(), Some("zmdi-a"));
        assert_eq!(item.tip, None);

        let item = mapping.to_item(&json!(7));
        assert_eq!(item.value, json!(7));
        assert_eq!(item.text, "7");
    }

    #[test]
    fn custom_mapping() {
        let mapping = ItemMapping {
            value: "id".into(),
            text: "title".into(),
            ..ItemMapping::default()
        };
        let item = mapping.to_item(&json!({"id": 3, "title": "Three"}));
        assert_eq!(item.value, json!(3));
        assert_eq!(item.text, "Three");

        // Missing text falls back to the value
        let item = mapping.to_item(&json!({"id": 4}));
        assert_eq!(item.text, "4");
    }

    #[test]
    fn loose_value_match() {
        assert!(values_match(&json!("1"), &json!(1)));
        assert!(values_match(&json!("a"), &json!("a")));
        assert!(!values_match(&json!("a"), &json!("b")));
        assert!(!values_match(&json!([1]), &json!("[1]")));
    }

    #[tokio::test]
    async fn resolve_exact_null_is_none() {
        let dict = Dict::from_items("Letters", vec![json!({"value": "a", "text": "Alpha"})]);
        assert_eq!(dict.resolve_exact(&Value::Null).await.unwrap(), None);
        let item = dict.resolve_exact(&json!("a")).await.unwrap().unwrap();
        assert_eq!(item.text, "Alpha");
        assert_eq!(dict.resolve_exact(&json!("b")).await.unwrap(), None);
    }
}
