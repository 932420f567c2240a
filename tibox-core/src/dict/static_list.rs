//! Static list source - fixed in-memory options

use async_trait::async_trait;
use serde_json::Value;

use super::{values_match, DictSource, ItemMapping};
use crate::cancel::AbortSignal;
use crate::error::ResolveError;
use crate::value::any_to_str;

/// In-memory option set. Hints filter case-insensitively on value or text.
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    items: Vec<Value>,
}

impl StaticOptions {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

#[async_trait]
impl DictSource for StaticOptions {
    async fn get_item(
        &self,
        value: &Value,
        mapping: &ItemMapping,
    ) -> Result<Option<Value>, ResolveError> {
        Ok(self
            .items
            .iter()
            .find(|raw| values_match(mapping.value_of(raw), value))
            .cloned())
    }

    async fn query(
        &self,
        hint: Option<&str>,
        mapping: &ItemMapping,
        _signal: &AbortSignal,
    ) -> Result<Vec<Value>, ResolveError> {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());
        let Some(hint) = hint else {
            return Ok(self.items.clone());
        };
        let needle = hint.to_lowercase();
        Ok(self
            .items
            .iter()
            .filter(|raw| {
                any_to_str(mapping.value_of(raw)).to_lowercase().contains(&needle)
                    || mapping.text_of(raw).to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cities() -> StaticOptions {
        StaticOptions::new(vec![
            json!({"value": "bj", "text": "Beijing"}),
            json!({"value": "sh", "text": "Shanghai"}),
            json!({"value": "gz", "text": "Guangzhou"}),
        ])
    }

    #[tokio::test]
    async fn query_without_hint_enumerates() {
        let list = cities()
            .query(None, &ItemMapping::default(), &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn query_filters_on_value_or_text() {
        let src = cities();
        let mapping = ItemMapping::default();
        let list = src.query(Some("SHANG"), &mapping, &AbortSignal::never()).await.unwrap();
        assert_eq!(list, vec![json!({"value": "sh", "text": "Shanghai"})]);

        let list = src.query(Some("gz"), &mapping, &AbortSignal::never()).await.unwrap();
        assert_eq!(list.len(), 1);

        let list = src.query(Some("  "), &mapping, &AbortSignal::never()).await.unwrap();
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn get_item_by_value() {
        let src = cities();
        let mapping = ItemMapping::default();
        assert!(src.get_item(&json!("bj"), &mapping).await.unwrap().is_some());
        assert!(src.get_item(&json!("Beijing"), &mapping).await.unwrap().is_none());
    }
}
