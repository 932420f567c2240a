//! HTTP dictionary source.
//!
//! The URL template may contain `{hint}` (URL-encoded query text, empty for
//! a full listing) and `{key}` (substituted when a dynamic dictionary is
//! built). The response must be a JSON array of items, or an object whose
//! `list` or `data` field is one.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{values_match, DictSource, ItemMapping};
use crate::cancel::AbortSignal;
use crate::error::ResolveError;
use crate::value::any_to_str;

pub struct RemoteSource {
    name: String,
    url: String,
    client: Client,
}

impl RemoteSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_client(name, url, Client::new())
    }

    pub fn with_client(name: impl Into<String>, url: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }

    pub fn url_for(&self, hint: Option<&str>) -> String {
        let hint = hint.unwrap_or_default();
        self.url.replace("{hint}", &urlencoding::encode(hint))
    }

    async fn fetch(&self, hint: Option<&str>) -> Result<Vec<Value>, ResolveError> {
        let url = self.url_for(hint);
        debug!(dict = %self.name, %url, "remote dictionary query");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ResolveError::Http {
                dict: self.name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(200).collect();
            return Err(ResolveError::query(&self.name, format!("{}: {}", status, truncated)));
        }

        let body: Value = response.json().await.map_err(|source| ResolveError::Http {
            dict: self.name.clone(),
            source,
        })?;
        extract_list(&self.name, body)
    }
}

fn extract_list(dict: &str, body: Value) -> Result<Vec<Value>, ResolveError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("list").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ResolveError::invalid_response(dict, "object without a list or data array")),
        },
        other => Err(ResolveError::invalid_response(
            dict,
            format!("expected an array, got {}", any_to_str(&other)),
        )),
    }
}

#[async_trait]
impl DictSource for RemoteSource {
    async fn get_item(
        &self,
        value: &Value,
        mapping: &ItemMapping,
    ) -> Result<Option<Value>, ResolveError> {
        let text = any_to_str(value);
        let list = self.fetch(Some(&text)).await?;
        Ok(list
            .into_iter()
            .find(|raw| values_match(mapping.value_of(raw), value)))
    }

    async fn query(
        &self,
        hint: Option<&str>,
        _mapping: &ItemMapping,
        signal: &AbortSignal,
    ) -> Result<Vec<Value>, ResolveError> {
        tokio::select! {
            biased;
            _ = signal.aborted() => Err(ResolveError::query(&self.name, "request aborted")),
            result = self.fetch(hint) => result,
        }
    }
}
