//! Value input: a box's dictionary plus its processor pipeline.
//!
//! `tidy` commits text to a value; `translate` turns a value back into
//! text for display.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::collab::{I18nText, NoI18n};
use crate::config::BoxConfig;
use crate::dict::{Dict, DictItem, DictRegistry};
use crate::error::{ConfigError, ProcessingError, ResolveError};
use crate::pipeline::{builtin, DictMembership, Stage, ToCase, Trim, ValuePipeline, ValueProcessor};
use crate::value::any_to_str;

/// Result of translating a value for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Translation {
    /// `None` when the value has no acceptable text (e.g. not in a
    /// must-in-options dictionary).
    pub text: Option<String>,
    pub item: Option<DictItem>,
    /// The dictionary could not be reached and `text` is the raw value.
    pub fallback: bool,
}

pub struct ValueInput {
    dict: Option<Arc<Dict>>,
    pipeline: ValuePipeline,
    must_in_options: bool,
    i18n: Arc<dyn I18nText>,
}

impl ValueInput {
    pub fn new(dict: Option<Arc<Dict>>, pipeline: ValuePipeline, must_in_options: bool) -> Self {
        Self {
            dict,
            pipeline,
            must_in_options,
            i18n: Arc::new(NoI18n),
        }
    }

    /// Build the dictionary and processor stages a config asks for.
    ///
    /// `head`/`tail` are caller processors appended after any built-in
    /// processors named in the config's before/after lists.
    pub fn from_config(
        config: &BoxConfig,
        registry: &DictRegistry,
        head: Vec<Arc<dyn ValueProcessor>>,
        tail: Vec<Arc<dyn ValueProcessor>>,
    ) -> Result<Self, ConfigError> {
        let vars = config.dict_vars_or_empty();
        let dict = match &config.options {
            Some(options) => Some(registry.build(options, &vars)?),
            None => None,
        };
        if config.must_in_options && dict.is_none() {
            debug!("mustInOptions set without options; dict stage stays empty");
        }

        let mut pipeline = ValuePipeline::new();
        for name in &config.before_processors {
            pipeline.push(Stage::Head, builtin(name)?);
        }
        for p in head {
            pipeline.push(Stage::Head, p);
        }
        if config.trimed {
            pipeline.push(Stage::Main, Arc::new(Trim));
        }
        if let Some(mode) = config.value_case {
            pipeline.push(Stage::Main, Arc::new(ToCase(mode)));
        }
        if let (true, Some(dict)) = (config.must_in_options, &dict) {
            pipeline.push(Stage::Dict, Arc::new(DictMembership::new(dict.clone())));
        }
        for name in &config.after_processors {
            pipeline.push(Stage::Tail, builtin(name)?);
        }
        for p in tail {
            pipeline.push(Stage::Tail, p);
        }

        Ok(Self::new(dict, pipeline, config.must_in_options))
    }

    pub fn with_i18n(mut self, i18n: Arc<dyn I18nText>) -> Self {
        self.i18n = i18n;
        self
    }

    pub fn dict(&self) -> Option<&Arc<Dict>> {
        self.dict.as_ref()
    }

    pub fn pipeline(&self) -> &ValuePipeline {
        &self.pipeline
    }

    pub fn must_in_options(&self) -> bool {
        self.must_in_options
    }

    pub fn i18n(&self) -> &Arc<dyn I18nText> {
        &self.i18n
    }

    pub async fn tidy(&self, value: Value, stages: &[Stage]) -> Result<Value, ProcessingError> {
        self.pipeline.tidy(value, stages).await
    }

    /// Text for a value: the dictionary item's text when one matches;
    /// otherwise nothing (must-in-options) or the raw value as text.
    pub async fn translate(&self, value: &Value) -> Result<Translation, ResolveError> {
        let Some(dict) = &self.dict else {
            return Ok(Translation {
                text: Some(any_to_str(value)),
                item: None,
                fallback: false,
            });
        };
        match dict.resolve_exact(value).await? {
            Some(mut item) => {
                item.text = self.i18n.text(&item.text);
                item.tip = item.tip.map(|t| self.i18n.text(&t));
                Ok(Translation {
                    text: Some(item.text.clone()),
                    item: Some(item),
                    fallback: false,
                })
            }
            None if self.must_in_options => Ok(Translation::default()),
            None => Ok(Translation {
                text: Some(any_to_str(value)),
                item: None,
                fallback: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::I18nTable;
    use crate::value::CaseMode;
    use serde_json::json;
    use std::collections::HashMap;

    fn registry() -> DictRegistry {
        let mut reg = DictRegistry::new();
        reg.register(Dict::from_items(
            "Letters",
            vec![json!({"value": "a", "text": "Alpha"}), json!({"value": "y", "text": "i18n:yes"})],
        ));
        reg
    }

    fn config(must: bool) -> BoxConfig {
        BoxConfig {
            options: Some(crate::dict::OptionsSpec::Ref("Letters".into())),
            must_in_options: must,
            ..BoxConfig::default()
        }
    }

    #[tokio::test]
    async fn trim_and_case_from_config() {
        let cfg = BoxConfig {
            trimed: true,
            value_case: Some(CaseMode::Upper),
            ..BoxConfig::default()
        };
        let input = ValueInput::from_config(&cfg, &DictRegistry::new(), vec![], vec![]).unwrap();
        assert_eq!(input.tidy(json!("  hello  "), &[]).await.unwrap(), json!("HELLO"));
    }

    #[tokio::test]
    async fn must_in_options_tidies_to_null() {
        let input = ValueInput::from_config(&config(true), &registry(), vec![], vec![]).unwrap();
        assert_eq!(input.pipeline().stage_len(Stage::Dict), 1);
        assert_eq!(input.tidy(json!("b"), &[]).await.unwrap(), Value::Null);
        assert_eq!(input.tidy(json!("a"), &[]).await.unwrap(), json!("a"));
    }

    #[tokio::test]
    async fn translate_respects_must_in_options() {
        let strict = ValueInput::from_config(&config(true), &registry(), vec![], vec![]).unwrap();
        assert_eq!(strict.translate(&json!("zz")).await.unwrap().text, None);

        let loose = ValueInput::from_config(&config(false), &registry(), vec![], vec![]).unwrap();
        assert_eq!(loose.translate(&json!("zz")).await.unwrap().text.as_deref(), Some("zz"));

        let hit = loose.translate(&json!("a")).await.unwrap();
        assert_eq!(hit.text.as_deref(), Some("Alpha"));
        assert_eq!(hit.item.map(|i| i.value), Some(json!("a")));
    }

    #[tokio::test]
    async fn translate_without_dict_is_identity() {
        let input = ValueInput::new(None, ValuePipeline::new(), true);
        assert_eq!(input.translate(&json!(12)).await.unwrap().text.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn translate_applies_i18n() {
        let i18n = I18nTable::new(HashMap::from([("yes".to_string(), "Yes!".to_string())]));
        let input = ValueInput::from_config(&config(false), &registry(), vec![], vec![])
            .unwrap()
            .with_i18n(Arc::new(i18n));
        assert_eq!(input.translate(&json!("y")).await.unwrap().text.as_deref(), Some("Yes!"));
    }

    #[test]
    fn unknown_builtin_is_config_error() {
        let cfg = BoxConfig {
            after_processors: vec!["shout".into()],
            ..BoxConfig::default()
        };
        let err = ValueInput::from_config(&cfg, &DictRegistry::new(), vec![], vec![]).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownProcessor { .. }));
    }
}
