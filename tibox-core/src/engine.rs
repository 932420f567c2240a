//! Input-box engine: owns one box's state and wires the value pipeline,
//! dictionary translation and tip list together.
//!
//! The engine never applies its own `Change` events. Callers decide
//! whether to feed a changed value back through [`InputBox::update_value`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::collab::{all_visible, I18nText, NoI18n, PlainText, Template, TextFormatter, VisiblePredicate};
use crate::config::BoxConfig;
use crate::dict::{Dict, DictItem, DictRegistry};
use crate::error::{ConfigError, ProcessingError};
use crate::input::{Translation, ValueInput};
use crate::keep::{Keep, KeepSpec, KeepStores};
use crate::pipeline::{Stage, ValueProcessor};
use crate::state::{BoxState, KeyStroke};
use crate::tips::{TipItem, TipList, TipListController, TipRequest, TriggerReason};
use crate::value::any_to_str;

const EVENT_CAPACITY: usize = 64;

/// Signals sent to the render layer and other listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxEvent {
    /// A tidied value the user committed
    Change(Value),
    /// The user asked to copy the value
    CopyRequested(Value),
    /// The clean icon was used
    Cleared,
    /// Prefix icon clicked with no built-in action
    PrefixClicked,
    /// Suffix icon clicked with no built-in action
    SuffixClicked,
}

pub struct InputBoxBuilder<'a> {
    config: BoxConfig,
    registry: &'a DictRegistry,
    head: Vec<Arc<dyn ValueProcessor>>,
    tail: Vec<Arc<dyn ValueProcessor>>,
    formatter: Option<Arc<dyn TextFormatter>>,
    i18n: Arc<dyn I18nText>,
    visible: VisiblePredicate,
    keep_stores: Option<KeepStores>,
}

impl<'a> InputBoxBuilder<'a> {
    /// Caller processor for the head stage
    pub fn before(mut self, processor: Arc<dyn ValueProcessor>) -> Self {
        self.head.push(processor);
        self
    }

    /// Caller processor for the tail stage
    pub fn after(mut self, processor: Arc<dyn ValueProcessor>) -> Self {
        self.tail.push(processor);
        self
    }

    /// Overrides the config's `format` template.
    pub fn formatter(mut self, formatter: Arc<dyn TextFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn i18n(mut self, i18n: Arc<dyn I18nText>) -> Self {
        self.i18n = i18n;
        self
    }

    pub fn visible(mut self, visible: VisiblePredicate) -> Self {
        self.visible = visible;
        self
    }

    pub fn keep_stores(mut self, stores: KeepStores) -> Self {
        self.keep_stores = Some(stores);
        self
    }

    /// Build the box and compute its initial display text.
    ///
    /// Dictionary and processor setup errors surface here.
    pub async fn build(self) -> Result<InputBox, ConfigError> {
        let input = Arc::new(
            ValueInput::from_config(&self.config, self.registry, self.head, self.tail)?
                .with_i18n(self.i18n),
        );

        let formatter: Arc<dyn TextFormatter> = match (self.formatter, &self.config.format) {
            (Some(formatter), _) => formatter,
            (None, Some(template)) => Arc::new(Template(template.clone())),
            (None, None) => Arc::new(PlainText),
        };

        let keep = self.config.keep_at.as_deref().and_then(KeepSpec::parse).map(|spec| {
            let stores = self.keep_stores.unwrap_or_default();
            Keep::new(spec, &stores)
        });

        let mut initial = self.config.value.clone();
        if let (true, Some(keep)) = (initial.is_null(), &keep) {
            match keep.load().await {
                Ok(Some(kept)) => {
                    debug!(key = %keep.spec().key, "initial value loaded from keep");
                    initial = kept;
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "failed to load kept value"),
            }
        }

        let tips = TipListController::new(input.clone(), self.config.tip_options())
            .with_visible(self.visible);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut ibox = InputBox {
            config: self.config,
            input,
            tips,
            formatter,
            keep,
            state: BoxState::default(),
            events,
        };
        ibox.update_value(initial).await;
        Ok(ibox)
    }
}

/// One input box.
pub struct InputBox {
    config: BoxConfig,
    input: Arc<ValueInput>,
    tips: TipListController,
    formatter: Arc<dyn TextFormatter>,
    keep: Option<Keep>,
    state: BoxState,
    events: broadcast::Sender<BoxEvent>,
}

impl InputBox {
    pub fn builder(config: BoxConfig, registry: &DictRegistry) -> InputBoxBuilder<'_> {
        InputBoxBuilder {
            config,
            registry,
            head: Vec::new(),
            tail: Vec::new(),
            formatter: None,
            i18n: Arc::new(NoI18n),
            visible: all_visible(),
            keep_stores: None,
        }
    }

    pub fn config(&self) -> &BoxConfig {
        &self.config
    }

    pub fn state(&self) -> &BoxState {
        &self.state
    }

    pub fn value(&self) -> &Value {
        &self.state.raw_value
    }

    pub fn display_text(&self) -> &str {
        &self.state.display_text
    }

    pub fn resolved_item(&self) -> Option<&DictItem> {
        self.state.resolved_item.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.state.error_message.as_deref()
    }

    pub fn dict(&self) -> Option<&Arc<Dict>> {
        self.input.dict()
    }

    pub fn tip_controller(&self) -> &TipListController {
        &self.tips
    }

    pub fn tips(&self) -> Option<TipList> {
        self.tips.tips()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoxEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_tips(&self) -> watch::Receiver<Option<TipList>> {
        self.tips.subscribe()
    }

    fn emit(&self, event: BoxEvent) {
        if self.events.send(event).is_err() {
            debug!("box event dropped: no listeners");
        }
    }

    async fn save_keep(&self, value: &Value) {
        if let Some(keep) = &self.keep {
            if let Err(err) = keep.save(value).await {
                warn!(key = %keep.spec().key, error = %err, "failed to keep value");
            }
        }
    }

    /// Run `value` through the given stages (all of them when empty).
    pub async fn tidy_value(&self, value: Value, stages: &[Stage]) -> Result<Value, ProcessingError> {
        self.input.tidy(value, stages).await
    }

    /// Translate a value for display. Resolution failures fall back to the
    /// value's own text and are logged, never returned.
    pub async fn translate_value(&self, value: &Value) -> Translation {
        match self.input.translate(value).await {
            Ok(translation) => translation,
            Err(err) => {
                warn!(value = %value, error = %err, "translation failed; showing raw value");
                Translation {
                    text: Some(any_to_str(value)),
                    item: None,
                    fallback: true,
                }
            }
        }
    }

    /// Set the value from outside. Does not emit `Change`.
    pub async fn update_value(&mut self, value: Value) {
        self.state.raw_value = value;
        self.update_text().await;
    }

    /// Recompute display text and resolved item from the raw value.
    pub async fn update_text(&mut self) {
        let translation = self.translate_value(&self.state.raw_value).await;
        self.state.resolved_item = translation.item;

        // Raw text on focus, and unformatted raw text when resolution failed
        if translation.fallback || (self.state.focused && !self.config.keep_translated_on_focus) {
            self.state.display_text = any_to_str(&self.state.raw_value);
            return;
        }
        self.state.display_text = match translation.text {
            Some(text) => self
                .formatter
                .format(&text, self.state.resolved_item.as_ref()),
            None => String::new(),
        };
    }

    /// Commit user text: tidy it and emit `Change` with the result.
    ///
    /// The box's own value is left alone.
    #[instrument(level = "debug", skip(self))]
    pub async fn change_value(&mut self, text: &str) -> Result<Value, ProcessingError> {
        match self.input.tidy(Value::String(text.to_string()), &[]).await {
            Ok(value) => {
                self.state.error_message = None;
                self.save_keep(&value).await;
                self.emit(BoxEvent::Change(value.clone()));
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "value change rejected");
                self.state.error_message = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn focus(&mut self) -> TipRequest {
        self.state.focused = true;
        self.update_text().await;
        self.request_tips(TriggerReason::Focus)
    }

    pub async fn blur(&mut self) {
        self.state.focused = false;
        self.state.keyboard = None;
        self.tips.reset();
        self.update_text().await;
    }

    pub fn key_down(&mut self, key: KeyStroke) {
        self.state.keyboard = Some(key);
    }

    /// The user typed; `text` is the whole box content.
    pub fn input(&mut self, text: &str) -> TipRequest {
        self.state.display_text = text.to_string();
        self.request_tips(TriggerReason::KeyedInput)
    }

    /// Ask the tip list to follow the current display text.
    pub fn request_tips(&self, reason: TriggerReason) -> TipRequest {
        self.tips
            .request_update(&self.state.display_text, reason, &self.state)
    }

    pub fn reset_tips(&mut self) {
        self.state.keyboard = None;
        self.tips.reset();
    }

    /// Choose a tip. Emits `Change` with its value and closes the list.
    pub async fn pick_tip(&mut self, index: usize) -> Option<Value> {
        let tips = self.tips.tips()?;
        let value = match tips.get(index)? {
            TipItem::Std(item) => item.value.clone(),
            TipItem::Raw(raw) => match self.input.dict() {
                Some(dict) => dict.mapping().value_of(raw).clone(),
                None => raw.clone(),
            },
        };
        info!(index, value = %value, "tip picked");
        self.save_keep(&value).await;
        self.emit(BoxEvent::Change(value.clone()));
        self.reset_tips();
        Some(value)
    }

    /// Clean the box: emits `Cleared` then commits empty text.
    pub async fn clear(&mut self) -> Result<Value, ProcessingError> {
        self.emit(BoxEvent::Cleared);
        self.change_value("").await
    }

    pub fn copy(&self) {
        self.emit(BoxEvent::CopyRequested(self.state.raw_value.clone()));
    }

    pub async fn click_prefix(&mut self) -> Result<(), ProcessingError> {
        if self.config.prefix_icon_for_clean {
            self.clear().await?;
        } else {
            self.emit(BoxEvent::PrefixClicked);
        }
        Ok(())
    }

    pub fn click_suffix(&self) {
        if self.config.suffix_icon_for_copy {
            self.copy();
        } else {
            self.emit(BoxEvent::SuffixClicked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::OptionsSpec;
    use crate::value::CaseMode;
    use serde_json::json;

    fn registry() -> DictRegistry {
        let mut reg = DictRegistry::new();
        reg.register(Dict::from_items(
            "Letters",
            vec![
                json!({"value": "a", "text": "Alpha", "tip": "first"}),
                json!({"value": "b", "text": "Beta"}),
            ],
        ));
        reg
    }

    fn letters(extra: BoxConfig) -> BoxConfig {
        BoxConfig {
            options: Some(OptionsSpec::Ref("Letters".into())),
            ..extra
        }
    }

    #[tokio::test]
    async fn initial_value_is_translated() {
        let reg = registry();
        let ibox = InputBox::builder(letters(BoxConfig { value: json!("a"), ..Default::default() }), &reg)
            .build()
            .await
            .unwrap();
        assert_eq!(ibox.display_text(), "Alpha");
        assert_eq!(ibox.resolved_item().map(|i| i.text.as_str()), Some("Alpha"));
    }

    #[tokio::test]
    async fn change_emits_without_self_applying() {
        let reg = registry();
        let cfg = BoxConfig {
            trimed: true,
            value_case: Some(CaseMode::Upper),
            ..Default::default()
        };
        let mut ibox = InputBox::builder(cfg, &reg).build().await.unwrap();
        let mut events = ibox.subscribe();

        let value = ibox.change_value("  hello  ").await.unwrap();
        assert_eq!(value, json!("HELLO"));
        assert_eq!(events.recv().await.unwrap(), BoxEvent::Change(json!("HELLO")));
        assert_eq!(ibox.value(), &Value::Null);
    }

    #[tokio::test]
    async fn focus_shows_raw_value_unless_kept_translated() {
        let reg = registry();
        let mut ibox = InputBox::builder(letters(BoxConfig { value: json!("b"), ..Default::default() }), &reg)
            .build()
            .await
            .unwrap();
        ibox.focus().await;
        assert_eq!(ibox.display_text(), "b");
        ibox.blur().await;
        assert_eq!(ibox.display_text(), "Beta");

        let cfg = letters(BoxConfig {
            value: json!("b"),
            keep_translated_on_focus: true,
            ..Default::default()
        });
        let mut ibox = InputBox::builder(cfg, &reg).build().await.unwrap();
        ibox.focus().await;
        assert_eq!(ibox.display_text(), "Beta");
    }

    #[tokio::test]
    async fn template_formatter_from_config() {
        let reg = registry();
        let cfg = letters(BoxConfig {
            value: json!("a"),
            format: Some("${text} (${value}) ${tip}".into()),
            ..Default::default()
        });
        let ibox = InputBox::builder(cfg, &reg).build().await.unwrap();
        assert_eq!(ibox.display_text(), "Alpha (a) first");
    }

    #[tokio::test]
    async fn icon_clicks() {
        let reg = registry();
        let cfg = BoxConfig {
            value: json!("x"),
            prefix_icon_for_clean: true,
            suffix_icon_for_copy: true,
            ..Default::default()
        };
        let mut ibox = InputBox::builder(cfg, &reg).build().await.unwrap();
        let mut events = ibox.subscribe();

        ibox.click_suffix();
        assert_eq!(events.recv().await.unwrap(), BoxEvent::CopyRequested(json!("x")));

        ibox.click_prefix().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), BoxEvent::Cleared);
        assert_eq!(events.recv().await.unwrap(), BoxEvent::Change(json!("")));

        let mut plain = InputBox::builder(BoxConfig::default(), &reg).build().await.unwrap();
        let mut events = plain.subscribe();
        plain.click_prefix().await.unwrap();
        plain.click_suffix();
        assert_eq!(events.recv().await.unwrap(), BoxEvent::PrefixClicked);
        assert_eq!(events.recv().await.unwrap(), BoxEvent::SuffixClicked);
    }

    #[tokio::test]
    async fn keep_loads_initial_and_saves_changes() {
        let reg = registry();
        let stores = KeepStores::default();
        let cfg = BoxConfig {
            keep_at: Some("session: letter".into()),
            ..Default::default()
        };

        let mut ibox = InputBox::builder(cfg.clone(), &reg)
            .keep_stores(stores.clone())
            .build()
            .await
            .unwrap();
        assert_eq!(ibox.value(), &Value::Null);
        ibox.change_value("kept").await.unwrap();

        let again = InputBox::builder(cfg, &reg).keep_stores(stores).build().await.unwrap();
        assert_eq!(again.value(), &json!("kept"));
    }

    #[tokio::test]
    async fn local_keep_writes_the_file() {
        let reg = registry();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("state/keep.json");
        let cfg = BoxConfig {
            keep_at: Some("local: letter".into()),
            ..Default::default()
        };

        let mut ibox = InputBox::builder(cfg.clone(), &reg)
            .keep_stores(KeepStores::with_local_file(&path))
            .build()
            .await
            .unwrap();
        ibox.change_value("on disk").await.unwrap();
        let saved: Value = serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(saved, json!({"letter": "on disk"}));

        let again = InputBox::builder(cfg, &reg)
            .keep_stores(KeepStores::with_local_file(&path))
            .build()
            .await
            .unwrap();
        assert_eq!(again.value(), &json!("on disk"));
    }

    #[tokio::test]
    async fn unknown_dict_fails_build() {
        let reg = DictRegistry::new();
        let err = InputBox::builder(letters(BoxConfig::default()), &reg)
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownDict { .. }));
    }
}
