//! Collaborators the engine calls into but does not own: display
//! formatting, i18n text lookup and tip visibility filtering.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::dict::DictItem;
use crate::value::any_to_str;

/// Prefix marking a text as an i18n key.
pub const I18N_PREFIX: &str = "i18n:";

/// Turns translated text into display text. Must be pure and synchronous.
pub trait TextFormatter: Send + Sync {
    fn format(&self, text: &str, item: Option<&DictItem>) -> String;
}

/// Shows the translated text as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl TextFormatter for PlainText {
    fn format(&self, text: &str, _item: Option<&DictItem>) -> String {
        text.to_string()
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(text|value|tip)\}").unwrap());

/// `${text}`, `${value}` and `${tip}` placeholder template.
///
/// Without a resolved item `${value}` and `${tip}` render empty.
/// Substitution is a single pass; placeholders inside substituted text
/// are left alone.
#[derive(Debug, Clone)]
pub struct Template(pub String);

impl TextFormatter for Template {
    fn format(&self, text: &str, item: Option<&DictItem>) -> String {
        let value = item.map(|it| any_to_str(&it.value)).unwrap_or_default();
        let tip = item.and_then(|it| it.tip.clone()).unwrap_or_default();
        PLACEHOLDER
            .replace_all(&self.0, |caps: &Captures| match &caps[1] {
                "text" => text.to_string(),
                "value" => value.clone(),
                _ => tip.clone(),
            })
            .into_owned()
    }
}

impl<F> TextFormatter for F
where
    F: Fn(&str, Option<&DictItem>) -> String + Send + Sync,
{
    fn format(&self, text: &str, item: Option<&DictItem>) -> String {
        self(text, item)
    }
}

/// Lookup of i18n keys. `None` means "no translation", never an error.
pub trait I18nText: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;

    /// Translate `i18n:key` texts; anything else, or a missing key, is
    /// returned unchanged.
    fn text(&self, s: &str) -> String {
        match s.strip_prefix(I18N_PREFIX) {
            Some(key) => self.lookup(key.trim()).unwrap_or_else(|| s.to_string()),
            None => s.to_string(),
        }
    }
}

/// No translations at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoI18n;

impl I18nText for NoI18n {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Translations from a flat key → text table.
#[derive(Debug, Default, Clone)]
pub struct I18nTable {
    texts: HashMap<String, String>,
}

impl I18nTable {
    pub fn new(texts: HashMap<String, String>) -> Self {
        Self { texts }
    }
}

impl I18nText for I18nTable {
    fn lookup(&self, key: &str) -> Option<String> {
        self.texts.get(key).cloned()
    }
}

/// Filters raw tip candidates before they are normalized.
pub type VisiblePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Predicate that keeps everything.
pub fn all_visible() -> VisiblePredicate {
    Arc::new(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> DictItem {
        DictItem {
            value: json!("a"),
            text: "Alpha".into(),
            icon: None,
            tip: Some("first".into()),
        }
    }

    #[test]
    fn template_fills_placeholders() {
        let fmt = Template("${text} (${value}) ${tip}".into());
        assert_eq!(fmt.format("Alpha", Some(&item())), "Alpha (a) first");
        assert_eq!(fmt.format("raw", None), "raw () ");
    }

    #[test]
    fn template_does_not_expand_substituted_text() {
        let fmt = Template("${text}".into());
        let priced = DictItem {
            value: json!("v1"),
            text: "cost ${value}".into(),
            icon: None,
            tip: None,
        };
        assert_eq!(fmt.format(&priced.text, Some(&priced)), "cost ${value}");
        assert_eq!(Template("${tip}|${text}".into()).format("${tip}", Some(&item())), "first|${tip}");
    }

    #[test]
    fn closures_are_formatters() {
        let fmt = |text: &str, _: Option<&DictItem>| format!("[{}]", text);
        assert_eq!(TextFormatter::format(&fmt, "x", None), "[x]");
    }

    #[test]
    fn i18n_text_falls_back() {
        let table = I18nTable::new(HashMap::from([("yes".to_string(), "Oui".to_string())]));
        assert_eq!(table.text("i18n:yes"), "Oui");
        assert_eq!(table.text("i18n:no"), "i18n:no");
        assert_eq!(table.text("plain"), "plain");
        assert_eq!(NoI18n.text("i18n:yes"), "i18n:yes");
    }
}
