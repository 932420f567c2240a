//! Per-box mutable state, owned by exactly one [`InputBox`](crate::engine::InputBox).

use serde_json::Value;

use crate::dict::DictItem;
use crate::value::any_to_str;

/// Last key the user pressed, with modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyStroke {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Box state. The in-flight fetch slot lives with the
/// [`TipListController`](crate::tips::TipListController).
#[derive(Debug, Clone, Default)]
pub struct BoxState {
    /// Logical value currently represented
    pub raw_value: Value,
    /// What the user sees; derived from `raw_value` while unfocused
    pub display_text: String,
    pub focused: bool,
    /// Set by key presses, cleared on blur and tip reset
    pub keyboard: Option<KeyStroke>,
    /// Dictionary item last resolved for `raw_value`
    pub resolved_item: Option<DictItem>,
    /// Message of the last rejected change
    pub error_message: Option<String>,
}

impl BoxState {
    pub fn new(raw_value: Value) -> Self {
        let display_text = any_to_str(&raw_value);
        Self {
            raw_value,
            display_text,
            ..Self::default()
        }
    }

    /// True when the display text differs from the committed value.
    pub fn input_differs(&self) -> bool {
        !self.display_text.is_empty() && any_to_str(&self.raw_value) != self.display_text
    }

    pub fn dump(&self) -> String {
        let key = self.keyboard.as_ref().map(|k| {
            format!(
                "{}<{}{}{}{}>",
                k.key,
                if k.alt { "ALT" } else { "" },
                if k.ctrl { "-CTL" } else { "" },
                if k.shift { "-SHIFT" } else { "" },
                if k.meta { "-META" } else { "" },
            )
        });
        format!(
            "value={} text={:?} focused={} keyboard={}",
            self.raw_value,
            self.display_text,
            self.focused,
            key.as_deref().unwrap_or("---"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_differs_from_value() {
        let mut state = BoxState::new(json!("a"));
        assert!(!state.input_differs());
        state.display_text = "ab".into();
        assert!(state.input_differs());
        state.display_text.clear();
        assert!(!state.input_differs());
    }

    #[test]
    fn dump_shows_keyboard() {
        let mut state = BoxState::new(json!(1));
        assert!(state.dump().contains("keyboard=---"));
        state.keyboard = Some(KeyStroke::new("a").with_ctrl());
        assert!(state.dump().contains("a<-CTL>"));
    }
}
