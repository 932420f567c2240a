use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{Dict, DictRegistry, ItemMapping};
use crate::error::ConfigError;
use crate::pipeline::Stage;
use crate::tips::{TipOptions, TipShowTime, DEFAULT_DEBOUNCE};
use crate::value::CaseMode;

/// Settings of one input box
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxConfig {
    /// Initial value
    pub value: Value,
    /// Trim committed values
    pub trimed: bool,
    /// Force a text case on committed values
    pub value_case: Option<CaseMode>,
    /// Built-in processors run in the head stage
    pub before_processors: Vec<String>,
    /// Built-in processors run in the tail stage
    pub after_processors: Vec<String>,
    /// Dictionary of valid options
    pub options: Option<crate::dict::OptionsSpec>,
    /// Variable context for dynamic dictionaries
    pub dict_vars: Value,
    /// Values must be members of the dictionary
    pub must_in_options: bool,
    pub tip_show_time: TipShowTime,
    pub tip_use_hint: bool,
    pub tip_tidy_by: Vec<Stage>,
    pub tip_item_keep_raw: bool,
    pub tip_debounce_ms: u64,
    /// Keep showing translated text while focused
    pub keep_translated_on_focus: bool,
    /// Display template, see [`Template`](crate::collab::Template)
    pub format: Option<String>,
    /// Persist the value, e.g. `"local: user.city"`
    pub keep_at: Option<String>,
    /// Prefix icon click clears the value
    pub prefix_icon_for_clean: bool,
    /// Suffix icon click requests a copy of the value
    pub suffix_icon_for_copy: bool,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            value: Value::Null,
            trimed: false,
            value_case: None,
            before_processors: Vec::new(),
            after_processors: Vec::new(),
            options: None,
            dict_vars: Value::Null,
            must_in_options: false,
            tip_show_time: TipShowTime::default(),
            tip_use_hint: true,
            tip_tidy_by: Vec::new(),
            tip_item_keep_raw: false,
            tip_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            keep_translated_on_focus: false,
            format: None,
            keep_at: None,
            prefix_icon_for_clean: false,
            suffix_icon_for_copy: false,
        }
    }
}

impl BoxConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Dict vars as an object (`{}` when unset).
    pub fn dict_vars_or_empty(&self) -> Value {
        match &self.dict_vars {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        }
    }

    pub fn tip_options(&self) -> TipOptions {
        TipOptions {
            show_time: self.tip_show_time,
            use_hint: self.tip_use_hint,
            tidy_by: self.tip_tidy_by.clone(),
            keep_raw: self.tip_item_keep_raw,
            debounce: Duration::from_millis(self.tip_debounce_ms),
        }
    }
}

/// One dictionary declared in a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DictConfig {
    /// Inline options for a static dictionary
    pub items: Vec<Value>,
    pub mapping: ItemMapping,
    /// Remote source URL; `{hint}` and `{key}` are substituted
    pub url: Option<String>,
    /// Keyed per box through `name(=var)` references
    pub dynamic: bool,
}

/// Config file for the `tibox` tool: dictionaries, boxes and i18n texts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TiboxConfig {
    pub log_level: Option<String>,
    pub dicts: HashMap<String, DictConfig>,
    pub boxes: HashMap<String, BoxConfig>,
    pub i18n: HashMap<String, String>,
}

impl TiboxConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default location: `~/.tibox/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tibox/config.toml")
    }

    pub fn get_box(&self, name: &str) -> Result<&BoxConfig, ConfigError> {
        self.boxes
            .get(name)
            .ok_or_else(|| ConfigError::invalid(format!("no box named '{}'", name)))
    }

    /// Register every declared dictionary.
    pub fn build_registry(&self) -> Result<DictRegistry, ConfigError> {
        let mut registry = DictRegistry::new();
        for (name, dict) in &self.dicts {
            match (&dict.url, dict.dynamic) {
                (None, false) => {
                    registry.register(
                        Dict::from_items(name.clone(), dict.items.clone())
                            .with_mapping(dict.mapping.clone()),
                    );
                }
                (None, true) => {
                    return Err(ConfigError::invalid(format!(
                        "dynamic dictionary '{}' needs a url",
                        name
                    )));
                }
                (Some(url), dynamic) => register_remote(&mut registry, name, url, dynamic, dict)?,
            }
        }
        Ok(registry)
    }
}

#[cfg(feature = "remote")]
fn register_remote(
    registry: &mut DictRegistry,
    name: &str,
    url: &str,
    dynamic: bool,
    dict: &DictConfig,
) -> Result<(), ConfigError> {
    use std::sync::Arc;

    use crate::dict::{DictSource, RemoteSource};

    if dynamic {
        let template = url.to_string();
        let label = name.to_string();
        registry.register_dynamic(
            name,
            dict.mapping.clone(),
            Arc::new(move |key: &str, _vars: &Value| {
                Arc::new(RemoteSource::new(label.clone(), template.replace("{key}", key)))
                    as Arc<dyn DictSource>
            }),
        );
    } else {
        registry.register(
            Dict::new(name, Arc::new(RemoteSource::new(name, url))).with_mapping(dict.mapping.clone()),
        );
    }
    Ok(())
}

#[cfg(not(feature = "remote"))]
fn register_remote(
    _registry: &mut DictRegistry,
    name: &str,
    _url: &str,
    _dynamic: bool,
    _dict: &DictConfig,
) -> Result<(), ConfigError> {
    Err(ConfigError::invalid(format!(
        "dictionary '{}' has a url but tibox-core was built without the `remote` feature",
        name
    )))
}
