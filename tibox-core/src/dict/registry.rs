//! Explicit dictionary registry and construction of a box's dictionary
//! from its options setting.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Dict, DictSource, ItemMapping};
use crate::error::ConfigError;
use crate::value::{any_to_str, get_path, is_truthy};

/// Builds the source of a dynamic dictionary from its resolved key and the
/// box's dict vars.
pub type DynamicFactory = Arc<dyn Fn(&str, &Value) -> Arc<dyn DictSource> + Send + Sync>;

/// Parsed dictionary reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictName {
    pub name: String,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub dict_key: Option<String>,
}

// "name", "#name", "name(=var.path)", "name()"
static DICT_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?\s*([^\s(]+)\s*(\(\s*=?\s*([^)]*?)\s*\))?\s*$").unwrap());

impl DictName {
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let caps = DICT_REF_RE
            .captures(reference.trim())
            .ok_or_else(|| ConfigError::invalid(format!("bad dictionary reference '{}'", reference)))?;
        let name = caps[1].to_string();
        let dynamic = caps.get(2).is_some();
        let dict_key = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .filter(|k| !k.is_empty());
        Ok(Self {
            name,
            dynamic,
            dict_key,
        })
    }
}

/// Inline option list with an optional field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictSetup {
    pub items: Vec<Value>,
    #[serde(default)]
    pub mapping: ItemMapping,
}

/// How a box names its dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionsSpec {
    /// Reference string, see [`DictName::parse`]
    Ref(String),
    /// Bare inline option list
    Items(Vec<Value>),
    Setup(DictSetup),
    Name(DictName),
}

/// Registry of named dictionaries, passed by reference to whoever builds
/// boxes. Static entries are shared; dynamic entries are built per key.
#[derive(Default, Clone)]
pub struct DictRegistry {
    dicts: HashMap<String, Arc<Dict>>,
    dynamics: HashMap<String, (DynamicFactory, ItemMapping)>,
}

impl DictRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dict: Dict) -> Arc<Dict> {
        let dict = Arc::new(dict);
        self.dicts.insert(dict.name().to_string(), dict.clone());
        dict
    }

    pub fn register_dynamic(
        &mut self,
        name: impl Into<String>,
        mapping: ItemMapping,
        factory: DynamicFactory,
    ) {
        self.dynamics.insert(name.into(), (factory, mapping));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dict>> {
        self.dicts.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dicts
            .keys()
            .chain(self.dynamics.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Build the dictionary described by `options`.
    ///
    /// Fails eagerly when a dynamic dictionary cannot be keyed from `vars`.
    pub fn build(&self, options: &OptionsSpec, vars: &Value) -> Result<Arc<Dict>, ConfigError> {
        match options {
            OptionsSpec::Items(items) => Ok(Arc::new(Dict::from_items("<inline>", items.clone()))),
            OptionsSpec::Setup(setup) => Ok(Arc::new(
                Dict::from_items("<inline>", setup.items.clone()).with_mapping(setup.mapping.clone()),
            )),
            OptionsSpec::Ref(reference) => self.build_named(&DictName::parse(reference)?, vars),
            OptionsSpec::Name(name) => self.build_named(name, vars),
        }
    }

    fn build_named(&self, dict_name: &DictName, vars: &Value) -> Result<Arc<Dict>, ConfigError> {
        let name = &dict_name.name;
        if !dict_name.dynamic {
            return self.get(name).ok_or_else(|| ConfigError::unknown_dict(name));
        }

        let dict_key = dict_name
            .dict_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::missing_dict_key(name))?;
        let key = get_path(vars, dict_key)
            .filter(|v| is_truthy(v))
            .map(any_to_str)
            .ok_or_else(|| ConfigError::unresolved_dict_key(name, dict_key, vars))?;
        let (factory, mapping) = self
            .dynamics
            .get(name)
            .ok_or_else(|| ConfigError::unknown_dict(name))?;

        debug!(dict = %name, %key, "building dynamic dictionary");
        let source = factory(&key, vars);
        Ok(Arc::new(
            Dict::new(format!("{}:{}", name, key), source).with_mapping(mapping.clone()),
        ))
    }
}
