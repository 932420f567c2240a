/// Structured error types for tibox-core.
///
/// Uses `thiserror` so library consumers can match on the failure class.
/// The `tibox` binary wraps these in `anyhow` at its boundary.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Boxed error returned by value processors and dictionary sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid or missing setup. Raised eagerly at construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Dictionary name not present in the registry
    #[error("Unknown dictionary '{name}'")]
    UnknownDict { name: String },

    /// Dynamic dictionary reference without a key variable
    #[error("Dynamic dictionary '{name}' declared without a dict key")]
    MissingDictKey { name: String },

    /// Key variable could not be resolved from the box's dict vars
    #[error("Dynamic dictionary '{name}': no value for '{key}' in dict vars {vars}")]
    UnresolvedDictKey {
        name: String,
        key: String,
        vars: String,
    },

    /// Built-in processor name not recognised
    #[error("Unknown value processor '{name}'")]
    UnknownProcessor { name: String },

    /// Malformed setting
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },

    /// Config file could not be read
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for the expected shape
    #[error("Failed to parse config {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn unknown_dict(name: impl Into<String>) -> Self {
        Self::UnknownDict { name: name.into() }
    }

    pub fn missing_dict_key(name: impl Into<String>) -> Self {
        Self::MissingDictKey { name: name.into() }
    }

    pub fn unresolved_dict_key(
        name: impl Into<String>,
        key: impl Into<String>,
        vars: &serde_json::Value,
    ) -> Self {
        Self::UnresolvedDictKey {
            name: name.into(),
            key: key.into(),
            vars: vars.to_string(),
        }
    }

    pub fn unknown_processor(name: impl Into<String>) -> Self {
        Self::UnknownProcessor { name: name.into() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// A value processor failed; no later processor or stage ran.
#[derive(Error, Debug)]
#[error("Value processor {stage}#{index} failed: {source}")]
pub struct ProcessingError {
    pub stage: Stage,
    pub index: usize,
    #[source]
    pub source: BoxError,
}

/// A dictionary lookup or query failed.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Source-side failure (network, backend, bad data)
    #[error("Dictionary '{dict}' query failed: {reason}")]
    Query { dict: String, reason: String },

    /// Source returned something that is not a list of items
    #[error("Dictionary '{dict}' returned an invalid response: {reason}")]
    InvalidResponse { dict: String, reason: String },

    #[cfg(feature = "remote")]
    #[error("HTTP error from dictionary '{dict}': {source}")]
    Http {
        dict: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ResolveError {
    pub fn query(dict: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            dict: dict.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(dict: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            dict: dict.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for tibox-core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Keep store I/O
    #[error("Keep store error at {path:?}: {source}")]
    Keep {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Keep store holds data that is not JSON
    #[error("Keep store {path:?} is corrupt: {source}")]
    KeepFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for tibox-core operations
pub type Result<T> = std::result::Result<T, Error>;
