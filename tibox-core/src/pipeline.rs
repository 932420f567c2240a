//! Staged value processing ("tidy").
//!
//! A committed value flows through four fixed stages:
//!
//! ```text
//! head (caller pre-hooks) → main (trim / case) → dict (membership) → tail (caller post-hooks)
//! ```
//!
//! Within a stage processors run strictly in registration order, each
//! receiving the previous one's output. The first failure stops the run.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::dict::Dict;
use crate::error::{BoxError, ConfigError, ProcessingError};
use crate::value::{trim_value, CaseMode};

/// Pipeline stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Head,
    Main,
    Dict,
    Tail,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Head, Stage::Main, Stage::Dict, Stage::Tail];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Main => "main",
            Self::Dict => "dict",
            Self::Tail => "tail",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Head => 0,
            Self::Main => 1,
            Self::Dict => 2,
            Self::Tail => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unary async transform.
#[async_trait]
pub trait ValueProcessor: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError>;
}

/// Adapts an async closure into a [`ValueProcessor`].
pub struct FnProcessor<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<F> ValueProcessor for FnProcessor<F>
where
    F: Fn(Value) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError> {
        (self.func)(value).await
    }
}

/// Wrap an async closure as a processor.
pub fn processor_fn<F, Fut>(
    name: impl Into<String>,
    func: F,
) -> Arc<dyn ValueProcessor>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    Arc::new(FnProcessor {
        name: name.into(),
        func: move |v: Value| -> BoxFuture<'static, Result<Value, BoxError>> { func(v).boxed() },
    })
}

/// Wrap a synchronous closure as a processor.
pub fn processor_sync<F>(name: impl Into<String>, func: F) -> Arc<dyn ValueProcessor>
where
    F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    let func = Arc::new(func);
    processor_fn(name, move |v| {
        let func = func.clone();
        async move { func(v) }
    })
}

/// Trims strings (built-in `main` stage).
#[derive(Debug, Default, Clone, Copy)]
pub struct Trim;

#[async_trait]
impl ValueProcessor for Trim {
    fn name(&self) -> &str {
        "trim"
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError> {
        Ok(trim_value(value))
    }
}

/// Forces a text case (built-in `main` stage).
#[derive(Debug, Clone, Copy)]
pub struct ToCase(pub CaseMode);

#[async_trait]
impl ValueProcessor for ToCase {
    fn name(&self) -> &str {
        self.0.as_str()
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError> {
        Ok(self.0.apply(value))
    }
}

/// Collapses inner whitespace runs to a single space.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollapseSpaces;

static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[async_trait]
impl ValueProcessor for CollapseSpaces {
    fn name(&self) -> &str {
        "collapse-spaces"
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError> {
        Ok(match value {
            Value::String(s) => Value::String(SPACES_RE.replace_all(&s, " ").into_owned()),
            other => other,
        })
    }
}

/// Replaces a value with its canonical dictionary value, or `Null` when
/// the dictionary does not know it (the `dict` stage).
pub struct DictMembership {
    dict: Arc<Dict>,
}

impl DictMembership {
    pub fn new(dict: Arc<Dict>) -> Self {
        Self { dict }
    }
}

#[async_trait]
impl ValueProcessor for DictMembership {
    fn name(&self) -> &str {
        "must-in-options"
    }

    async fn process(&self, value: Value) -> Result<Value, BoxError> {
        let item = self.dict.resolve_exact(&value).await?;
        Ok(item.map(|it| it.value).unwrap_or(Value::Null))
    }
}

/// Look up a built-in processor by its config name.
pub fn builtin(name: &str) -> Result<Arc<dyn ValueProcessor>, ConfigError> {
    let name = name.trim();
    if name == "trim" {
        return Ok(Arc::new(Trim));
    }
    if name == "collapse-spaces" {
        return Ok(Arc::new(CollapseSpaces));
    }
    match CaseMode::from_str(name) {
        Some(mode) => Ok(Arc::new(ToCase(mode))),
        None => Err(ConfigError::unknown_processor(name)),
    }
}

/// Ordered, staged set of processors.
#[derive(Clone, Default)]
pub struct ValuePipeline {
    stages: [Vec<Arc<dyn ValueProcessor>>; 4],
}

impl fmt::Debug for ValuePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ValuePipeline");
        for stage in Stage::ALL {
            let names: Vec<&str> = self.stages[stage.index()].iter().map(|p| p.name()).collect();
            dbg.field(stage.as_str(), &names);
        }
        dbg.finish()
    }
}

impl ValuePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor to a stage.
    pub fn push(&mut self, stage: Stage, processor: Arc<dyn ValueProcessor>) -> &mut Self {
        self.stages[stage.index()].push(processor);
        self
    }

    pub fn with(mut self, stage: Stage, processor: Arc<dyn ValueProcessor>) -> Self {
        self.push(stage, processor);
        self
    }

    pub fn stage_len(&self, stage: Stage) -> usize {
        self.stages[stage.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Vec::is_empty)
    }

    /// Run `value` through the selected stages (all when `stages` is
    /// empty). Stage order is always head → main → dict → tail regardless
    /// of the order `stages` lists them in.
    #[instrument(level = "debug", skip_all, fields(stages = ?stages))]
    pub async fn tidy(&self, value: Value, stages: &[Stage]) -> Result<Value, ProcessingError> {
        let mut val = value;
        for stage in Stage::ALL {
            if !stages.is_empty() && !stages.contains(&stage) {
                continue;
            }
            for (index, processor) in self.stages[stage.index()].iter().enumerate() {
                val = match processor.process(val).await {
                    Ok(next) => next,
                    Err(source) => {
                        warn!(%stage, index, processor = processor.name(), error = %source, "value processor failed");
                        return Err(ProcessingError {
                            stage,
                            index,
                            source,
                        });
                    }
                };
            }
        }
        debug!(value = %val, "tidied");
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn ValueProcessor> {
        processor_sync(tag, move |v| {
            log.lock().unwrap().push(tag.to_string());
            Ok(Value::String(format!("{}{}", crate::value::any_to_str(&v), tag)))
        })
    }

    #[tokio::test]
    async fn stages_run_in_fixed_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipe = ValuePipeline::new();
        // Registered out of order on purpose
        pipe.push(Stage::Tail, recorder(log.clone(), "T"));
        pipe.push(Stage::Dict, recorder(log.clone(), "D"));
        pipe.push(Stage::Main, recorder(log.clone(), "M"));
        pipe.push(Stage::Head, recorder(log.clone(), "H1"));
        pipe.push(Stage::Head, recorder(log.clone(), "H2"));

        let out = pipe.tidy(json!(">"), &[]).await.unwrap();
        assert_eq!(out, json!(">H1H2MDT"));
        assert_eq!(*log.lock().unwrap(), vec!["H1", "H2", "M", "D", "T"]);
    }

    #[tokio::test]
    async fn selected_stages_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipe = ValuePipeline::new()
            .with(Stage::Head, recorder(log.clone(), "H"))
            .with(Stage::Main, recorder(log.clone(), "M"))
            .with(Stage::Tail, recorder(log.clone(), "T"));

        let out = pipe.tidy(json!(""), &[Stage::Tail, Stage::Head]).await.unwrap();
        assert_eq!(out, json!("HT"));
    }

    #[tokio::test]
    async fn trim_and_upper() {
        let pipe = ValuePipeline::new()
            .with(Stage::Main, Arc::new(Trim))
            .with(Stage::Main, Arc::new(ToCase(CaseMode::Upper)));
        assert_eq!(pipe.tidy(json!("  hello  "), &[]).await.unwrap(), json!("HELLO"));
    }

    #[tokio::test]
    async fn failure_stops_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipe = ValuePipeline::new()
            .with(Stage::Head, recorder(log.clone(), "H"))
            .with(Stage::Main, processor_sync("fail", |_| Err("no digits allowed".into())))
            .with(Stage::Tail, recorder(log.clone(), "T"));

        let err = pipe.tidy(json!("x"), &[]).await.unwrap_err();
        assert_eq!(err.stage, Stage::Main);
        assert_eq!(err.index, 0);
        assert!(err.to_string().contains("no digits allowed"));
        assert_eq!(*log.lock().unwrap(), vec!["H"]);
    }

    #[tokio::test]
    async fn async_processors_are_awaited_in_sequence() {
        let pipe = ValuePipeline::new()
            .with(
                Stage::Head,
                processor_fn("slow", |v| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    Ok::<_, BoxError>(json!(format!("{}1", crate::value::any_to_str(&v))))
                }),
            )
            .with(
                Stage::Head,
                processor_fn("fast", |v| async move {
                    Ok::<_, BoxError>(json!(format!("{}2", crate::value::any_to_str(&v))))
                }),
            );
        assert_eq!(pipe.tidy(json!("0"), &[]).await.unwrap(), json!("012"));
    }

    #[tokio::test]
    async fn dict_membership_coerces() {
        let dict = Arc::new(Dict::from_items("Letters", vec![json!({"value": "a", "text": "Alpha"})]));
        let pipe = ValuePipeline::new().with(Stage::Dict, Arc::new(DictMembership::new(dict)));
        assert_eq!(pipe.tidy(json!("a"), &[]).await.unwrap(), json!("a"));
        assert_eq!(pipe.tidy(json!("b"), &[]).await.unwrap(), Value::Null);
    }

    #[test]
    fn builtin_names() {
        assert_eq!(builtin("trim").unwrap().name(), "trim");
        assert_eq!(builtin("upper").unwrap().name(), "upper");
        assert_eq!(builtin("collapse-spaces").unwrap().name(), "collapse-spaces");
        assert!(matches!(builtin("shout"), Err(ConfigError::UnknownProcessor { .. })));
    }
}
