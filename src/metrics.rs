//! Metric calculators and the registry that drives them.
//!
//! Every graded action carries the same fixed set of metrics (`REQUIRED_METRICS`).
//! Each metric is produced by a calculator registered under its `MetricId`; a metric
//! with no calculator is sent as the sentinel string `"not found"` instead of
//! failing the submission. Calculator errors are not caught here: they abort the
//! submission and surface to the caller.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::ser::{Serialize, Serializer};
use tracing::{debug, instrument, warn};

use crate::domain::ClassStructure;
use crate::error::{Error, Result};
use crate::execution::{ExecutionContext, Severity, StructureParser};

/// Serialized in place of a metric that has no registered calculator.
pub const NOT_FOUND: &str = "not found";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricId {
  TimeSpent,
  Warnings,
  Errors,
  NewVariables,
  TimeSinceLastAction,
  Success,
  DeclaredClasses,
  DeclarationsStructure,
}

/// Metrics required by the structural-grading mode, in evaluation order.
pub const REQUIRED_METRICS: [MetricId; 8] = [
  MetricId::TimeSpent,
  MetricId::Warnings,
  MetricId::Errors,
  MetricId::NewVariables,
  MetricId::TimeSinceLastAction,
  MetricId::Success,
  MetricId::DeclaredClasses,
  MetricId::DeclarationsStructure,
];

impl MetricId {
  /// Wire name used as the key inside the submission's `data` object.
  pub fn as_str(self) -> &'static str {
    match self {
      MetricId::TimeSpent => "timeSpent",
      MetricId::Warnings => "warnings",
      MetricId::Errors => "errors",
      MetricId::NewVariables => "newVariables",
      MetricId::TimeSinceLastAction => "timeSinceLastAction",
      MetricId::Success => "success",
      MetricId::DeclaredClasses => "declaredClasses",
      MetricId::DeclarationsStructure => "declarationsStructure",
    }
  }
}

impl fmt::Display for MetricId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A computed metric. Serialized untagged: numbers, booleans, strings, maps and
/// declaration trees appear as plain JSON values.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
  Number(f64),
  Count(u64),
  Flag(bool),
  Text(String),
  Names(Vec<String>),
  Variables(BTreeMap<String, String>),
  Structures(Vec<ClassStructure>),
  NotFound,
}

impl Serialize for MetricValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match self {
      MetricValue::Number(n) => serializer.serialize_f64(*n),
      MetricValue::Count(n) => serializer.serialize_u64(*n),
      MetricValue::Flag(b) => serializer.serialize_bool(*b),
      MetricValue::Text(s) => serializer.serialize_str(s),
      MetricValue::Names(v) => v.serialize(serializer),
      MetricValue::Variables(m) => m.serialize(serializer),
      MetricValue::Structures(v) => v.serialize(serializer),
      MetricValue::NotFound => serializer.serialize_str(NOT_FOUND),
    }
  }
}

/// Derives one metric value from an execution.
#[async_trait]
pub trait MetricCalculator: Send + Sync {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue>;
}

/// Elapsed run time of the cell, in milliseconds.
pub struct TimeSpent;

/// Milliseconds since the previous successful submission, 0 on the first one.
pub struct TimeSinceLastAction;

/// True when no failure event was emitted.
pub struct Success;

/// Number of diagnostics of one severity across all diagnostic events.
pub struct SeverityCount(pub Severity);

/// Newly declared or changed variables, verbatim.
pub struct NewVariables;

/// Names of the classes declared by the submitted source.
pub struct DeclaredClasses(pub Arc<dyn StructureParser>);

/// Full declaration trees of the submitted source.
pub struct DeclarationsStructure(pub Arc<dyn StructureParser>);

#[async_trait]
impl MetricCalculator for TimeSpent {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Number(ctx.execution.run_time.as_micros() as f64 / 1000.0))
  }
}

#[async_trait]
impl MetricCalculator for TimeSinceLastAction {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Number(ctx.millis_since_last_run()))
  }
}

#[async_trait]
impl MetricCalculator for Success {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Flag(!ctx.execution.failed()))
  }
}

#[async_trait]
impl MetricCalculator for SeverityCount {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Count(ctx.execution.count_severity(self.0) as u64))
  }
}

#[async_trait]
impl MetricCalculator for NewVariables {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Variables(ctx.execution.new_variables.clone()))
  }
}

#[async_trait]
impl MetricCalculator for DeclaredClasses {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    let decls = self.0.parse(&ctx.execution.command).await?;
    Ok(MetricValue::Names(decls.into_iter().map(|c| c.name).collect()))
  }
}

#[async_trait]
impl MetricCalculator for DeclarationsStructure {
  async fn compute_metric(&self, ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
    Ok(MetricValue::Structures(self.0.parse(&ctx.execution.command).await?))
  }
}

/// Remembers the most recent successful parse so the structural calculators of one
/// submission share a single parser call. Keyed on the exact source text; errors are
/// not remembered.
pub struct LastParse {
  inner: Arc<dyn StructureParser>,
  last: tokio::sync::Mutex<Option<(String, Vec<ClassStructure>)>>,
}

impl LastParse {
  pub fn new(inner: Arc<dyn StructureParser>) -> Self {
    Self { inner, last: tokio::sync::Mutex::new(None) }
  }
}

#[async_trait]
impl StructureParser for LastParse {
  async fn parse(&self, source: &str) -> Result<Vec<ClassStructure>> {
    // Held across the inner call so concurrent callers wait instead of parsing twice.
    let mut last = self.last.lock().await;
    if let Some((cached, decls)) = last.as_ref() {
      if cached == source {
        return Ok(decls.clone());
      }
    }
    let decls = self.inner.parse(source).await?;
    *last = Some((source.to_string(), decls.clone()));
    Ok(decls)
  }
}

/// Calculators keyed by metric. Registering twice replaces the earlier calculator.
#[derive(Default, Clone)]
pub struct MetricRegistry {
  calculators: HashMap<MetricId, Arc<dyn MetricCalculator>>,
}

impl MetricRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Timing, diagnostics, success and variable calculators. The two structural
  /// metrics need a parser, see `with_parser`.
  pub fn with_builtins() -> Self {
    let mut r = Self::new();
    r.register(MetricId::TimeSpent, TimeSpent);
    r.register(MetricId::Warnings, SeverityCount(Severity::Warning));
    r.register(MetricId::Errors, SeverityCount(Severity::Error));
    r.register(MetricId::NewVariables, NewVariables);
    r.register(MetricId::TimeSinceLastAction, TimeSinceLastAction);
    r.register(MetricId::Success, Success);
    r
  }

  /// Builtins plus both structural calculators, sharing one parse of each source.
  pub fn with_parser(parser: Arc<dyn StructureParser>) -> Self {
    let parser: Arc<dyn StructureParser> = Arc::new(LastParse::new(parser));
    let mut r = Self::with_builtins();
    r.register(MetricId::DeclaredClasses, DeclaredClasses(parser.clone()));
    r.register(MetricId::DeclarationsStructure, DeclarationsStructure(parser));
    r
  }

  pub fn register<C: MetricCalculator + 'static>(&mut self, id: MetricId, calculator: C) {
    if self.calculators.insert(id, Arc::new(calculator)).is_some() {
      debug!(target: "scoring_client", metric = %id, "Replaced metric calculator");
    }
  }

  /// Evaluate `metrics` one after another, in order. Unregistered metrics map to
  /// `MetricValue::NotFound`; the first calculator error aborts the whole run.
  #[instrument(level = "debug", skip(self, ctx), fields(count = metrics.len()))]
  pub async fn compute_all(
    &self,
    metrics: &[MetricId],
    ctx: &ExecutionContext<'_>,
  ) -> Result<BTreeMap<String, MetricValue>> {
    let mut data = BTreeMap::new();
    for &id in metrics {
      let value = match self.calculators.get(&id) {
        Some(calc) => calc.compute_metric(ctx).await.map_err(|e| match e {
          Error::Metric { .. } => e,
          other => Error::Metric { metric: id.as_str(), message: other.to_string() },
        })?,
        None => {
          warn!(target: "scoring_client", metric = %id, "No calculator registered; sending sentinel");
          MetricValue::NotFound
        }
      };
      data.insert(id.as_str().to_string(), value);
    }
    Ok(data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::DeclarationContextKind;
  use crate::execution::{Diagnostic, Execution, KernelEvent};
  use chrono::{Duration as ChronoDuration, Utc};
  use std::time::Duration;

  struct FixedParser(Vec<ClassStructure>);

  #[async_trait]
  impl StructureParser for FixedParser {
    async fn parse(&self, _source: &str) -> Result<Vec<ClassStructure>> {
      Ok(self.0.clone())
    }
  }

  struct BrokenParser;

  #[async_trait]
  impl StructureParser for BrokenParser {
    async fn parse(&self, _source: &str) -> Result<Vec<ClassStructure>> {
      Err(Error::Config("parser offline".into()))
    }
  }

  #[derive(Default)]
  struct CountingParser(std::sync::atomic::AtomicUsize);

  #[async_trait]
  impl StructureParser for CountingParser {
    async fn parse(&self, source: &str) -> Result<Vec<ClassStructure>> {
      self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      Ok(vec![ClassStructure::new(source, DeclarationContextKind::TopLevel, ["public"])])
    }
  }

  struct Constant(f64);

  #[async_trait]
  impl MetricCalculator for Constant {
    async fn compute_metric(&self, _ctx: &ExecutionContext<'_>) -> Result<MetricValue> {
      Ok(MetricValue::Number(self.0))
    }
  }

  fn sample() -> Execution {
    Execution::new("csharp", "public class Triangle {}")
      .with_run_time(Duration::from_millis(250))
      .with_variable("x", "1")
      .with_events([
        KernelEvent::DiagnosticsProduced {
          diagnostics: vec![
            Diagnostic::new("CS0168", Severity::Warning, "unused"),
            Diagnostic::new("CS0219", Severity::Warning, "assigned"),
            Diagnostic::new("CS1002", Severity::Error, "; expected"),
          ],
        },
        KernelEvent::CommandFailed { message: "compilation error".into() },
      ])
  }

  #[tokio::test]
  async fn builtins_compute_expected_values() {
    let ex = sample();
    let now = Utc::now();
    let ctx = ExecutionContext::new(&ex, Some(now - ChronoDuration::milliseconds(1500)), now);
    let data = MetricRegistry::with_builtins().compute_all(&REQUIRED_METRICS, &ctx).await.unwrap();

    assert_eq!(data["timeSpent"], MetricValue::Number(250.0));
    assert_eq!(data["warnings"], MetricValue::Count(2));
    assert_eq!(data["errors"], MetricValue::Count(1));
    assert_eq!(data["success"], MetricValue::Flag(false));
    assert_eq!(data["timeSinceLastAction"], MetricValue::Number(1500.0));
    assert_eq!(data["newVariables"], MetricValue::Variables(ex.new_variables.clone()));
  }

  #[tokio::test]
  async fn unregistered_metrics_become_sentinel() {
    let ex = sample();
    let ctx = ExecutionContext::new(&ex, None, Utc::now());
    let data = MetricRegistry::with_builtins().compute_all(&REQUIRED_METRICS, &ctx).await.unwrap();

    assert_eq!(data.len(), REQUIRED_METRICS.len());
    assert_eq!(data["declaredClasses"], MetricValue::NotFound);
    assert_eq!(serde_json::to_value(&data["declarationsStructure"]).unwrap(), serde_json::json!("not found"));
  }

  #[tokio::test]
  async fn structural_metrics_use_parser() {
    let tri = ClassStructure::new("Triangle", DeclarationContextKind::TopLevel, ["public"]);
    let registry = MetricRegistry::with_parser(Arc::new(FixedParser(vec![tri.clone()])));
    let ex = sample();
    let ctx = ExecutionContext::new(&ex, None, Utc::now());
    let data = registry.compute_all(&REQUIRED_METRICS, &ctx).await.unwrap();

    assert_eq!(data["declaredClasses"], MetricValue::Names(vec!["Triangle".into()]));
    assert_eq!(data["declarationsStructure"], MetricValue::Structures(vec![tri]));
  }

  #[tokio::test]
  async fn structural_metrics_share_one_parse_per_source() {
    let parser = Arc::new(CountingParser::default());
    let registry = MetricRegistry::with_parser(parser.clone());
    let calls = || parser.0.load(std::sync::atomic::Ordering::SeqCst);

    let first = Execution::new("csharp", "Triangle");
    let data = registry.compute_all(&REQUIRED_METRICS, &ExecutionContext::new(&first, None, Utc::now())).await.unwrap();
    assert_eq!(calls(), 1);
    assert_eq!(data["declaredClasses"], MetricValue::Names(vec!["Triangle".into()]));

    let second = Execution::new("csharp", "Square");
    let data = registry.compute_all(&REQUIRED_METRICS, &ExecutionContext::new(&second, None, Utc::now())).await.unwrap();
    assert_eq!(calls(), 2);
    assert_eq!(data["declaredClasses"], MetricValue::Names(vec!["Square".into()]));
  }

  #[tokio::test]
  async fn register_overwrites_previous_calculator() {
    let mut registry = MetricRegistry::with_builtins();
    registry.register(MetricId::TimeSpent, Constant(42.0));
    let ex = sample();
    let ctx = ExecutionContext::new(&ex, None, Utc::now());
    let data = registry.compute_all(&[MetricId::TimeSpent], &ctx).await.unwrap();
    assert_eq!(data["timeSpent"], MetricValue::Number(42.0));
  }

  #[tokio::test]
  async fn calculator_error_aborts_run() {
    let registry = MetricRegistry::with_parser(Arc::new(BrokenParser));
    let ex = sample();
    let ctx = ExecutionContext::new(&ex, None, Utc::now());
    let err = registry.compute_all(&REQUIRED_METRICS, &ctx).await.unwrap_err();
    assert!(matches!(err, Error::Metric { metric: "declaredClasses", .. }), "{err}");
  }

  #[test]
  fn values_serialize_untagged() {
    let v = serde_json::to_value(MetricValue::Count(3)).unwrap();
    assert_eq!(v, serde_json::json!(3));
    let v = serde_json::to_value(MetricValue::Flag(true)).unwrap();
    assert_eq!(v, serde_json::json!(true));
  }
}
