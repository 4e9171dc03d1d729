//! What the host execution environment hands us after running one code cell,
//! plus the seam to the external structural parser.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ClassStructure;
use crate::error::Result;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Hidden,
  Info,
  Warning,
  Error,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
  pub code: String,
  pub severity: Severity,
  pub message: String,
}

impl Diagnostic {
  pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
    Self { code: code.into(), severity, message: message.into() }
  }
}

/// Events emitted by the kernel while a submission runs, in emission order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelEvent {
  CodeSubmissionReceived,
  DiagnosticsProduced { diagnostics: Vec<Diagnostic> },
  ValueProduced { name: String, value: String },
  StandardOutput { text: String },
  CommandSucceeded,
  CommandFailed { message: String },
}

/// One executed code cell, as reported by the host environment.
#[derive(Clone, Debug, Default)]
pub struct Execution {
  pub command: String,
  pub kernel: String,
  pub events: Vec<KernelEvent>,
  /// Names of newly declared or changed variables, with their display values.
  pub new_variables: BTreeMap<String, String>,
  pub run_time: Duration,
}

impl Execution {
  pub fn new(kernel: impl Into<String>, command: impl Into<String>) -> Self {
    Self { command: command.into(), kernel: kernel.into(), ..Default::default() }
  }

  pub fn with_events(mut self, events: impl IntoIterator<Item = KernelEvent>) -> Self {
    self.events.extend(events);
    self
  }

  pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.new_variables.insert(name.into(), value.into());
    self
  }

  pub fn with_run_time(mut self, run_time: Duration) -> Self {
    self.run_time = run_time;
    self
  }

  pub fn failed(&self) -> bool {
    self.events.iter().any(|e| matches!(e, KernelEvent::CommandFailed { .. }))
  }

  pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
    self.events.iter().flat_map(|e| match e {
      KernelEvent::DiagnosticsProduced { diagnostics } => diagnostics.as_slice(),
      _ => &[][..],
    })
  }

  pub fn count_severity(&self, severity: Severity) -> usize {
    self.diagnostics().filter(|d| d.severity == severity).count()
  }
}

/// Input to metric calculators: the execution plus the session timing state.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext<'a> {
  pub execution: &'a Execution,
  /// Previous successful submission; `None` on the first run of a session.
  pub last_run: Option<DateTime<Utc>>,
  pub now: DateTime<Utc>,
}

impl<'a> ExecutionContext<'a> {
  pub fn new(execution: &'a Execution, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
    Self { execution, last_run, now }
  }

  pub fn millis_since_last_run(&self) -> f64 {
    match self.last_run {
      Some(prev) => (self.now - prev).num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0,
      None => 0.0,
    }
  }
}

/// Turns submitted source into declaration trees. Implemented outside this crate
/// by whatever language front-end the host kernel uses.
#[async_trait]
pub trait StructureParser: Send + Sync {
  async fn parse(&self, source: &str) -> Result<Vec<ClassStructure>>;
}
