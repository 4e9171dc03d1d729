//! Error taxonomy for the scoring client, the progression engine and the stand-in service.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  /// An identity field was empty or whitespace at construction time.
  #[error("Value cannot be null or whitespace: {field}")]
  BlankField { field: &'static str },

  /// Transport failure (connect, TLS, body read). Never retried.
  #[error("HTTP transport error: {0}")]
  Http(#[from] reqwest::Error),

  /// Player status fetch answered with something other than 200.
  #[error("Failed Game Engine Step, Code: {code}, Reason: {reason}")]
  ReportFetch { code: u16, reason: String },

  /// Player status did not carry the point concept the report is keyed on.
  #[error("Player status has no point concept named '{name}'")]
  MissingPointConcept { name: String },

  /// A metric calculator failed; the whole submission is aborted.
  #[error("Metric '{metric}' failed: {message}")]
  Metric { metric: &'static str, message: String },

  #[error("JSON error: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Scoring client is not configured")]
  NotConfigured,
}
