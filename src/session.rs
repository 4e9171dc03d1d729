//! Composition-boundary holder for the scoring client.
//!
//! The host application owns one `Session` and passes it by reference to whatever
//! needs the client; there is no process-wide global. `configure` replaces the
//! current client only if the new one builds, `reset` drops it.

use std::sync::Arc;

use tracing::info;

use crate::client::{DiagnosticSink, ScoringClient};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metrics::MetricRegistry;

#[derive(Default)]
pub struct Session {
  current: Option<ScoringClient>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn configure(
    &mut self,
    config: ClientConfig,
    registry: MetricRegistry,
    sink: Option<Arc<dyn DiagnosticSink>>,
  ) -> Result<&mut ScoringClient> {
    let mut client = ScoringClient::new(config, registry)?;
    if let Some(sink) = sink {
      client = client.with_sink(sink);
    }
    Ok(self.current.insert(client))
  }

  pub fn reset(&mut self) {
    if self.current.take().is_some() {
      info!(target: "scoring_client", "Scoring client reset");
    }
  }

  pub fn is_configured(&self) -> bool {
    self.current.is_some()
  }

  pub fn client(&mut self) -> Result<&mut ScoringClient> {
    self.current.as_mut().ok_or(Error::NotConfigured)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn configure_then_reset() {
    let mut session = Session::new();
    assert!(matches!(session.client(), Err(Error::NotConfigured)));

    let cfg = ClientConfig::new("g", "u", "pw", "p", None);
    session.configure(cfg, MetricRegistry::with_builtins(), None).unwrap();
    assert!(session.is_configured());
    assert_eq!(session.client().unwrap().config().game_id, "g");

    session.reset();
    assert!(!session.is_configured());
  }

  #[test]
  fn failed_configure_keeps_previous_client() {
    let mut session = Session::new();
    session.configure(ClientConfig::new("g", "u", "pw", "p", None), MetricRegistry::new(), None).unwrap();
    let err = session
      .configure(ClientConfig::new("", "u", "pw", "p", None), MetricRegistry::new(), None)
      .err()
      .unwrap();
    assert!(matches!(err, Error::BlankField { field: "gameId" }));
    assert_eq!(session.client().unwrap().config().game_id, "g");
  }
}
