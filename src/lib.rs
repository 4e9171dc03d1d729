//! Cellquest · structural exercise grading for interactive code cells.
//!
//! Two halves share this crate:
//!   - the scoring client (`client`, `metrics`, `submission`): computes metrics for
//!     each executed cell, submits them to a gamification engine and reports the
//!     learner's level and score.
//!   - the grading side (`progression`, `state`, `routes`): the level progression
//!     engine and a stand-in HTTP service exposing it with the engine's endpoints.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod progression;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod state;
pub mod submission;
pub mod telemetry;
pub mod util;

pub use client::{DiagnosticSink, ErrorProduced, RecordingSink, ScoringClient};
pub use config::{ClientConfig, SubmissionMode};
pub use error::{Error, Result};
pub use routes::build_router;
pub use session::Session;
pub use state::AppState;
