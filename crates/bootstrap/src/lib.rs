//! Async bootstrap machinery: directory provisioning, artifact
//! install, process launch, readiness probing, and the sequencer that
//! drives one service through
//! `Pending -> Installing -> Configuring -> Starting -> Running`.
//!
//! The sequencer owns all mutable state and publishes whole snapshots
//! over a `watch` channel; the HTTP surface in `forgeup-api` only ever
//! reads those snapshots.

pub mod installer;
pub mod launcher;
pub mod probe;
pub mod provision;
pub mod sequencer;
pub mod services;

pub use installer::{ArtifactFetcher, HttpFetcher};
pub use launcher::{ProcessLauncher, ServiceHandle, TokioLauncher};
pub use probe::ProbeConfig;
pub use sequencer::{Sequencer, StatusSnapshot};
