//! Format-on-save verification harness.
//!
//! Confirms that a formatter extension activates and rewrites a file when it
//! is saved, although both events are asynchronous and driven by the host.
//! The pieces, leaf first:
//!
//! - [`fixture`]: golden before/after contents and the target they are written to.
//! - [`activation`]: bounded polling of an extension's active flag.
//! - [`signal`]: single-fire completion watchers (save, log marker, file change).
//! - [`orchestrator`]: sequencing of one run and the reset contract.
//! - [`suite`]: per-test timeouts, setup and teardown around every case.
//!
//! The host is reached only through [`vigil_host::EditorHost`].

pub mod activation;
pub mod config;
mod error;
pub mod fixture;
pub mod orchestrator;
pub mod signal;
pub mod suite;

pub use activation::{ActivationPolicy, ensure_active};
pub use config::{ConfigError, HarnessConfig};
pub use error::{HarnessError, Result};
pub use fixture::{FixtureManager, TestFixture};
pub use orchestrator::Orchestrator;
pub use signal::{CompletionSignal, SignalOutcome, SignalWatcher, WatchStrategy};
pub use suite::{SmokeCase, Suite, SuiteReport, TestOutcome};
