//! Smoke suite runner.
//!
//! Every case runs between [`Orchestrator::setup`] and
//! [`Orchestrator::teardown`] under one per-test timeout. A case that never
//! receives its completion signal is reported as [`TestOutcome::TimedOut`];
//! its leftover subscriptions are released by the teardown that follows.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::HarnessError;
use crate::orchestrator::Orchestrator;

/// The workflows the suite verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmokeCase {
	/// The formatter extension and its dependency activate.
	ExtensionLoads,
	/// Saving the target formats it.
	FormatsOnSave,
}

impl SmokeCase {
	pub const ALL: [Self; 2] = [Self::ExtensionLoads, Self::FormatsOnSave];

	pub const fn name(self) -> &'static str {
		match self {
			Self::ExtensionLoads => "Ensure formatter extension loads",
			Self::FormatsOnSave => "Ensure formatter formats a file on save",
		}
	}
}

impl fmt::Display for SmokeCase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug)]
pub enum TestOutcome {
	Passed,
	Failed(HarnessError),
	TimedOut(Duration),
}

impl TestOutcome {
	pub fn is_passed(&self) -> bool {
		matches!(self, Self::Passed)
	}
}

impl fmt::Display for TestOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Passed => f.write_str("passed"),
			Self::Failed(e) => write!(f, "failed: {e}"),
			Self::TimedOut(timeout) => write!(f, "timed out after {timeout:?}"),
		}
	}
}

#[derive(Debug)]
pub struct CaseReport {
	pub case: SmokeCase,
	pub outcome: TestOutcome,
	pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct SuiteReport {
	pub suite: String,
	pub cases: Vec<CaseReport>,
}

impl SuiteReport {
	/// True when every case passed.
	pub fn passed(&self) -> bool {
		self.cases.iter().all(|c| c.outcome.is_passed())
	}

	pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
		self.cases.iter().filter(|c| !c.outcome.is_passed())
	}
}

/// Ordered list of cases sharing one per-test timeout.
#[derive(Debug, Clone)]
pub struct Suite {
	name: String,
	timeout: Duration,
	cases: Vec<SmokeCase>,
}

impl Suite {
	pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
		Self {
			name: name.into(),
			timeout,
			cases: Vec::new(),
		}
	}

	/// Both smoke cases, activation first.
	pub fn smoke(timeout: Duration) -> Self {
		SmokeCase::ALL.into_iter().fold(Self::new("Smoke Tests", timeout), Self::case)
	}

	pub fn case(mut self, case: SmokeCase) -> Self {
		self.cases.push(case);
		self
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Runs every case in order. Never stops early.
	pub async fn run(&self, orchestrator: &mut Orchestrator) -> SuiteReport {
		let mut report = SuiteReport {
			suite: self.name.clone(),
			cases: Vec::with_capacity(self.cases.len()),
		};

		for &case in &self.cases {
			let start = Instant::now();
			let outcome = match orchestrator.setup().await {
				Err(e) => TestOutcome::Failed(e),
				Ok(()) => match tokio::time::timeout(self.timeout, orchestrator.run_case(case)).await {
					Ok(Ok(())) => TestOutcome::Passed,
					Ok(Err(e)) => TestOutcome::Failed(e),
					Err(_) => TestOutcome::TimedOut(self.timeout),
				},
			};

			let outcome = match (orchestrator.teardown().await, outcome) {
				(Err(e), TestOutcome::Passed) => TestOutcome::Failed(e),
				(Err(e), outcome) => {
					warn!(case = case.name(), error = %e, "suite.teardown_failed");
					outcome
				}
				(Ok(()), outcome) => outcome,
			};

			let elapsed = start.elapsed();
			if outcome.is_passed() {
				info!(suite = %self.name, case = case.name(), ?elapsed, "suite.case.passed");
			} else {
				warn!(suite = %self.name, case = case.name(), ?elapsed, %outcome, "suite.case.failed");
			}
			report.cases.push(CaseReport { case, outcome, elapsed });
		}

		report
	}
}
