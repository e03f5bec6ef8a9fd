//! Suite runs: per-test timeouts and teardown after every outcome.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use vigil_harness::signal::LogMarkerWatcher;
use vigil_harness::{HarnessConfig, HarnessError, Orchestrator, SmokeCase, Suite, TestOutcome, WatchStrategy};
use vigil_host::{LocalFs, Workspace};

use crate::common::{self, AFTER, BEFORE};

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn smoke_suite_passes_and_restores_target() {
	let (host, mut orch) = common::harness(WatchStrategy::Save, common::black());

	let suite = Suite::smoke(orch.config().test_timeout());
	let report = suite.run(&mut orch).await;

	assert!(report.passed(), "{report:?}");
	assert_eq!(report.suite, "Smoke Tests");
	assert_eq!(report.cases.iter().map(|c| c.case).collect::<Vec<_>>(), SmokeCase::ALL.to_vec());
	assert_eq!(common::disk(&host, &common::target()).await, BEFORE);
	assert!(host.open_documents().is_empty());
	assert_eq!(host.armed_listeners(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn timed_out_case_is_still_torn_down() {
	let (host, orch) = common::harness(WatchStrategy::Log, common::black());
	let mut orch = orch.with_watcher(Box::new(LogMarkerWatcher::new("Nowhere", "FOUND", "missing")));

	let report = Suite::new("stall", Duration::from_secs(1))
		.case(SmokeCase::FormatsOnSave)
		.run(&mut orch)
		.await;

	assert!(!report.passed());
	assert!(matches!(report.cases[0].outcome, TestOutcome::TimedOut(t) if t == Duration::from_secs(1)));
	assert_eq!(orch.armed_watchers(), 0);
	assert_eq!(host.armed_listeners(), 0);
	assert!(host.active_editor().is_none());
	assert_eq!(common::disk(&host, &common::target()).await, BEFORE);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_case_does_not_stop_the_suite() {
	let (_host, mut orch) = common::harness(WatchStrategy::Save, common::broken_black());

	let report = Suite::new("broken", Duration::from_secs(10))
		.case(SmokeCase::FormatsOnSave)
		.case(SmokeCase::ExtensionLoads)
		.run(&mut orch)
		.await;

	assert_eq!(report.cases.len(), 2);
	assert!(matches!(
		report.cases[0].outcome,
		TestOutcome::Failed(HarnessError::ContentMismatch { .. })
	));
	assert!(report.cases[1].outcome.is_passed());
	assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn runs_against_files_on_disk() {
	let tmp = tempfile::tempdir().expect("failed to create temp dir");
	let project = tmp.path().join("test_data").join("project");
	std::fs::create_dir_all(&project).unwrap();
	std::fs::write(project.join("myscript.unformatted"), BEFORE).unwrap();
	std::fs::write(project.join("myscript.formatted"), AFTER).unwrap();
	std::fs::write(project.join("myscript.py"), BEFORE).unwrap();

	let config_path = tmp.path().join("vigil.toml");
	std::fs::write(
		&config_path,
		"strategy = \"file\"\ntest-timeout-ms = 10000\n\n[activation]\ntimeout-ms = 5000\ninterval-ms = 20\n",
	)
	.unwrap();
	let config = HarnessConfig::load(&config_path).unwrap();
	assert_eq!(config.fixture.target, project.join("myscript.py"));

	let host = common::host_over(Arc::new(LocalFs), common::black());
	let mut orch = Orchestrator::new(Arc::new(host.clone()), config);
	let report = Suite::smoke(orch.config().test_timeout()).run(&mut orch).await;

	assert!(report.passed(), "{report:?}");
	assert_eq!(std::fs::read_to_string(project.join("myscript.py")).unwrap(), BEFORE);
	assert!(host.active_editor().is_none());
}
