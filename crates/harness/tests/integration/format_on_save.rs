//! End-to-end runs of a single format-on-save verification.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use vigil_harness::{HarnessError, Orchestrator, WatchStrategy};
use vigil_host::sim::{ActivationEvent, ExtensionSpec, SimulatedHost};
use vigil_host::{ExtensionRegistry, Workspace};

use crate::common::{self, AFTER, BEFORE, FORMATTER, PYTHON};

#[rstest]
#[case::save(WatchStrategy::Save)]
#[case::log(WatchStrategy::Log)]
#[case::file(WatchStrategy::File)]
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn save_formats_target(#[case] strategy: WatchStrategy) {
	let (host, mut orch) = common::harness(strategy, common::black());

	orch.setup().await.unwrap();
	orch.verify_format_on_save().await.unwrap();

	assert_eq!(common::disk(&host, &common::target()).await, AFTER);
	assert_eq!(host.armed_listeners(), 0, "watcher self-disposes after firing");
	assert_eq!(orch.armed_watchers(), 0);

	orch.teardown().await.unwrap();
	assert_eq!(common::disk(&host, &common::target()).await, BEFORE);
	assert!(host.open_documents().is_empty());
	assert!(host.active_editor().is_none());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn watcher_armed_after_save_misses_completion() {
	let (host, mut orch) = common::harness(WatchStrategy::Save, common::black());

	orch.setup().await.unwrap();
	orch.stage().await.unwrap();
	orch.trigger_save().await.unwrap();
	let signal = orch.arm(&common::target());

	assert!(tokio::time::timeout(Duration::from_secs(5), signal).await.is_err());
	assert_eq!(common::disk(&host, &common::target()).await, AFTER, "the edit happened, the event was lost");
	assert_eq!(orch.armed_watchers(), 1);

	orch.reset().await.unwrap();
	assert_eq!(orch.armed_watchers(), 0);
	assert_eq!(host.armed_listeners(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn log_strategy_rejects_on_interpreter_failure() {
	let (host, mut orch) = common::harness(WatchStrategy::Log, common::broken_black());

	orch.setup().await.unwrap();
	match orch.verify_format_on_save().await {
		Err(HarnessError::SignalRejected { marker }) => assert_eq!(marker, "Python interpreter missing"),
		other => panic!("expected rejection, got {other:?}"),
	}
	assert_eq!(host.armed_listeners(), 0);
	assert!(host.output(common::CHANNEL).contains("Skipped formatting"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn save_strategy_reports_unformatted_result() {
	let (_host, mut orch) = common::harness(WatchStrategy::Save, common::broken_black());

	orch.setup().await.unwrap();
	match orch.verify_format_on_save().await {
		Err(HarnessError::ContentMismatch { expected, actual }) => {
			assert_eq!(expected, AFTER);
			assert_eq!(actual, BEFORE);
		}
		other => panic!("expected content mismatch, got {other:?}"),
	}
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn missing_formatter_extension_is_reported() {
	let host = SimulatedHost::new(Arc::new(common::golden_fs())).with_extension(ExtensionSpec::new(PYTHON));
	let mut orch = common::orchestrator(&host, common::config(WatchStrategy::Save));

	orch.setup().await.unwrap();
	match orch.verify_activation().await {
		Err(HarnessError::ExtensionNotFound(id)) => assert_eq!(id, FORMATTER),
		other => panic!("expected missing extension, got {other:?}"),
	}
	assert!(host.lookup(PYTHON).unwrap().is_active());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stalled_extension_times_out() {
	let host = SimulatedHost::new(Arc::new(common::golden_fs()))
		.with_extension(ExtensionSpec::new(PYTHON))
		.with_extension(ExtensionSpec::new(FORMATTER).activation(ActivationEvent::Never));
	let mut orch = common::orchestrator(&host, common::config(WatchStrategy::Save));

	let start = tokio::time::Instant::now();
	match orch.verify_activation().await {
		Err(HarnessError::ActivationTimeout { id, timeout }) => {
			assert_eq!(id, FORMATTER);
			assert_eq!(timeout, Duration::from_secs(5));
		}
		other => panic!("expected activation timeout, got {other:?}"),
	}
	assert!(start.elapsed() <= Duration::from_millis(5_100));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reset_twice_leaves_nothing_armed() {
	let (host, mut orch) = common::harness(WatchStrategy::File, common::black());

	orch.setup().await.unwrap();
	orch.stage().await.unwrap();
	let _pending = orch.arm(&common::target());
	let _second = orch.arm(&common::target());
	assert_eq!(orch.armed_watchers(), 2);

	orch.reset().await.unwrap();
	orch.reset().await.unwrap();
	assert_eq!(orch.armed_watchers(), 0);
	assert_eq!(host.armed_listeners(), 0);
	assert!(host.open_documents().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_close_all_still_releases_watchers() {
	let host = common::host_over(Arc::new(common::golden_fs()), common::black());
	let mut orch = Orchestrator::new(
		Arc::new(common::CloseAllFails(host.clone())),
		common::config(WatchStrategy::Save),
	);

	let signal = orch.arm(&common::target());
	assert_eq!(host.armed_listeners(), 1);

	assert!(matches!(orch.reset().await, Err(HarnessError::Host(_))));
	assert_eq!(orch.armed_watchers(), 0);
	assert_eq!(host.armed_listeners(), 0);
	assert!(matches!(signal.await, Err(HarnessError::SignalDropped)));

	let _again = orch.arm(&common::target());
	assert_eq!(host.armed_listeners(), 1);
	assert!(orch.teardown().await.is_err());
	assert_eq!(orch.armed_watchers(), 0);
	assert_eq!(host.armed_listeners(), 0);
}
