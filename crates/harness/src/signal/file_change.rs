use std::ops::ControlFlow;
use std::path::Path;

use vigil_host::{FileChangeKind, FileChangeKinds, FileEvent, HostEvents};

use super::{Armed, SignalOutcome, SignalWatcher, WatchStrategy, completion};

/// Resolves on the first change notification for the target.
///
/// The host watcher is created for change notifications only; created and
/// deleted events are additionally ignored in case a host delivers them anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileChangeWatcher;

impl SignalWatcher for FileChangeWatcher {
	fn strategy(&self) -> WatchStrategy {
		WatchStrategy::File
	}

	fn arm(&self, host: &dyn HostEvents, target: &Path) -> Armed {
		let (mut completer, signal) = completion();
		let owned = target.to_path_buf();
		let subscription = host.create_file_watcher(
			target,
			FileChangeKinds::CHANGED,
			Box::new(move |event: &FileEvent| {
				if event.kind != FileChangeKind::Changed || event.path != owned {
					return ControlFlow::Continue(());
				}
				tracing::debug!(path = %owned.display(), "signal.file.resolved");
				completer.settle(SignalOutcome::Resolved)
			}),
		);
		Armed { signal, subscription }
	}
}
