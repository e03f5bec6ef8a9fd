use std::ops::ControlFlow;
use std::path::Path;

use vigil_host::{HostEvents, SavedDocument};

use super::{Armed, SignalOutcome, SignalWatcher, WatchStrategy, completion};

/// Resolves on the first save notification for the target. Never rejects.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveEventWatcher;

impl SignalWatcher for SaveEventWatcher {
	fn strategy(&self) -> WatchStrategy {
		WatchStrategy::Save
	}

	fn arm(&self, host: &dyn HostEvents, target: &Path) -> Armed {
		let (mut completer, signal) = completion();
		let target = target.to_path_buf();
		let subscription = host.on_did_save_text_document(Box::new(move |event: &SavedDocument| {
			if event.path != target {
				return ControlFlow::Continue(());
			}
			tracing::debug!(path = %target.display(), "signal.save.resolved");
			completer.settle(SignalOutcome::Resolved)
		}));
		Armed { signal, subscription }
	}
}
