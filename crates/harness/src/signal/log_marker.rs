use std::ops::ControlFlow;
use std::path::Path;

use vigil_host::{HostEvents, TextDocumentChange};

use super::{Armed, SignalOutcome, SignalWatcher, WatchStrategy, completion};

/// Scans a diagnostic output channel for a success or failure marker.
///
/// Every text change of a document whose path contains `channel` triggers a
/// scan of that document's full text. The marker occurring first in the text
/// decides the outcome. If neither ever appears the signal stays pending.
#[derive(Debug, Clone)]
pub struct LogMarkerWatcher {
	channel: String,
	success: String,
	failure: String,
}

impl LogMarkerWatcher {
	pub fn new(channel: impl Into<String>, success: impl Into<String>, failure: impl Into<String>) -> Self {
		Self {
			channel: channel.into(),
			success: success.into(),
			failure: failure.into(),
		}
	}

	/// Outcome decided by `text`, if any marker is present.
	pub fn scan(&self, text: &str) -> Option<SignalOutcome> {
		match (text.find(&self.success), text.find(&self.failure)) {
			(Some(ok), Some(failed)) if failed < ok => Some(self.rejected()),
			(Some(_), _) => Some(SignalOutcome::Resolved),
			(None, Some(_)) => Some(self.rejected()),
			(None, None) => None,
		}
	}

	fn rejected(&self) -> SignalOutcome {
		SignalOutcome::Rejected {
			marker: self.failure.clone(),
		}
	}
}

impl SignalWatcher for LogMarkerWatcher {
	fn strategy(&self) -> WatchStrategy {
		WatchStrategy::Log
	}

	fn arm(&self, host: &dyn HostEvents, _target: &Path) -> Armed {
		let (mut completer, signal) = completion();
		let watcher = self.clone();
		let subscription = host.on_did_change_text_document(Box::new(move |event: &TextDocumentChange| {
			if !event.path.to_string_lossy().contains(&watcher.channel) {
				return ControlFlow::Continue(());
			}
			match watcher.scan(&event.text) {
				Some(outcome) => {
					tracing::debug!(channel = %watcher.channel, ?outcome, "signal.log.settled");
					completer.settle(outcome)
				}
				None => ControlFlow::Continue(()),
			}
		}));
		Armed { signal, subscription }
	}
}
