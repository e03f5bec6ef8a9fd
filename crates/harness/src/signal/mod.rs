//! Completion detection.
//!
//! A [`SignalWatcher`] arms a host subscription and hands back a
//! [`CompletionSignal`] that settles at most once. All strategies share one
//! state machine: `Waiting -> Resolved`, or `Waiting -> Rejected` for the log
//! strategy. Settling releases the subscription in the same delivery, so a
//! repeated event can neither settle the signal again nor fault.
//!
//! [`SaveEventWatcher`] is the canonical strategy. [`LogMarkerWatcher`] and
//! [`FileChangeWatcher`] are deprecated alternates kept for hosts whose save
//! notifications are unreliable; only the log strategy can tell an explicit
//! failure apart from silence.

use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};

use serde::Deserialize;
use tokio::sync::oneshot;
use vigil_host::{HostEvents, Subscription};

use crate::config::LogMarkerConfig;
use crate::{HarnessError, Result};

mod file_change;
mod log_marker;
mod save_event;

pub use file_change::FileChangeWatcher;
pub use log_marker::LogMarkerWatcher;
pub use save_event::SaveEventWatcher;

/// Terminal state of a completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
	Resolved,
	Rejected {
		marker: String,
	},
}

/// Single-resolution completion future.
///
/// Has no timeout of its own. Resolves to `Ok(())`, to
/// [`HarnessError::SignalRejected`], or to [`HarnessError::SignalDropped`] if
/// the subscription is released before anything fired.
#[derive(Debug)]
pub struct CompletionSignal {
	rx: oneshot::Receiver<SignalOutcome>,
}

impl Future for CompletionSignal {
	type Output = Result<()>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx).poll(cx).map(|outcome| match outcome {
			Ok(SignalOutcome::Resolved) => Ok(()),
			Ok(SignalOutcome::Rejected { marker }) => Err(HarnessError::SignalRejected { marker }),
			Err(_) => Err(HarnessError::SignalDropped),
		})
	}
}

/// Write side of a [`CompletionSignal`], owned by the listener.
pub(crate) struct Completer {
	tx: Option<oneshot::Sender<SignalOutcome>>,
}

impl Completer {
	/// Settles the signal and tells the event bus to release the listener.
	pub(crate) fn settle(&mut self, outcome: SignalOutcome) -> ControlFlow<()> {
		if let Some(tx) = self.tx.take() {
			let _ = tx.send(outcome);
		}
		ControlFlow::Break(())
	}
}

pub(crate) fn completion() -> (Completer, CompletionSignal) {
	let (tx, rx) = oneshot::channel();
	(Completer { tx: Some(tx) }, CompletionSignal { rx })
}

/// An armed watcher: the future to await and the subscription backing it.
#[derive(Debug)]
pub struct Armed {
	pub signal: CompletionSignal,
	pub subscription: Subscription,
}

/// Strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStrategy {
	/// Document-saved notifications for the target.
	#[default]
	Save,
	/// Success/failure markers in a diagnostic output channel.
	Log,
	/// File-system change notifications for the target.
	File,
}

impl WatchStrategy {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Save => "save",
			Self::Log => "log",
			Self::File => "file",
		}
	}
}

impl fmt::Display for WatchStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for WatchStrategy {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"save" => Ok(Self::Save),
			"log" => Ok(Self::Log),
			"file" => Ok(Self::File),
			other => Err(format!("unknown strategy {other:?} (expected save, log or file)")),
		}
	}
}

/// Interchangeable completion detector.
pub trait SignalWatcher: Send + Sync {
	/// Strategy implemented by this watcher.
	fn strategy(&self) -> WatchStrategy;

	/// Subscribes and returns the pending signal. Must be called before the
	/// triggering action: events delivered earlier are not replayed.
	fn arm(&self, host: &dyn HostEvents, target: &Path) -> Armed;
}

/// Builds the watcher for `strategy`.
pub fn watcher_for(strategy: WatchStrategy, log: &LogMarkerConfig) -> Box<dyn SignalWatcher> {
	match strategy {
		WatchStrategy::Save => Box::new(SaveEventWatcher),
		WatchStrategy::Log => Box::new(LogMarkerWatcher::new(&log.channel, &log.success, &log.failure)),
		WatchStrategy::File => Box::new(FileChangeWatcher),
	}
}

/// Subscriptions owned by one test, released together at reset.
#[derive(Debug, Default)]
pub struct Disposables {
	items: Vec<Subscription>,
}

impl Disposables {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, subscription: Subscription) {
		self.items.push(subscription);
	}

	/// Releases everything. Returns how many were still armed.
	pub fn dispose_all(&mut self) -> usize {
		self.items.drain(..).filter(|sub| sub.dispose()).count()
	}

	/// Number of held subscriptions that can still fire.
	pub fn armed(&self) -> usize {
		self.items.iter().filter(|sub| !sub.is_released()).count()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
